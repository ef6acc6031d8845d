use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::conversation::{Conversation, Role};
use crate::error::{Error, Result};
use crate::paths::{absolutize, backup_path};

pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::io(path, e),
    })
}

/// Write `content` to `path`, creating missing parent directories, and record
/// the write in the conversation. Existing files are overwritten.
pub fn create_file(conversation: &mut Conversation, path: &Path, content: &str) -> Result<()> {
    let path = absolutize(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(&path, content).map_err(|e| Error::io(&path, e))?;
    info!(path = %path.display(), bytes = content.len(), "wrote file");
    conversation.record_file_write(&path, content);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// The original snippet does not occur in the file; nothing was written.
    SnippetNotFound { actual: String },
}

/// Replace the first literal occurrence of `original` in the file at `path`.
///
/// A copy of the file is left at `<path>.bak` before anything else happens and
/// removed only once the edit has been written. When the snippet is missing
/// the file is untouched and the backup stays behind for manual recovery.
pub fn apply_diff_edit(
    conversation: &mut Conversation,
    path: &Path,
    original: &str,
    replacement: &str,
) -> Result<EditOutcome> {
    let backup = backup_path(path);
    if path.exists() {
        fs::copy(path, &backup).map_err(|e| Error::io(&backup, e))?;
    }

    let content = read_text_file(path)?;
    if !content.contains(original) {
        warn!(path = %path.display(), "original snippet not found, no changes made");
        return Ok(EditOutcome::SnippetNotFound { actual: content });
    }

    let updated = content.replacen(original, replacement, 1);
    create_file(conversation, path, &updated)?;
    conversation.append_turn(
        Role::Assistant,
        format!("✓ Applied diff edit to '{}'", path.display()),
    );

    match fs::remove_file(&backup) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(&backup, e)),
    }
    Ok(EditOutcome::Applied)
}
