use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolve a user- or model-supplied path string to an absolute path.
///
/// Relative paths are joined onto the current working directory. The result
/// is cleaned lexically (`.` dropped, `..` pops a component); the filesystem
/// is not consulted, so the path does not have to exist.
pub fn normalize_path(raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidPath(raw.to_string()));
    }
    absolutize(Path::new(raw))
}

pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath(String::new()));
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|e| Error::io(".", e))?;
        cwd.join(path)
    };
    Ok(clean(&joined))
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

pub fn backup_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
