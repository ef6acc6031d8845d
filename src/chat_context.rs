use std::path::PathBuf;

use crate::paths::normalize_path;

const RECOGNIZED_EXTENSIONS: &[&str] = &[
    ".css", ".html", ".js", ".ts", ".py", ".rs", ".toml", ".json", ".md", ".txt", ".yaml",
    ".yml", ".xml",
];

/// Words in a user message that look like file paths, normalized.
///
/// A word qualifies when it contains a recognized extension or a `/`.
/// Surrounding quotes and commas are stripped; words that fail to normalize
/// are skipped. Nothing is read here, so candidates may not exist.
pub fn guess_files_in_message(message: &str) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::new();
    for word in message.split_whitespace() {
        if !looks_like_path(word) {
            continue;
        }
        let cleaned: String = word
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | ','))
            .collect();
        let Ok(path) = normalize_path(&cleaned) else {
            continue;
        };
        if !out.contains(&path) {
            out.push(path);
        }
    }
    out
}

fn looks_like_path(word: &str) -> bool {
    word.contains('/') || RECOGNIZED_EXTENSIONS.iter().any(|ext| word.contains(ext))
}
