use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the local file layer: path handling, context loading and edits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid path '{0}': empty path provided")]
    InvalidPath(String),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
