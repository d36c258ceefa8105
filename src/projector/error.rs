use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stream I/O error: {0}")]
    Stream(#[source] std::io::Error),

    #[error("failed to encode output record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("source path has no file name: {0}")]
    NoFileName(PathBuf),
}

impl ProjectError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;
