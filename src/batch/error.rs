use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::dispatch::DispatchError;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("benchmark directory not found: {0}")]
    BenchmarkNotFound(PathBuf),

    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

pub type BatchResult<T> = Result<T, BatchError>;
