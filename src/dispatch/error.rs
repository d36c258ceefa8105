use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cache write failed: {0}")]
    Cache(#[from] CacheError),

    #[error("dispatcher worker failed: {0}")]
    Worker(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
