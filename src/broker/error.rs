use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// The payload could not be turned into a scoring batch.
    #[error("{0}")]
    InvalidRequest(String),

    /// The consumer task is gone; nothing will process new requests.
    #[error("broker consumer is not running")]
    Closed,

    #[error(transparent)]
    Poll(#[from] PollError),
}

/// Why [`poll`](super::RequestBroker::poll) returned without an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The request exists but did not finish in time. It can be polled again.
    #[error("request {id} timed out after {waited:?}")]
    Timeout { id: Uuid, waited: Duration },

    /// Never submitted, or its outcome was already retrieved.
    #[error("unknown request {0}")]
    UnknownRequest(Uuid),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
