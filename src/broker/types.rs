use std::time::Duration;

use serde::Serialize;

use crate::constants::DEFAULT_REQUEST_TIMEOUT;
use crate::reward::{RewardPayload, RewardScale};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokerConfig {
    /// Default wait used by [`submit_and_wait`](super::RequestBroker::submit_and_wait).
    pub request_timeout: Duration,
    pub reward_scale: RewardScale,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reward_scale: RewardScale::default(),
        }
    }
}

/// Observable lifecycle of a request that has not been retrieved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Enqueued,
    Processing,
    Completed,
    Failed,
}

/// Terminal result of a request, handed out exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerOutcome {
    /// One payload per item, in item order.
    Completed(Vec<RewardPayload>),
    Failed(String),
}

impl BrokerOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

#[derive(Debug)]
pub(crate) enum RequestState {
    Enqueued,
    Processing,
    Done(BrokerOutcome),
}

impl RequestState {
    pub(crate) fn status(&self) -> RequestStatus {
        match self {
            Self::Enqueued => RequestStatus::Enqueued,
            Self::Processing => RequestStatus::Processing,
            Self::Done(BrokerOutcome::Completed(_)) => RequestStatus::Completed,
            Self::Done(BrokerOutcome::Failed(_)) => RequestStatus::Failed,
        }
    }
}
