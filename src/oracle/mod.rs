//! Scoring oracle seams.
//!
//! The oracle itself (model, prompting, numeric scoring) lives outside this crate. Two
//! traits describe how the crate talks to it:
//!
//! - [`PairEvaluator`]: batch mode, one pair per call, safe to call concurrently.
//! - [`BatchScorer`]: service mode, one batch per call, stateful and not reentrant. It
//!   takes `&mut self`, so only the broker's consumer task can drive it.

pub mod error;
pub mod remote;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{OracleError, OracleResult};
pub use remote::{RemoteBatchScorer, RemoteEvaluator};
pub use types::{EditScore, ImageBytes, ScoringBatch, ScoringItem};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBatchScorer, MockEvaluator, MockScorerStats};

use async_trait::async_trait;
use serde_json::Value;

use crate::constants::SCORE_CATEGORIES;
use crate::pairs::Pair;

/// A pair result is usable only as a JSON object with a non-null value for at least one
/// score category.
pub fn is_scored_result(result: &Value) -> bool {
    result.as_object().is_some_and(|obj| {
        SCORE_CATEGORIES
            .iter()
            .any(|category| obj.get(*category).is_some_and(|v| !v.is_null()))
    })
}

/// Scores a single pair. Returns a JSON object with at least the score categories.
#[async_trait]
pub trait PairEvaluator: Send + Sync {
    async fn evaluate(&self, pair: &Pair) -> OracleResult<Value>;
}

/// Scores a whole batch, one [`EditScore`] per item in order.
#[async_trait]
pub trait BatchScorer: Send {
    async fn score_batch(&mut self, batch: &ScoringBatch) -> OracleResult<Vec<EditScore>>;

    /// Short label for logs.
    fn name(&self) -> &str {
        "scorer"
    }
}
