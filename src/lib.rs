//! Editgate library crate (used by both binaries and integration tests).
//!
//! Editgate sits between callers and an expensive image-edit scoring oracle. It never
//! computes scores itself; it decides which requests reach the oracle, remembers what
//! the oracle said, and serializes access to a scorer that cannot run concurrently.
//!
//! # Public API Surface
//!
//! ## Batch mode
//! - [`PairSet`], [`Pair`] - Deduplicated evaluation requests from JSONL sources
//! - [`ResultCache`], [`CacheKey`] - Persistent, append-only result store
//! - [`BoundedDispatcher`] - Evaluates cache misses with bounded concurrency
//! - [`ResultProjector`] - Writes results back in the shape of each source file
//! - [`BenchmarkRunner`], [`BatchArgs`] - The benchmark driver behind `editgate-batch`
//!
//! ## Service mode
//! - [`RequestBroker`], [`ScoreRequest`] - Single-consumer request queue
//! - [`RewardPayload`], [`RewardScale`] - Per-item response derived from a score
//! - [`gateway`] - Axum router behind the `editgate` binary
//!
//! ## Oracle seams
//! - [`PairEvaluator`], [`BatchScorer`] - Traits implemented by scoring backends
//! - [`RemoteEvaluator`], [`RemoteBatchScorer`] - HTTP backends
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod batch;
pub mod broker;
pub mod cache;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod gateway;
pub mod hashing;
pub mod oracle;
pub mod pairs;
pub mod projector;
pub mod reward;

pub use batch::{BatchArgs, BatchError, BenchmarkRunner, RunSummary, TaskSummary};
pub use broker::{
    BrokerConfig, BrokerError, BrokerOutcome, PollError, RequestBroker, RequestStatus,
    ScoreRequest,
};
pub use cache::{CacheEntry, CacheError, CacheResult, ResultCache};
pub use config::{Config, ConfigError};
pub use dispatch::{BoundedDispatcher, DispatchError, DispatchProgress, DispatchReport};
pub use hashing::{CacheKey, cache_key, hash_pair_fields};
pub use oracle::{
    BatchScorer, EditScore, ImageBytes, OracleError, PairEvaluator, RemoteBatchScorer,
    RemoteEvaluator, ScoringBatch, ScoringItem,
};
#[cfg(any(test, feature = "mock"))]
pub use oracle::{MockBatchScorer, MockEvaluator};
pub use pairs::{LoadStats, Pair, PairRecord, PairSet};
pub use projector::{ProjectError, ProjectOutcome, ResultProjector};
pub use reward::{RewardPayload, RewardScale};
