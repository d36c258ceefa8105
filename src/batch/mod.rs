//! Offline benchmark scoring.
//!
//! For each task type the driver loads every category file, evaluates the
//! deduplicated pairs not yet in the result cache, and then writes one output file per
//! source file with that category's scores.

pub mod args;
pub mod error;
pub mod runner;


pub use args::BatchArgs;
pub use error::{BatchError, BatchResult};
pub use runner::{BenchmarkRunner, RunSummary, TaskSummary};
