//! Persistent evaluation result cache.
//!
//! Results are keyed by the BLAKE3 digest of their [`Pair`](crate::pairs::Pair) and
//! stored in an append-only NDJSON log (`{"key": <hex>, "result": <json>}` per line).
//! The log is replayed on open; corrupted or torn lines are skipped.

pub mod error;
mod result;

#[cfg(test)]
mod tests;

pub use error::{CacheError, CacheResult};
pub use result::{CacheEntry, ResultCache};
