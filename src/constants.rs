//! Cross-cutting, shared constants.
//!
//! Score category names are part of the on-disk result format and the benchmark
//! directory layout, so they live here rather than in any single module.

use std::time::Duration;

/// Category: how well the edit followed the instruction.
pub const PROMPT_FOLLOWING: &str = "prompt_following";
/// Category: how well the untouched regions were preserved.
pub const CONSISTENCY: &str = "consistency";
/// Category: combined quality judgement.
pub const OVERALL: &str = "overall";

/// All score categories, in benchmark processing order.
pub const SCORE_CATEGORIES: [&str; 3] = [PROMPT_FOLLOWING, CONSISTENCY, OVERALL];

/// Separator placed between pair fields before hashing.
pub const CACHE_KEY_SEPARATOR: &str = "|||";

/// Default number of concurrent oracle calls in batch mode.
pub const DEFAULT_MAX_WORKERS: usize = 20;

/// Default bound on how long a producer waits for its broker result.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Upper bound accepted for any configured timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Default HTTP timeout for a single remote oracle call.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Group tag used when request metadata does not carry one.
pub const DEFAULT_GROUP_TAG: &str = "vlm";

/// Metadata field that raw (non-JSON) metadata strings are wrapped under.
pub const RAW_METADATA_FIELD: &str = "prompt";

/// Success threshold applied to the rescaled reward (inclusive).
pub const SUCCESS_THRESHOLD: f64 = 0.5;

/// Log a dispatcher progress line every this many finished evaluations.
pub const PROGRESS_LOG_STEP: usize = 50;
