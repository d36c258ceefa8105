//! Command-line arguments of the `editgate-batch` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::constants::{DEFAULT_MAX_WORKERS, MAX_TIMEOUT, SCORE_CATEGORIES};

/// Score an edit benchmark against a remote oracle, reusing cached results.
#[derive(Parser, Debug, Clone)]
#[command(name = "editgate-batch", version, about)]
pub struct BatchArgs {
    /// Benchmark root laid out as `<task_type>/<category>/*.jsonl`
    #[arg(long, env = "EDITGATE_BENCHMARK_DIR", default_value = "Edit-Reward-Bench/labeled_pairs")]
    pub benchmark_dir: PathBuf,

    /// Where projected results and the result cache are written
    #[arg(long, env = "EDITGATE_RESULT_DIR")]
    pub result_dir: PathBuf,

    /// Scoring backbone name; part of the output path and cache file name
    #[arg(long, default_value = "openai")]
    pub backbone: String,

    /// Model identifier; part of the cache file name
    #[arg(long, default_value = "gpt-4.1")]
    pub model_name_or_path: String,

    /// Pair scoring endpoint
    #[arg(long, env = "EDITGATE_ORACLE_URL")]
    pub oracle_url: String,

    /// Bearer token for the scoring endpoint
    #[arg(long, env = "EDITGATE_ORACLE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Maximum concurrent oracle calls
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Per-call oracle timeout in seconds
    #[arg(long, env = "EDITGATE_ORACLE_TIMEOUT_SECS", default_value_t = 300)]
    pub oracle_timeout_secs: u64,

    /// Score categories to project (comma separated)
    #[arg(long, value_delimiter = ',', default_values_t = SCORE_CATEGORIES.map(String::from))]
    pub categories: Vec<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl BatchArgs {
    /// Capped at [`MAX_TIMEOUT`].
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs).min(MAX_TIMEOUT)
    }

    /// `<result_dir>/.cache/<backbone>_<model>.jsonl`, with `/` in the model replaced by `_`.
    pub fn cache_path(&self) -> PathBuf {
        self.result_dir.join(".cache").join(format!(
            "{}_{}.jsonl",
            self.backbone,
            self.model_name_or_path.replace('/', "_")
        ))
    }

    /// `<result_dir>/<backbone>/<task_type>/<category>`.
    pub fn save_dir(&self, task_type: &str, category: &str) -> PathBuf {
        self.result_dir
            .join(&self.backbone)
            .join(task_type)
            .join(category)
    }
}
