//! Benchmark driver: load, dispatch and project one task type at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use super::args::BatchArgs;
use super::error::{BatchError, BatchResult};
use crate::cache::ResultCache;
use crate::dispatch::BoundedDispatcher;
use crate::oracle::PairEvaluator;
use crate::pairs::PairSet;
use crate::projector::ResultProjector;

/// Outcome of one task type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub task_type: String,
    pub pairs: usize,
    pub cached: usize,
    pub evaluated: usize,
    pub failed: usize,
    pub files_written: usize,
    pub files_failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tasks: Vec<TaskSummary>,
}

impl RunSummary {
    pub fn files_failed(&self) -> usize {
        self.tasks.iter().map(|t| t.files_failed).sum()
    }

    pub fn evaluated(&self) -> usize {
        self.tasks.iter().map(|t| t.evaluated).sum()
    }

    pub fn failed(&self) -> usize {
        self.tasks.iter().map(|t| t.failed).sum()
    }
}

pub struct BenchmarkRunner {
    args: BatchArgs,
    cache: Arc<ResultCache>,
    dispatcher: BoundedDispatcher,
}

impl BenchmarkRunner {
    /// Opens the result cache for this backbone/model and wires the dispatcher.
    pub fn new(args: BatchArgs, evaluator: Arc<dyn PairEvaluator>) -> BatchResult<Self> {
        let cache = Arc::new(ResultCache::open(args.cache_path())?);
        let dispatcher = BoundedDispatcher::new(Arc::clone(&cache), evaluator, args.max_workers);
        Ok(Self {
            args,
            cache,
            dispatcher,
        })
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Task type directories under the benchmark root, sorted by name.
    pub fn task_types(&self) -> BatchResult<Vec<String>> {
        let root = &self.args.benchmark_dir;
        if !root.is_dir() {
            return Err(BatchError::BenchmarkNotFound(root.clone()));
        }

        let mut tasks = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| BatchError::Scan {
                path: root.clone(),
                source,
            })?;
            if entry.file_type().is_dir() {
                tasks.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        tasks.sort();
        Ok(tasks)
    }

    /// `*.jsonl` files of one category, sorted. A missing category is empty.
    pub fn category_files(&self, task_type: &str, category: &str) -> Vec<PathBuf> {
        let dir = self.args.benchmark_dir.join(task_type).join(category);
        if !dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_jsonl(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn run_task(&self, task_type: &str) -> BatchResult<TaskSummary> {
        info!("Processing task type");

        let sources: Vec<PathBuf> = self
            .args
            .categories
            .iter()
            .flat_map(|category| self.category_files(task_type, category))
            .collect();
        let pairs = PairSet::load(&sources);
        let mut summary = TaskSummary {
            task_type: task_type.to_string(),
            pairs: pairs.len(),
            ..TaskSummary::default()
        };

        let report = self.dispatcher.run(pairs.into_vec()).await?;
        summary.cached = report.cached;
        summary.evaluated = report.evaluated;
        summary.failed = report.failed;

        info!("Writing results");
        for category in &self.args.categories {
            let files = self.category_files(task_type, category);
            let save_dir = self.args.save_dir(task_type, category);
            let projector = ResultProjector::new(&report.results, category);

            for outcome in projector.project_all(&files, &save_dir) {
                match outcome.result {
                    Ok(_) => summary.files_written += 1,
                    Err(_) => summary.files_failed += 1,
                }
            }
        }

        info!(
            pairs = summary.pairs,
            cached = summary.cached,
            evaluated = summary.evaluated,
            failed = summary.failed,
            files_written = summary.files_written,
            files_failed = summary.files_failed,
            "Task complete"
        );
        Ok(summary)
    }

    /// Runs every task type in order. Stops at the first cache write failure.
    pub async fn run(&self) -> BatchResult<RunSummary> {
        let mut summary = RunSummary::default();
        for task_type in self.task_types()? {
            summary.tasks.push(self.run_task(&task_type).await?);
        }
        Ok(summary)
    }
}

fn is_jsonl(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}
