//! Bounded parallel evaluation of cache misses.
//!
//! [`BoundedDispatcher::run`] serves cache hits directly and pushes every miss onto a
//! shared queue drained by a fixed number of worker tasks. Each successful evaluation is
//! committed to the [`ResultCache`] before it is reported, so an interrupted run only
//! loses the evaluations still in flight. Oracle failures and results without any score
//! category are dropped, not cached, and will be retried by the next run.

pub mod error;
mod progress;


pub use error::{DispatchError, DispatchResult};
pub use progress::{DispatchProgress, ProgressSnapshot};

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheError, ResultCache};
use crate::constants::PROGRESS_LOG_STEP;
use crate::hashing::cache_key;
use crate::oracle::{PairEvaluator, is_scored_result};
use crate::pairs::Pair;

/// Results of one dispatcher run.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Every pair with a result: cache hits plus fresh evaluations.
    pub results: HashMap<Pair, Value>,
    /// Pairs answered from the cache.
    pub cached: usize,
    /// Pairs evaluated and committed in this run.
    pub evaluated: usize,
    /// Pairs the oracle could not score (not cached).
    pub failed: usize,
}

enum WorkerEvent {
    Committed(Pair, Value),
    Failed(Pair),
    Fatal(DispatchError),
}

/// Evaluates cache misses with at most `workers` oracle calls in flight.
pub struct BoundedDispatcher {
    cache: Arc<ResultCache>,
    evaluator: Arc<dyn PairEvaluator>,
    workers: usize,
    progress: DispatchProgress,
}

impl BoundedDispatcher {
    /// `workers` is clamped to at least one.
    pub fn new(cache: Arc<ResultCache>, evaluator: Arc<dyn PairEvaluator>, workers: usize) -> Self {
        Self {
            cache,
            evaluator,
            workers: workers.max(1),
            progress: DispatchProgress::new(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Handle for observing the current run from elsewhere.
    pub fn progress(&self) -> DispatchProgress {
        self.progress.clone()
    }

    /// Evaluates every pair not already cached and returns all known results.
    ///
    /// A cache write failure stops the run and is returned; entries committed before it
    /// stay in the cache.
    pub async fn run<I>(&self, pairs: I) -> DispatchResult<DispatchReport>
    where
        I: IntoIterator<Item = Pair>,
    {
        let mut report = DispatchReport::default();
        let mut misses = VecDeque::new();
        let mut seen = HashSet::new();

        for pair in pairs {
            if !seen.insert(pair.clone()) {
                continue;
            }
            match self.cache.get_pair(&pair) {
                Some(result) => {
                    report.results.insert(pair, result);
                }
                None => misses.push_back(pair),
            }
        }
        report.cached = report.results.len();

        let total = misses.len();
        self.progress.start(total);
        info!(
            cached = report.cached,
            to_evaluate = total,
            workers = self.workers.min(total),
            "Dispatching cache misses"
        );
        if total == 0 {
            return Ok(report);
        }

        let queue = Arc::new(Mutex::new(misses));
        let abort = Arc::new(AtomicBool::new(false));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers.min(total) {
            workers.spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&self.cache),
                Arc::clone(&self.evaluator),
                Arc::clone(&abort),
                event_tx.clone(),
            ));
        }
        drop(event_tx);

        let mut fatal = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                WorkerEvent::Committed(pair, result) => {
                    report.results.insert(pair, result);
                    report.evaluated += 1;
                    self.progress.record_completed();
                }
                WorkerEvent::Failed(_) => {
                    report.failed += 1;
                    self.progress.record_failed();
                }
                WorkerEvent::Fatal(e) => {
                    abort.store(true, Ordering::Release);
                    fatal.get_or_insert(e);
                }
            }

            let snapshot = self.progress.snapshot();
            if snapshot.finished() % PROGRESS_LOG_STEP == 0 || snapshot.remaining() == 0 {
                info!(
                    completed = snapshot.completed,
                    failed = snapshot.failed,
                    total = snapshot.total,
                    "Evaluation progress"
                );
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatcher worker terminated abnormally");
                fatal.get_or_insert(DispatchError::Worker(e.to_string()));
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        info!(
            cached = report.cached,
            evaluated = report.evaluated,
            failed = report.failed,
            "Dispatch complete"
        );
        Ok(report)
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<Pair>>>,
    cache: Arc<ResultCache>,
    evaluator: Arc<dyn PairEvaluator>,
    abort: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    loop {
        if abort.load(Ordering::Acquire) {
            break;
        }
        let Some(pair) = queue.lock().pop_front() else {
            break;
        };

        let outcome = AssertUnwindSafe(evaluator.evaluate(&pair))
            .catch_unwind()
            .await;

        let event = match outcome {
            Ok(Ok(result)) if !is_scored_result(&result) => {
                warn!(worker_id, output = %pair.output_image, "Oracle result carries no scores");
                WorkerEvent::Failed(pair)
            }
            Ok(Ok(result)) => match commit(&cache, &pair, &result).await {
                Ok(()) => WorkerEvent::Committed(pair, result),
                Err(e) => {
                    abort.store(true, Ordering::Release);
                    let _ = events.send(WorkerEvent::Fatal(e));
                    break;
                }
            },
            Ok(Err(e)) => {
                warn!(worker_id, output = %pair.output_image, error = %e, "Oracle returned no result");
                WorkerEvent::Failed(pair)
            }
            Err(_) => {
                warn!(worker_id, output = %pair.output_image, "Oracle call panicked");
                WorkerEvent::Failed(pair)
            }
        };

        if events.send(event).is_err() {
            break;
        }
    }
    debug!(worker_id, "Dispatcher worker finished");
}

async fn commit(cache: &Arc<ResultCache>, pair: &Pair, result: &Value) -> DispatchResult<()> {
    let cache = Arc::clone(cache);
    let key = cache_key(pair);
    let result = result.clone();
    tokio::task::spawn_blocking(move || cache.put(key, result))
        .await
        .map_err(|e| DispatchError::Worker(e.to_string()))?
        .map_err(|e: CacheError| {
            error!(key = %key, error = %e, "Failed to commit result to cache");
            DispatchError::Cache(e)
        })
}
