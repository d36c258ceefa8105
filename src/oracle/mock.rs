//! In-process oracles for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::error::{OracleError, OracleResult};
use super::types::{EditScore, ScoringBatch};
use super::{BatchScorer, PairEvaluator};
use crate::constants::{CONSISTENCY, OVERALL, PROMPT_FOLLOWING};
use crate::hashing::cache_key;
use crate::pairs::Pair;

/// Tracks how many calls are running at once.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Deterministic [`PairEvaluator`] with call accounting and failure injection.
#[derive(Debug, Default)]
pub struct MockEvaluator {
    calls: AtomicUsize,
    in_flight: InFlight,
    delay: Option<Duration>,
    failing: HashSet<Pair>,
    panicking: HashSet<Pair>,
    fixed: HashMap<Pair, Value>,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes `pair` return an oracle error.
    pub fn fail_on(mut self, pair: Pair) -> Self {
        self.failing.insert(pair);
        self
    }

    /// Makes `pair` panic mid-evaluation.
    pub fn panic_on(mut self, pair: Pair) -> Self {
        self.panicking.insert(pair);
        self
    }

    /// Returns `result` for `pair` instead of the derived score.
    pub fn respond_with(mut self, pair: Pair, result: Value) -> Self {
        self.fixed.insert(pair, result);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }

    /// Score derived from the pair's key, stable across runs.
    pub fn derived_score(pair: &Pair) -> Value {
        let base = f64::from(cache_key(pair).as_bytes()[0] % 11);
        json!({
            PROMPT_FOLLOWING: base,
            CONSISTENCY: 10.0 - base,
            OVERALL: base.min(10.0 - base),
        })
    }
}

#[async_trait]
impl PairEvaluator for MockEvaluator {
    async fn evaluate(&self, pair: &Pair) -> OracleResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        if self.panicking.contains(pair) {
            panic!("mock evaluator panic for {}", pair.output_image);
        }
        if self.failing.contains(pair) {
            return Err(OracleError::Unavailable(format!(
                "cannot open {}",
                pair.output_image
            )));
        }
        if let Some(result) = self.fixed.get(pair) {
            return Ok(result.clone());
        }
        Ok(Self::derived_score(pair))
    }
}

/// Shared counters of a [`MockBatchScorer`], readable after the scorer is moved into a broker.
#[derive(Debug, Default)]
pub struct MockScorerStats {
    batches: AtomicUsize,
    items: AtomicUsize,
    in_flight: InFlight,
}

impl MockScorerStats {
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn items(&self) -> usize {
        self.items.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }
}

/// [`BatchScorer`] driven by item metadata.
///
/// - `"overall": <number>` sets the returned overall score (default `default_overall`).
/// - `"fail": true` makes the whole batch return an error.
/// - `"panic": true` makes the scorer panic.
/// - `"short": true` makes the scorer drop the last item from its output.
#[derive(Debug)]
pub struct MockBatchScorer {
    default_overall: f64,
    delay: Option<Duration>,
    stats: Arc<MockScorerStats>,
}

impl Default for MockBatchScorer {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl MockBatchScorer {
    pub fn new(default_overall: f64) -> Self {
        Self {
            default_overall,
            delay: None,
            stats: Arc::new(MockScorerStats::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn stats(&self) -> Arc<MockScorerStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl BatchScorer for MockBatchScorer {
    async fn score_batch(&mut self, batch: &ScoringBatch) -> OracleResult<Vec<EditScore>> {
        self.stats.batches.fetch_add(1, Ordering::SeqCst);
        self.stats.items.fetch_add(batch.len(), Ordering::SeqCst);
        self.stats.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.stats.in_flight.exit();

        let flag = |name: &str| {
            batch
                .items
                .iter()
                .any(|item| item.metadata.get(name).and_then(Value::as_bool) == Some(true))
        };
        if flag("panic") {
            panic!("mock scorer panic");
        }
        if flag("fail") {
            return Err(OracleError::Unavailable("mock scorer failure".to_string()));
        }

        let mut scores: Vec<EditScore> = batch
            .items
            .iter()
            .map(|item| {
                let overall = item
                    .metadata
                    .get("overall")
                    .and_then(Value::as_f64)
                    .unwrap_or(self.default_overall);
                EditScore {
                    semantic_consistency: json!(overall),
                    semantic_consistency_reasoning: format!(
                        "follows: {}",
                        item.instruction().unwrap_or_default()
                    ),
                    perceptual_quality: json!(overall),
                    perceptual_quality_reasoning: "looks natural".to_string(),
                    ..EditScore::with_overall(overall)
                }
            })
            .collect();
        if flag("short") {
            scores.pop();
        }
        Ok(scores)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
