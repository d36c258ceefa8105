use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Counters {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Live view of a dispatcher run. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct DispatchProgress {
    inner: Arc<Counters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Cache misses scheduled for evaluation in the current run.
    pub total: usize,
    /// Misses evaluated and committed to the cache.
    pub completed: usize,
    /// Misses the oracle could not score.
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.finished())
    }
}

impl DispatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&self, total: usize) {
        self.inner.total.store(total, Ordering::Release);
        self.inner.completed.store(0, Ordering::Release);
        self.inner.failed.store(0, Ordering::Release);
    }

    pub(crate) fn record_completed(&self) -> usize {
        self.inner.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn record_failed(&self) -> usize {
        self.inner.failed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.inner.total.load(Ordering::Acquire),
            completed: self.inner.completed.load(Ordering::Acquire),
            failed: self.inner.failed.load(Ordering::Acquire),
        }
    }
}
