//! Single-consumer bridge between concurrent callers and a non-reentrant scorer.
//!
//! Any number of producers [`submit`](RequestBroker::submit) requests; one background
//! task owns the [`BatchScorer`] and processes them strictly one at a time, in FIFO
//! order. Each outcome is parked in a pending table under its request id until the
//! producer [`poll`](RequestBroker::poll)s it. An outcome is handed out exactly once.
//!
//! ```text
//! submit ──► mpsc (FIFO) ──► consumer ──► scorer.score_batch()
//!   │                            │
//!   └── pending[id] = Enqueued   └── pending[id] = Done(outcome), notify
//!
//! poll(id) ──► wait on notify ──► remove pending[id] when Done
//! ```

pub mod error;
mod request;
mod types;


pub use error::{BrokerError, BrokerResult, PollError};
pub use request::ScoreRequest;
pub use types::{BrokerConfig, BrokerOutcome, RequestStatus};

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;
use tracing::{Instrument, Span, error, info, info_span, warn};
use uuid::Uuid;

use crate::oracle::{BatchScorer, ScoringBatch};
use crate::reward::{RewardPayload, RewardScale};
use types::RequestState;

struct Envelope {
    id: Uuid,
    batch: ScoringBatch,
    span: Span,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<Uuid, RequestState>>,
    completed: Notify,
    queued: AtomicUsize,
}

impl Shared {
    fn set_state(&self, id: Uuid, state: RequestState) {
        if let Some(slot) = self.pending.lock().get_mut(&id) {
            *slot = state;
        }
    }

    /// Removes and returns the outcome if `id` is terminal.
    fn take_if_done(&self, id: Uuid) -> Result<Option<BrokerOutcome>, PollError> {
        let mut pending = self.pending.lock();
        match pending.remove(&id) {
            None => Err(PollError::UnknownRequest(id)),
            Some(RequestState::Done(outcome)) => Ok(Some(outcome)),
            Some(state) => {
                pending.insert(id, state);
                Ok(None)
            }
        }
    }
}

/// Cloneable handle to the broker. The consumer stops once every handle is dropped.
#[derive(Clone)]
pub struct RequestBroker {
    sender: mpsc::UnboundedSender<Envelope>,
    shared: Arc<Shared>,
    config: BrokerConfig,
}

impl std::fmt::Debug for RequestBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBroker")
            .field("queue_depth", &self.queue_depth())
            .field("pending", &self.pending_len())
            .field("config", &self.config)
            .finish()
    }
}

impl RequestBroker {
    /// Starts the consumer task. Must be called from within a tokio runtime.
    pub fn spawn(scorer: Box<dyn BatchScorer>, config: BrokerConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        tokio::spawn(consumer_task(
            scorer,
            receiver,
            Arc::clone(&shared),
            config.reward_scale,
        ));

        Self {
            sender,
            shared,
            config,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Validates `request` and enqueues it. Returns without waiting for the scorer.
    pub fn submit(&self, request: ScoreRequest) -> BrokerResult<Uuid> {
        let batch = request.validate()?;
        let id = Uuid::new_v4();
        let items = batch.len();

        self.shared.pending.lock().insert(id, RequestState::Enqueued);
        self.shared.queued.fetch_add(1, Ordering::AcqRel);

        let envelope = Envelope {
            id,
            batch,
            span: Span::current(),
        };
        if self.sender.send(envelope).is_err() {
            self.shared.pending.lock().remove(&id);
            self.shared.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(BrokerError::Closed);
        }

        info!(request_id = %id, items, queue_depth = self.queue_depth(), "Request enqueued");
        Ok(id)
    }

    /// Waits up to `timeout` for request `id` to finish and takes its outcome.
    ///
    /// On timeout the request stays pending and may be polled again. A timeout too large
    /// to express as a deadline (e.g. [`Duration::MAX`]) waits without bound.
    pub async fn poll(&self, id: Uuid, timeout: Duration) -> Result<BrokerOutcome, PollError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let notified = self.shared.completed.notified();
            tokio::pin!(notified);
            // Register before checking so a completion in between is not missed.
            notified.as_mut().enable();

            if let Some(outcome) = self.shared.take_if_done(id)? {
                return Ok(outcome);
            }
            let Some(deadline) = deadline else {
                notified.await;
                continue;
            };
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                warn!(request_id = %id, ?timeout, "Timed out waiting for request");
                return Err(PollError::Timeout {
                    id,
                    waited: timeout,
                });
            }
        }
    }

    /// Submits and waits with the configured request timeout.
    pub async fn submit_and_wait(&self, request: ScoreRequest) -> BrokerResult<BrokerOutcome> {
        let id = self.submit(request)?;
        Ok(self.poll(id, self.config.request_timeout).await?)
    }

    /// `None` once the outcome has been retrieved, or for ids never submitted.
    pub fn status(&self, id: Uuid) -> Option<RequestStatus> {
        self.shared.pending.lock().get(&id).map(RequestState::status)
    }

    /// Requests waiting for the consumer.
    pub fn queue_depth(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    /// Requests not yet retrieved, in any state.
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}

async fn consumer_task(
    mut scorer: Box<dyn BatchScorer>,
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    shared: Arc<Shared>,
    scale: RewardScale,
) {
    info!(scorer = scorer.name(), "Broker consumer started");

    while let Some(Envelope { id, batch, span }) = receiver.recv().await {
        shared.queued.fetch_sub(1, Ordering::AcqRel);
        shared.set_state(id, RequestState::Processing);

        let request_span = info_span!(parent: &span, "score_request", request_id = %id, items = batch.len());
        let outcome = process_request(scorer.as_mut(), batch, &scale)
            .instrument(request_span)
            .await;

        shared.set_state(id, RequestState::Done(outcome));
        shared.completed.notify_waiters();
    }

    info!("Broker consumer stopped");
}

async fn process_request(
    scorer: &mut dyn BatchScorer,
    batch: ScoringBatch,
    scale: &RewardScale,
) -> BrokerOutcome {
    let started = Instant::now();
    let result = AssertUnwindSafe(scorer.score_batch(&batch))
        .catch_unwind()
        .await;

    let outcome = match result {
        Ok(Ok(scores)) if scores.len() == batch.len() => BrokerOutcome::Completed(
            scores
                .iter()
                .zip(batch.items)
                .map(|(score, item)| RewardPayload::derive(score, item.metadata, scale))
                .collect(),
        ),
        Ok(Ok(scores)) => BrokerOutcome::Failed(internal_error(format!(
            "scorer returned {} scores for {} items",
            scores.len(),
            batch.len()
        ))),
        Ok(Err(e)) => BrokerOutcome::Failed(internal_error(e)),
        Err(panic) => BrokerOutcome::Failed(internal_error(panic_message(panic.as_ref()))),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        BrokerOutcome::Completed(_) => info!(elapsed_ms, "Request scored"),
        BrokerOutcome::Failed(reason) => error!(elapsed_ms, %reason, "Request failed"),
    }
    outcome
}

fn internal_error(detail: impl std::fmt::Display) -> String {
    format!("Internal server error: {detail}")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "scorer panicked".to_string()
    }
}
