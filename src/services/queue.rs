//! Investigation Queue Worker
//!
//! Consumes investigation envelopes from a bounded channel and drives the
//! engine with bounded concurrency. Retryable failures are redelivered with
//! exponential backoff; anything else, or an envelope out of deliveries, is
//! dead-lettered to the log.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::{InvestigationEngine, InvestigationOutcome};
use crate::models::{InvestigationRequest, WorkerConfig};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Invalid investigation request: {0}")]
    Invalid(String),

    #[error("Investigation queue is full")]
    Full,

    #[error("Investigation queue is shut down")]
    Closed,
}

/// One envelope plus its delivery bookkeeping.
struct Delivery {
    request: InvestigationRequest,
    /// Deliveries made so far.
    attempt: u32,
    backoff: ExponentialBackoff,
}

impl Delivery {
    fn new(request: InvestigationRequest, config: &WorkerConfig) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(config.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(config.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();
        Self {
            request,
            attempt: 0,
            backoff,
        }
    }
}

/// Handle for submitting envelopes to the running worker.
#[derive(Clone)]
pub struct QueueWorker {
    sender: mpsc::Sender<Delivery>,
    depth: Arc<AtomicUsize>,
    config: WorkerConfig,
}

impl QueueWorker {
    /// Spawn the consumer loop. It drains in-flight investigations and
    /// exits once `shutdown` is cancelled.
    pub fn start(
        engine: Arc<InvestigationEngine>,
        config: WorkerConfig,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel::<Delivery>(config.queue_capacity.max(1));
        let depth = Arc::new(AtomicUsize::new(0));

        let worker = Self {
            sender,
            depth,
            config,
        };
        let handle = tokio::spawn(worker.clone().process_deliveries(receiver, engine, shutdown));
        (worker, handle)
    }

    /// Submit an envelope without waiting for capacity.
    pub fn enqueue(&self, request: InvestigationRequest) -> Result<(), QueueError> {
        request.validate().map_err(QueueError::Invalid)?;
        let case_id = request.case_id.clone();
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.sender
            .try_send(Delivery::new(request, &self.config))
            .map_err(|e| {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                match e {
                    mpsc::error::TrySendError::Full(_) => QueueError::Full,
                    mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
                }
            })?;
        debug!(case_id = %case_id, "investigation enqueued");
        Ok(())
    }

    /// Envelopes waiting for a worker, scheduled redeliveries included.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    async fn process_deliveries(
        self,
        mut receiver: mpsc::Receiver<Delivery>,
        engine: Arc<InvestigationEngine>,
        shutdown: CancellationToken,
    ) {
        let concurrency = self.config.concurrency.max(1);
        let permits = Arc::new(Semaphore::new(concurrency));
        info!(concurrency, "investigation worker started");

        loop {
            let delivery = tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = receiver.recv() => match msg {
                    Some(d) => d,
                    None => break,
                },
            };
            self.depth.fetch_sub(1, Ordering::SeqCst);

            let permit = tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!(
                        case_id = %delivery.request.case_id,
                        "shutdown before investigation started"
                    );
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let worker = self.clone();
            let engine = engine.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                worker.deliver(delivery, &engine, &shutdown).await;
                drop(permit);
            });
        }

        // Wait for in-flight investigations before returning.
        let _ = permits.acquire_many(concurrency as u32).await;
        info!("investigation worker stopped");
    }

    async fn deliver(
        &self,
        mut delivery: Delivery,
        engine: &InvestigationEngine,
        shutdown: &CancellationToken,
    ) {
        delivery.attempt += 1;
        let case_id = delivery.request.case_id.clone();

        let err = match engine.investigate(&delivery.request).await {
            Ok(InvestigationOutcome::Verdict(v)) => {
                info!(case_id = %case_id, decision = %v.decision, "delivery completed");
                return;
            }
            Ok(InvestigationOutcome::Cancelled) => {
                info!(case_id = %case_id, "delivery completed as cancelled");
                return;
            }
            Err(e) => e,
        };

        if !err.is_retryable() || delivery.attempt >= self.config.max_deliveries {
            error!(
                case_id = %case_id,
                attempt = delivery.attempt,
                error = %err,
                "investigation dead-lettered"
            );
            return;
        }

        let delay = delivery
            .backoff
            .next_backoff()
            .unwrap_or(Duration::from_millis(self.config.max_backoff_ms));
        warn!(
            case_id = %case_id,
            attempt = delivery.attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "investigation failed, redelivering"
        );

        self.depth.fetch_add(1, Ordering::SeqCst);
        let sender = self.sender.clone();
        let depth = self.depth.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    depth.fetch_sub(1, Ordering::SeqCst);
                }
                _ = tokio::time::sleep(delay) => {
                    if sender.send(delivery).await.is_err() {
                        depth.fetch_sub(1, Ordering::SeqCst);
                        error!(case_id = %case_id, "queue closed before redelivery");
                    }
                }
            }
        });
    }
}
