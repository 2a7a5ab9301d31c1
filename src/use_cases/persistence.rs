// Death-record persistence: submissions leave the tick as messages to a
// gateway worker task; outcomes come back on a channel drained only during
// the scheduler's sweep. Failures land in a bounded retry queue — data loss
// is always reported, never silent.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::domain::ports::DeathSink;
use crate::domain::state::{Player, SessionStats};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("persistence endpoint returned status {0}")]
    Status(u16),
    #[error("persistence transport failed: {0}")]
    Transport(String),
    #[error("gateway worker unavailable")]
    WorkerGone,
}

/// One death record on its way to the progression store.
#[derive(Debug, Clone)]
pub struct DeathSubmission {
    pub account_id: String,
    pub display_name: String,
    pub stats: SessionStats,
    /// 0 for the original submission, incremented per retry.
    pub retry_count: u32,
}

/// Result of one gateway attempt, reported by the worker.
#[derive(Debug)]
pub struct DeathOutcome {
    pub submission: DeathSubmission,
    pub result: Result<(), GatewayError>,
}

/// What the gateway worker needs from a persistence backend.
pub trait PersistenceGateway: Send + Sync + 'static {
    fn record(
        &self,
        submission: &DeathSubmission,
    ) -> impl std::future::Future<Output = Result<(), GatewayError>> + Send;
}

/// Owns the gateway loop: one attempt per submission, outcome always
/// reported. Runs until the submission channel closes.
pub async fn gateway_worker<G: PersistenceGateway>(
    gateway: G,
    mut submissions: mpsc::UnboundedReceiver<DeathSubmission>,
    outcomes: mpsc::UnboundedSender<DeathOutcome>,
) {
    while let Some(submission) = submissions.recv().await {
        let result = gateway.record(&submission).await;
        if let Err(e) = &result {
            warn!(
                account_id = %submission.account_id,
                retry_count = submission.retry_count,
                error = %e,
                "death record attempt failed"
            );
        }
        if outcomes.send(DeathOutcome { submission, result }).is_err() {
            // Simulation side is gone; nothing left to report to.
            return;
        }
    }
}

#[derive(Debug, Error)]
#[error("failure queue at capacity ({capacity}); entry rejected")]
pub struct QueueFull {
    pub capacity: usize,
}

/// A failed death record awaiting retry.
#[derive(Debug, Clone)]
pub struct DeathAttempt {
    pub submission: DeathSubmission,
    pub failed_at: Instant,
    pub last_retry: Instant,
}

/// Bounded retry buffer. Overflow rejects the newcomer; existing entries
/// are never evicted to make room.
#[derive(Debug)]
pub struct FailureRecoveryQueue {
    entries: Vec<DeathAttempt>,
    capacity: usize,
}

impl FailureRecoveryQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, attempt: DeathAttempt) -> Result<(), QueueFull> {
        if self.entries.len() >= self.capacity {
            return Err(QueueFull {
                capacity: self.capacity,
            });
        }
        self.entries.push(attempt);
        Ok(())
    }

    /// Remove and return entries whose backoff has elapsed. Entries only
    /// re-enter the queue through a fresh failure outcome.
    pub fn take_due(&mut self, now: Instant, backoff: Duration) -> Vec<DeathAttempt> {
        let mut due = Vec::new();
        self.entries.retain(|e| {
            if now.saturating_duration_since(e.last_retry) >= backoff {
                due.push(e.clone());
                false
            } else {
                true
            }
        });
        due
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub backoff: Duration,
    pub max_retries: u32,
    pub capacity: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(30),
            max_retries: 5,
            capacity: 100,
        }
    }
}

/// The death-progression dependency injected into combat resolution.
/// `record_death` never blocks and never errors into the tick; everything
/// slow or fallible happens on the worker side of the channels.
pub struct DeathPersistence {
    submit_tx: mpsc::UnboundedSender<DeathSubmission>,
    outcome_rx: mpsc::UnboundedReceiver<DeathOutcome>,
    queue: FailureRecoveryQueue,
    config: RetryConfig,
}

impl DeathPersistence {
    pub fn new(
        submit_tx: mpsc::UnboundedSender<DeathSubmission>,
        outcome_rx: mpsc::UnboundedReceiver<DeathOutcome>,
        config: RetryConfig,
    ) -> Self {
        Self {
            submit_tx,
            outcome_rx,
            queue: FailureRecoveryQueue::new(config.capacity),
            config,
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Drain worker outcomes, queue fresh failures, and resubmit entries
    /// whose backoff has elapsed. Called on a low cadence by the scheduler.
    pub fn sweep(&mut self, now: Instant) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome.result {
                Ok(()) => {
                    debug!(
                        account_id = %outcome.submission.account_id,
                        retry_count = outcome.submission.retry_count,
                        "death record persisted"
                    );
                }
                Err(e) => self.queue_failure(outcome.submission, &e, now),
            }
        }

        for entry in self.queue.take_due(now, self.config.backoff) {
            let mut submission = entry.submission;
            submission.retry_count += 1;
            info!(
                account_id = %submission.account_id,
                retry_count = submission.retry_count,
                "retrying death record"
            );
            if let Err(send_err) = self.submit_tx.send(submission) {
                self.queue_failure(send_err.0, &GatewayError::WorkerGone, now);
            }
        }
    }

    fn queue_failure(&mut self, submission: DeathSubmission, cause: &GatewayError, now: Instant) {
        if submission.retry_count >= self.config.max_retries {
            error!(
                account_id = %submission.account_id,
                retries = submission.retry_count,
                error = %cause,
                "abandoning death record; progression data lost"
            );
            return;
        }
        let attempt = DeathAttempt {
            submission,
            failed_at: now,
            last_retry: now,
        };
        if let Err(full) = self.queue.push(attempt.clone()) {
            error!(
                account_id = %attempt.submission.account_id,
                capacity = full.capacity,
                "failure queue full, death record dropped; progression data lost"
            );
        }
    }
}

impl crate::use_cases::scheduler::RecoverySweep for DeathPersistence {
    fn sweep(&mut self, now: Instant) {
        DeathPersistence::sweep(self, now);
    }
}

impl DeathSink for DeathPersistence {
    fn record_death(&mut self, player: &Player, stats: SessionStats, now: Instant) {
        let Some(account_id) = &player.account_id else {
            warn!(
                player_id = player.id,
                name = %player.display_name,
                "death without persistence identity, record dropped"
            );
            return;
        };
        let submission = DeathSubmission {
            account_id: account_id.clone(),
            display_name: player.display_name.clone(),
            stats,
            retry_count: 0,
        };
        if let Err(send_err) = self.submit_tx.send(submission) {
            self.queue_failure(send_err.0, &GatewayError::WorkerGone, now);
        }
    }
}
