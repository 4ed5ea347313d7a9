//! Background sweep that finishes booking updates left behind after a
//! ledger write.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use booking_types::{
    BookingStore, PendingReconciliation, ReconciliationQueue, ReconciliationStatus, RepoError,
};

/// Counts from a single sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub completed: usize,
    pub retried: usize,
    pub failed: usize,
}

/// Polls the reconciliation queue and re-applies booking status updates.
///
/// A marker that keeps failing stays `PENDING` until it has been tried
/// `max_attempts` times, then is marked `FAILED` for manual follow-up.
pub struct ReconciliationSweeper<R> {
    repo: Arc<R>,
    interval: Duration,
    max_attempts: i32,
    batch_size: i64,
}

impl<R> ReconciliationSweeper<R>
where
    R: BookingStore + ReconciliationQueue,
{
    pub fn new(repo: Arc<R>, interval: Duration, max_attempts: i32) -> Self {
        Self {
            repo,
            interval,
            max_attempts: max_attempts.max(1),
            batch_size: 10,
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_attempts = self.max_attempts,
            "Starting reconciliation sweeper"
        );
        loop {
            match self.sweep_once().await {
                Ok(report) if report != SweepReport::default() => {
                    info!(
                        completed = report.completed,
                        retried = report.retried,
                        failed = report.failed,
                        "Reconciliation sweep finished"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to fetch pending reconciliations: {}", e);
                }
            }
            sleep(self.interval).await;
        }
    }

    /// Processes one batch of pending markers.
    pub async fn sweep_once(&self) -> Result<SweepReport, RepoError> {
        let markers = self.repo.pending_reconciliations(self.batch_size).await?;
        let mut report = SweepReport::default();

        for marker in markers {
            match self.process_marker(&marker).await {
                ReconciliationStatus::Completed => report.completed += 1,
                ReconciliationStatus::Failed => report.failed += 1,
                ReconciliationStatus::Pending => report.retried += 1,
            }
        }

        Ok(report)
    }

    #[instrument(skip(self, marker), fields(marker_id = %marker.id, transaction_id = %marker.transaction_id))]
    async fn process_marker(&self, marker: &PendingReconciliation) -> ReconciliationStatus {
        let attempt = marker.attempts + 1;
        let result = self
            .repo
            .update_status(&marker.booking_key, marker.target_status)
            .await;

        let (status, last_error) = match result {
            Ok(true) => {
                info!(key = %marker.booking_key, status = %marker.target_status, "Booking status applied");
                (ReconciliationStatus::Completed, None)
            }
            // The booking is gone; retrying cannot help.
            Ok(false) => {
                warn!(key = %marker.booking_key, "Booking no longer exists");
                (
                    ReconciliationStatus::Failed,
                    Some(format!("no booking matches {}", marker.booking_key)),
                )
            }
            Err(e) if attempt >= self.max_attempts => {
                error!(attempt, "Giving up on booking status update: {}", e);
                (ReconciliationStatus::Failed, Some(e.to_string()))
            }
            Err(e) => {
                warn!(attempt, "Booking status update failed, will retry: {}", e);
                (ReconciliationStatus::Pending, Some(e.to_string()))
            }
        };

        if let Err(e) = self
            .repo
            .mark_reconciliation(marker.id, status.clone(), last_error)
            .await
        {
            error!("Failed to update reconciliation marker: {}", e);
        }

        status
    }
}
