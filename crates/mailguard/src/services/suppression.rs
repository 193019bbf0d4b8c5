//! Suppress and restore marketing email for tagged customers.
//!
//! Suppression replaces each tagged customer's Shopify email with a
//! synthetic `@noemail.fake` address so no marketing email reaches them,
//! remembering the real address in [`SuppressionStore`]. Restoration puts
//! every remembered address back and deletes the store.
//!
//! The two jobs share one run flag: suppress skips when it is taken, and
//! restore waits (bounded) for it before touching the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use mailguard_core::{CustomerRef, SuppressedAddress, SuppressionRecord};
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument, warn};

use crate::directory::{CustomerDirectory, with_retry};
use crate::pacing::Pacing;
use crate::store::{StoreError, SuppressionStore};

/// Errors that abort a suppress or restore pass.
#[derive(Debug, Error)]
pub enum SuppressionError {
    #[error("suppression run still active after waiting {}s", .waited.as_secs())]
    RunStillActive { waited: Duration },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a suppress call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressOutcome {
    /// Another run held the run flag; nothing was done.
    AlreadyRunning,
    Completed(SuppressReport),
}

/// Counters of a finished suppress pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressReport {
    /// Customers carrying the suppression tag.
    pub candidates: usize,
    /// Customers whose email was replaced in this pass.
    pub suppressed: usize,
    /// Customers already on a synthetic address or without an email.
    pub skipped: usize,
    /// Customers whose email update failed after retries.
    pub failed: usize,
    /// Records in the pending set after the pass.
    pub pending: usize,
    pub elapsed: Duration,
}

/// What a restore call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No pending suppression set on disk.
    NothingToRestore,
    Completed(RestoreReport),
}

/// Counters of a finished restore pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Holds the run flag until dropped.
#[must_use = "the run flag is released when the guard is dropped"]
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Orchestrates suppress and restore passes.
pub struct SuppressionCoordinator {
    directory: Arc<dyn CustomerDirectory>,
    store: SuppressionStore,
    tag: String,
    pacing: Pacing,
    running: AtomicBool,
}

impl std::fmt::Debug for SuppressionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppressionCoordinator")
            .field("store", &self.store)
            .field("tag", &self.tag)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SuppressionCoordinator {
    #[must_use]
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        store: SuppressionStore,
        tag: impl Into<String>,
        pacing: Pacing,
    ) -> Self {
        Self {
            directory,
            store,
            tag: tag.into(),
            pacing,
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &SuppressionStore {
        &self.store
    }

    /// Whether a suppress or restore pass currently holds the run flag.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Take the run flag, or `None` if a pass already holds it.
    pub fn try_begin_run(&self) -> Option<RunGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                flag: &self.running,
            })
    }

    /// Whether a suppression is pending restoration.
    pub async fn has_pending(&self) -> bool {
        self.store.exists().await
    }

    /// Replace the email of every tagged customer with a synthetic address.
    ///
    /// Records found in an existing pending set are kept, so a second run
    /// before restore only adds customers the first one missed. The set is
    /// saved after every replaced email and once more at the end.
    ///
    /// # Errors
    ///
    /// Returns `SuppressionError::Store` if the pending set cannot be read
    /// or written. The pass stops at the first write failure.
    #[instrument(skip(self), fields(tag = %self.tag))]
    pub async fn suppress(&self) -> Result<SuppressOutcome, SuppressionError> {
        let Some(_guard) = self.try_begin_run() else {
            warn!("Suppression or restore already running, skipping suppress");
            return Ok(SuppressOutcome::AlreadyRunning);
        };
        let started = Instant::now();

        let existing = self.store.load().await?;
        let had_pending_set = existing.is_some();
        let mut records = existing.unwrap_or_default();
        if had_pending_set {
            warn!(
                pending = records.len(),
                "Previous suppression was never restored, merging into it"
            );
        }

        let customers = self.directory.list_by_tag(&self.tag).await;
        info!(count = customers.len(), "Suppressing marketing email");

        let mut report = SuppressReport {
            candidates: customers.len(),
            ..SuppressReport::default()
        };

        for customer in &customers {
            if SuppressedAddress::matches(&customer.email) {
                info!(customer_id = %customer.id, "Already suppressed, skipping");
                report.skipped += 1;
                continue;
            }
            if customer.email.trim().is_empty() {
                info!(customer_id = %customer.id, "Customer has no email, skipping");
                report.skipped += 1;
                continue;
            }

            if self.suppress_one(customer).await {
                upsert_record(&mut records, customer);
                report.suppressed += 1;
                if let Err(e) = self.store.save(&records).await {
                    error!(
                        customer_id = %customer.id,
                        original_email = %customer.email,
                        error = %e,
                        "Failed to checkpoint suppression set, stopping run"
                    );
                    return Err(e.into());
                }
            } else {
                report.failed += 1;
            }

            sleep(self.pacing.suppression_delay).await;
        }

        if had_pending_set || !records.is_empty() {
            self.store.save(&records).await?;
        }

        report.pending = records.len();
        report.elapsed = started.elapsed();
        info!(
            candidates = report.candidates,
            suppressed = report.suppressed,
            skipped = report.skipped,
            failed = report.failed,
            pending = report.pending,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Suppression complete"
        );

        Ok(SuppressOutcome::Completed(report))
    }

    async fn suppress_one(&self, customer: &CustomerRef) -> bool {
        let address = SuppressedAddress::new(customer.id, Utc::now()).to_string();

        let result = with_retry("set_email", customer.id, self.pacing.retry_delay, || {
            self.directory.set_email(customer.id, &address)
        })
        .await;

        match result {
            Ok(()) => {
                debug!(customer_id = %customer.id, %address, "Email suppressed");
                true
            }
            Err(e) => {
                error!(customer_id = %customer.id, error = %e, "Failed to suppress email");
                false
            }
        }
    }

    /// Put every pending customer's original email back and delete the set.
    ///
    /// Waits for a running suppress pass to finish, polling at the
    /// configured interval up to the configured limit. Every record is
    /// attempted once (with retries); failures are logged and counted and
    /// the set is deleted after the full pass regardless.
    ///
    /// # Errors
    ///
    /// Returns `SuppressionError::RunStillActive` if the run flag never
    /// cleared, and `SuppressionError::Store` if the pending set is
    /// unreadable or malformed (it is left on disk) or cannot be deleted.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<RestoreOutcome, SuppressionError> {
        let _guard = self.wait_for_run_flag().await?;
        let started = Instant::now();

        let Some(records) = self.store.load().await? else {
            debug!("No pending suppression set, nothing to restore");
            return Ok(RestoreOutcome::NothingToRestore);
        };
        info!(count = records.len(), "Restoring suppressed customers");

        let mut report = RestoreReport::default();
        for record in &records {
            let result = with_retry("set_email", record.id, self.pacing.retry_delay, || {
                self.directory.set_email(record.id, &record.original_email)
            })
            .await;

            match result {
                Ok(()) => {
                    debug!(customer_id = %record.id, "Email restored");
                    report.restored += 1;
                }
                Err(e) => {
                    error!(
                        customer_id = %record.id,
                        original_email = %record.original_email,
                        error = %e,
                        "Failed to restore email"
                    );
                    report.failed += 1;
                }
            }

            sleep(self.pacing.suppression_delay).await;
        }

        self.store.delete().await?;

        report.elapsed = started.elapsed();
        info!(
            restored = report.restored,
            failed = report.failed,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Restore complete"
        );

        Ok(RestoreOutcome::Completed(report))
    }

    async fn wait_for_run_flag(&self) -> Result<RunGuard<'_>, SuppressionError> {
        let deadline = Instant::now() + self.pacing.restore_wait_limit;
        loop {
            if let Some(guard) = self.try_begin_run() {
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                warn!(
                    waited_secs = self.pacing.restore_wait_limit.as_secs(),
                    "Suppression run still active, aborting restore"
                );
                return Err(SuppressionError::RunStillActive {
                    waited: self.pacing.restore_wait_limit,
                });
            }
            debug!("Waiting for suppression run to finish");
            sleep(self.pacing.restore_poll_interval).await;
        }
    }
}

/// Add `customer` to the pending set, replacing a stale record for the same id.
fn upsert_record(records: &mut Vec<SuppressionRecord>, customer: &CustomerRef) {
    if let Some(existing) = records.iter_mut().find(|r| r.id == customer.id) {
        warn!(
            customer_id = %customer.id,
            "Customer had a real email despite a pending record, keeping the newer address"
        );
        existing.original_email.clone_from(&customer.email);
    } else {
        records.push(SuppressionRecord {
            id: customer.id,
            original_email: customer.email.clone(),
        });
    }
}
