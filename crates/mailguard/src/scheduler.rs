//! Cron jobs, startup recovery and the shutdown drain.
//!
//! Every job runs in the configured timezone and in its own task, so a
//! panicking pass is logged and the next firing still happens.

use std::future::Future;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{Instrument, error, info, info_span, warn};

use crate::services::{RestoreOutcome, SuppressOutcome};
use crate::state::AppState;

/// The four scheduled passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Suppress,
    Restore,
    TagDue,
    UntagExpired,
}

impl JobKind {
    pub const ALL: [Self; 4] = [
        Self::Suppress,
        Self::Restore,
        Self::TagDue,
        Self::UntagExpired,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Suppress => "suppress",
            Self::Restore => "restore",
            Self::TagDue => "tag_due",
            Self::UntagExpired => "untag_expired",
        }
    }

    fn schedule(self, state: &AppState) -> &str {
        let schedule = &state.config().schedule;
        match self {
            Self::Suppress => &schedule.suppress,
            Self::Restore => &schedule.restore,
            Self::TagDue => &schedule.tag_due,
            Self::UntagExpired => &schedule.untag_expired,
        }
    }
}

/// Create and start the scheduler with all four jobs.
///
/// # Errors
///
/// Returns `JobSchedulerError` if a cron expression is invalid or the
/// scheduler cannot start.
pub async fn start(state: &AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    let timezone = state.config().schedule.timezone;

    for kind in JobKind::ALL {
        let expression = kind.schedule(state).to_string();
        let job_state = state.clone();
        let job = Job::new_async_tz(expression.as_str(), timezone, move |_uuid, _l| {
            let state = job_state.clone();
            Box::pin(async move {
                run_isolated(kind, run_job(state, kind)).await;
            })
        })?;
        scheduler.add(job).await?;
        info!(job = kind.name(), cron = %expression, %timezone, "Scheduled job");
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Run one pass of `kind`, logging its outcome.
pub async fn run_job(state: AppState, kind: JobKind) {
    match kind {
        JobKind::Suppress => match state.coordinator().suppress().await {
            Ok(SuppressOutcome::Completed(_) | SuppressOutcome::AlreadyRunning) => {}
            Err(e) => error!(error = %e, "Suppression pass aborted"),
        },
        JobKind::Restore => {
            if let Err(e) = state.coordinator().restore().await {
                error!(error = %e, "Restore pass aborted");
            }
        }
        JobKind::TagDue => {
            state.tagger().tag_due().await;
        }
        JobKind::UntagExpired => {
            state.tagger().untag_expired().await;
        }
    }
}

/// Run `work` in its own task so a panic stays inside the job.
async fn run_isolated<F>(kind: JobKind, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let span = info_span!("job", job = kind.name());
    if let Err(e) = tokio::spawn(work.instrument(span)).await {
        error!(job = kind.name(), error = %e, "Scheduled job panicked");
    }
}

/// Restore a suppression left pending by a previous process.
pub async fn recover_pending(state: &AppState) {
    if !state.coordinator().has_pending().await {
        return;
    }

    warn!("Found a pending suppression set from a previous run, restoring");
    match state.coordinator().restore().await {
        Ok(RestoreOutcome::Completed(report)) => info!(
            restored = report.restored,
            failed = report.failed,
            "Startup recovery complete"
        ),
        Ok(RestoreOutcome::NothingToRestore) => {}
        Err(e) => error!(error = %e, "Startup recovery failed"),
    }
}

/// Stop the scheduler and put back any suppressed emails before exit.
pub async fn shutdown(mut scheduler: JobScheduler, state: &AppState) {
    if let Err(e) = scheduler.shutdown().await {
        warn!(error = %e, "Scheduler did not shut down cleanly");
    }

    info!("Restoring suppressed customers before exit");
    if let Err(e) = state.coordinator().restore().await {
        error!(error = %e, "Shutdown restore failed");
    }
}
