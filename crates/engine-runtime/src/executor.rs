use crate::{
    error::RuntimeError,
    registry::{ImportJob, ImportOutcome, ImportRegistry},
};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of one job, keyed by its record kind.
pub type JobReport = (&'static str, ImportOutcome);

/// How long cancelled imports get to write their artifacts before their
/// tasks are aborted.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Runs every job as its own task so independent imports interleave on the
/// shared scheduler. Outcomes come back in job order.
///
/// Unknown kinds are rejected before anything is spawned. Cancelling
/// `cancel` stops every run through its own abort path, so failed records
/// and summaries are still flushed; tasks still running after
/// [`SHUTDOWN_GRACE`] are aborted.
pub async fn run_all(
    registry: &ImportRegistry,
    jobs: Vec<ImportJob>,
    cancel: CancellationToken,
) -> Result<Vec<JobReport>, RuntimeError> {
    let futures = jobs
        .into_iter()
        .map(|job| {
            let key = job.kind.key();
            let job = job.with_cancellation(cancel.child_token());
            registry.run(job).map(|fut| (key, fut))
        })
        .collect::<Result<Vec<(&'static str, BoxFuture<'static, ImportOutcome>)>, _>>()?;

    info!(jobs = futures.len(), "Launching imports");

    let handles: Vec<_> = futures
        .into_iter()
        .map(|(key, fut)| (key, tokio::spawn(fut)))
        .collect();
    let aborts: Vec<_> = handles.iter().map(|(_, h)| h.abort_handle()).collect();

    let mut collect = Box::pin(async move {
        let mut reports = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let outcome = handle.await?;
            if let Err(aborted) = &outcome {
                warn!(kind = key, error = %aborted, "Import finished with an error");
            }
            reports.push((key, outcome));
        }
        Ok::<_, RuntimeError>(reports)
    });

    tokio::select! {
        reports = &mut collect => reports,
        _ = cancel.cancelled() => {
            warn!("Shutdown requested, stopping running imports");
            match tokio::time::timeout(SHUTDOWN_GRACE, collect).await {
                Ok(Ok(reports)) => {
                    for (key, outcome) in &reports {
                        info!(kind = key, completed = outcome.is_ok(), "Import stopped");
                    }
                }
                Ok(Err(e)) => warn!(error = %e, "Import task failed while stopping"),
                Err(_) => {
                    warn!("Imports did not stop in time, aborting their tasks");
                    for abort in aborts {
                        abort.abort();
                    }
                }
            }
            Err(RuntimeError::ShutdownRequested)
        }
    }
}
