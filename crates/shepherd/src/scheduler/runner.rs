use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::jobs::{Job, JobError, JobRunner};
use crate::notifications::Mailer;
use crate::store::Store;

/// In-process scheduler: one task per job, each sleeping until its next fire time.
pub struct Scheduler<S, M> {
    runner: Arc<JobRunner<S, M>>,
    shutdown: CancellationToken,
}

impl<S, M> Scheduler<S, M>
where
    S: Store,
    M: Mailer + 'static,
{
    pub fn new(runner: Arc<JobRunner<S, M>>, shutdown: CancellationToken) -> Self {
        Self { runner, shutdown }
    }

    /// Spawn every job loop. Handles finish once the token is cancelled.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        Job::ALL
            .into_iter()
            .map(|job| {
                let runner = self.runner.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(run_job_loop(runner, job, shutdown))
            })
            .collect()
    }
}

async fn run_job_loop<S, M>(runner: Arc<JobRunner<S, M>>, job: Job, shutdown: CancellationToken)
where
    S: Store,
    M: Mailer + 'static,
{
    let cadence = job.cadence();
    tracing::info!(%job, %cadence, "job scheduled");

    loop {
        let wait = cadence.until_next(Local::now());
        tracing::debug!(%job, wait_secs = wait.as_secs(), "sleeping until next run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let today = Local::now().date_naive();
                match runner.run(job, today).await {
                    Ok(_) | Err(JobError::AlreadyRunning(_)) => {}
                    Err(err) => tracing::error!(%job, error = %err, "scheduled job failed"),
                }
            }
            _ = shutdown.cancelled() => {
                tracing::info!(%job, "job loop stopped");
                return;
            }
        }
    }
}
