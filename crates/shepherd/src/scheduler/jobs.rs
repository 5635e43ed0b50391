use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use tokio::sync::Mutex;

use super::cadence::Cadence;
use crate::attendance::{AbsenceScanReport, AttendanceService, AttendanceServiceError};
use crate::notifications::{
    Dispatch, DispatchError, Mailer, NotificationDispatcher, NotificationDraft, NotificationType,
};
use crate::store::{RepositoryError, Store};
use crate::tithes::{TitheScanReport, TitheService, TitheServiceError};

/// The scheduled batch jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Job {
    Birthdays,
    Absences,
    TitheReminders,
}

impl Job {
    pub const ALL: [Job; 3] = [Job::Birthdays, Job::Absences, Job::TitheReminders];

    pub fn as_str(self) -> &'static str {
        match self {
            Job::Birthdays => "birthdays",
            Job::Absences => "absences",
            Job::TitheReminders => "tithe-reminders",
        }
    }

    pub fn cadence(self) -> Cadence {
        match self {
            Job::Birthdays => Cadence::Daily {
                at: NaiveTime::MIN,
            },
            Job::Absences => Cadence::Weekly {
                weekday: Weekday::Mon,
                at: hour(10),
            },
            Job::TitheReminders => Cadence::Weekly {
                weekday: Weekday::Fri,
                at: hour(17),
            },
        }
    }
}

fn hour(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job '{0}' (expected birthdays, absences or tithe-reminders)")]
pub struct UnknownJob(pub String);

impl FromStr for Job {
    type Err = UnknownJob;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "birthdays" => Ok(Job::Birthdays),
            "absences" => Ok(Job::Absences),
            "tithe-reminders" => Ok(Job::TitheReminders),
            other => Err(UnknownJob(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BirthdayReport {
    pub date: Option<NaiveDate>,
    pub greeted: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "job", rename_all = "kebab-case")]
pub enum JobReport {
    Birthdays(BirthdayReport),
    Absences(AbsenceScanReport),
    TitheReminders(TitheScanReport),
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job {0} is already running")]
    AlreadyRunning(Job),
    #[error(transparent)]
    Attendance(#[from] AttendanceServiceError),
    #[error(transparent)]
    Tithes(#[from] TitheServiceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Default)]
struct JobLocks {
    birthdays: Mutex<()>,
    absences: Mutex<()>,
    tithe_reminders: Mutex<()>,
}

impl JobLocks {
    fn get(&self, job: Job) -> &Mutex<()> {
        match job {
            Job::Birthdays => &self.birthdays,
            Job::Absences => &self.absences,
            Job::TitheReminders => &self.tithe_reminders,
        }
    }
}

/// Executes jobs for both the scheduler loop and manual triggers.
///
/// Each job holds a local lock while it runs; a second run of the same job
/// fails fast with `AlreadyRunning` instead of queueing.
pub struct JobRunner<S, M> {
    store: Arc<S>,
    attendance: Arc<AttendanceService<S, M>>,
    tithes: Arc<TitheService<S, M>>,
    dispatcher: Arc<NotificationDispatcher<S, M>>,
    church_name: String,
    locks: JobLocks,
}

impl<S, M> JobRunner<S, M>
where
    S: Store,
    M: Mailer + 'static,
{
    pub fn new(
        store: Arc<S>,
        attendance: Arc<AttendanceService<S, M>>,
        tithes: Arc<TitheService<S, M>>,
        dispatcher: Arc<NotificationDispatcher<S, M>>,
        church_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            attendance,
            tithes,
            dispatcher,
            church_name: church_name.into(),
            locks: JobLocks::default(),
        }
    }

    pub async fn run(&self, job: Job, today: NaiveDate) -> Result<JobReport, JobError> {
        let Ok(_guard) = self.locks.get(job).try_lock() else {
            tracing::warn!(%job, "previous run still in progress; skipping");
            return Err(JobError::AlreadyRunning(job));
        };

        let started = Instant::now();
        tracing::info!(%job, %today, "job started");

        let report = match job {
            Job::Birthdays => JobReport::Birthdays(self.greet_birthdays(today).await?),
            Job::Absences => JobReport::Absences(self.attendance.scan_absences(today).await?),
            Job::TitheReminders => JobReport::TitheReminders(self.tithes.scan_missed(today).await?),
        };

        tracing::info!(
            %job,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job finished"
        );
        Ok(report)
    }

    async fn greet_birthdays(&self, today: NaiveDate) -> Result<BirthdayReport, JobError> {
        let members = self.store.birthdays_on(today).await?;
        let mut report = BirthdayReport {
            date: Some(today),
            ..BirthdayReport::default()
        };

        for member in &members {
            let draft = NotificationDraft::new(
                member.id,
                NotificationType::Birthday,
                "Happy Birthday!",
                format!(
                    "Happy Birthday {}! {} celebrates you today. May this new year of your life be filled with God's blessings, joy, and prosperity. We love you!",
                    member.first_name, self.church_name
                ),
            )
            .with_idempotency_key(format!("birthday:{}:{today}", member.id));

            match self.dispatcher.dispatch(draft).await? {
                Dispatch::Duplicate => report.duplicates += 1,
                _ => report.greeted += 1,
            }
        }

        tracing::info!(%today, greeted = report.greeted, "birthday greetings sent");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, Harness};

    #[tokio::test]
    async fn overlapping_runs_fail_fast() {
        let harness = Harness::new();
        let runner = harness.api.jobs.clone();

        let held = runner.locks.get(Job::Absences).lock().await;
        let err = runner
            .run(Job::Absences, date(2025, 3, 10))
            .await
            .expect_err("lock held");
        assert!(matches!(err, JobError::AlreadyRunning(Job::Absences)));

        runner
            .run(Job::Birthdays, date(2025, 3, 10))
            .await
            .expect("other jobs are unaffected");

        drop(held);
        runner
            .run(Job::Absences, date(2025, 3, 10))
            .await
            .expect("lock released");
    }
}
