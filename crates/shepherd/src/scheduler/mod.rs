//! Scheduled batch jobs: birthday greetings, the absence scan and tithe reminders.

pub mod cadence;
pub mod jobs;
pub mod router;
pub mod runner;


pub use cadence::Cadence;
pub use jobs::{BirthdayReport, Job, JobError, JobReport, JobRunner, UnknownJob};
pub use router::job_router;
pub use runner::Scheduler;
