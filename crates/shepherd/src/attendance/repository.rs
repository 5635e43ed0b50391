use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::AttendanceRecord;
use crate::members::{Member, MemberId};
use crate::store::{DateRange, RepositoryError};

/// Storage abstraction for attendance history.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Insert the record, or update check-in time, status and notes of the
    /// existing row for the same member and service date.
    async fn upsert_attendance(
        &self,
        record: AttendanceRecord,
    ) -> Result<AttendanceRecord, RepositoryError>;
    /// Newest service date first.
    async fn attendance_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    /// Ordered by check-in time.
    async fn attendance_on(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    /// Distinct service dates across all members, newest first.
    async fn service_dates(
        &self,
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<NaiveDate>, RepositoryError>;
    /// Active members with no attendance row at all for `date`.
    async fn absent_members(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError>;
}
