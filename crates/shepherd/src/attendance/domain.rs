use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::members::MemberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceId(pub Uuid);

impl AttendanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttendanceId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown attendance status '{0}'")]
pub struct UnknownAttendanceStatus(pub String);

impl FromStr for AttendanceStatus {
    type Err = UnknownAttendanceStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "excused" => Ok(AttendanceStatus::Excused),
            other => Err(UnknownAttendanceStatus(other.to_string())),
        }
    }
}

/// One row per (member, service date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub member_id: MemberId,
    pub service_date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub is_first_timer: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A check-in resolved to a concrete member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    pub member_id: MemberId,
    pub service_date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub is_first_timer: bool,
    pub notes: Option<String>,
}

impl CheckIn {
    /// A `present` check-in stamped now.
    pub fn present(member_id: MemberId, service_date: NaiveDate) -> Self {
        Self {
            member_id,
            service_date,
            check_in_time: Utc::now(),
            status: AttendanceStatus::Present,
            is_first_timer: false,
            notes: None,
        }
    }

    pub(crate) fn into_record(self, created_at: DateTime<Utc>) -> AttendanceRecord {
        AttendanceRecord {
            id: AttendanceId::new(),
            member_id: self.member_id,
            service_date: self.service_date,
            check_in_time: self.check_in_time,
            status: self.status,
            is_first_timer: self.is_first_timer,
            notes: self.notes,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub total_services: u32,
    pub attended: u32,
    pub percentage: f64,
    pub consecutive_absences: u32,
}

/// Outcome of one absence scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AbsenceScanReport {
    /// Most recent service date on or before the run date; `None` when there is no history.
    pub service_date: Option<NaiveDate>,
    pub scanned: usize,
    pub warned: usize,
    pub critical: usize,
    pub escalated: usize,
    pub duplicates: usize,
}
