//! Service check-ins and the absence scan that follows up on missing members.

pub mod absence;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use absence::{AbsenceAction, AbsencePolicy};
pub use domain::{
    AbsenceScanReport, AttendanceId, AttendanceRecord, AttendanceStats, AttendanceStatus,
    CheckIn, UnknownAttendanceStatus,
};
pub use repository::AttendanceRepository;
pub use router::attendance_router;
pub use service::{AttendanceService, AttendanceServiceError};
