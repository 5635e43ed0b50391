use std::collections::HashSet;

use chrono::{Duration, NaiveDate};

use super::domain::{AttendanceRecord, AttendanceStatus};
use crate::config::NotificationThresholds;
use crate::store::DateRange;

/// Number of recent service dates considered when counting absences.
pub const ABSENCE_WINDOW: usize = 8;
/// How far back those service dates may lie.
pub const ABSENCE_LOOKBACK_DAYS: i64 = 56;

pub fn lookback_window(today: NaiveDate) -> DateRange {
    DateRange::between(today - Duration::days(ABSENCE_LOOKBACK_DAYS), today)
}

/// Count the recent service dates (at most `ABSENCE_WINDOW`) for which the
/// member has no `present` row. Excused and absent rows count as missed.
pub fn count_absences(recent_dates: &[NaiveDate], history: &[AttendanceRecord]) -> u32 {
    let attended: HashSet<NaiveDate> = history
        .iter()
        .filter(|record| record.status == AttendanceStatus::Present)
        .map(|record| record.service_date)
        .collect();

    let mut seen = HashSet::new();
    recent_dates
        .iter()
        .filter(|date| seen.insert(**date))
        .take(ABSENCE_WINDOW)
        .filter(|date| !attended.contains(date))
        .count() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceAction {
    None,
    Warn,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsencePolicy {
    pub warning_threshold: u32,
    pub critical_threshold: u32,
}

impl AbsencePolicy {
    pub fn from_thresholds(thresholds: &NotificationThresholds) -> Self {
        Self {
            warning_threshold: thresholds.absence_warning,
            critical_threshold: thresholds.absence_critical,
        }
    }

    pub fn classify(&self, absences: u32) -> AbsenceAction {
        if absences >= self.critical_threshold {
            AbsenceAction::Critical
        } else if absences >= self.warning_threshold {
            AbsenceAction::Warn
        } else {
            AbsenceAction::None
        }
    }
}

impl Default for AbsencePolicy {
    fn default() -> Self {
        Self::from_thresholds(&NotificationThresholds::default())
    }
}
