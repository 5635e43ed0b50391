use chrono::{Datelike, Months, NaiveDate};

use super::domain::TitheFrequency;
use crate::config::NotificationThresholds;

/// Number of due dates `last_payment + k * interval` (k >= 1) on or before `today`.
///
/// Monthly steps are calendar months counted from `last_payment`, so a payment
/// on the 31st falls due on the last day of shorter months.
pub fn expected_payments(frequency: TitheFrequency, last_payment: NaiveDate, today: NaiveDate) -> u32 {
    if today <= last_payment {
        return 0;
    }

    let days = (today - last_payment).num_days();
    match frequency {
        TitheFrequency::Daily => days as u32,
        TitheFrequency::Weekly => (days / 7) as u32,
        TitheFrequency::Monthly => {
            let mut months = (today.year() - last_payment.year()) * 12
                + today.month() as i32
                - last_payment.month() as i32;
            while months > 0 && !due_by(last_payment, months as u32, today) {
                months -= 1;
            }
            months.max(0) as u32
        }
    }
}

fn due_by(last_payment: NaiveDate, months: u32, today: NaiveDate) -> bool {
    last_payment
        .checked_add_months(Months::new(months))
        .is_some_and(|due| due <= today)
}

/// Payments missed beyond the one currently falling due.
pub fn missed_payments(expected: u32, actual: u32) -> u32 {
    expected.saturating_sub(actual).saturating_sub(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    None,
    Remind,
    /// Remind the member and alert their department head.
    Escalate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    pub threshold: u32,
}

impl ReminderPolicy {
    pub fn from_thresholds(thresholds: &NotificationThresholds) -> Self {
        Self {
            threshold: thresholds.tithe_reminder,
        }
    }

    pub fn classify(&self, missed: u32) -> ReminderAction {
        if missed >= self.threshold.saturating_mul(2) {
            ReminderAction::Escalate
        } else if missed >= self.threshold {
            ReminderAction::Remind
        } else {
            ReminderAction::None
        }
    }
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self::from_thresholds(&NotificationThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn monthly_payment_four_months_ago_misses_three() {
        let today = date(2025, 6, 15);
        let expected = expected_payments(TitheFrequency::Monthly, date(2025, 2, 15), today);
        assert_eq!(expected, 4);
        assert_eq!(missed_payments(expected, 0), 3);
        assert_eq!(ReminderPolicy::default().classify(3), ReminderAction::Remind);
    }

    #[test]
    fn monthly_steps_stop_short_of_an_unreached_day() {
        assert_eq!(
            expected_payments(TitheFrequency::Monthly, date(2025, 2, 20), date(2025, 6, 15)),
            3
        );
    }

    #[test]
    fn month_end_payments_clamp_to_shorter_months() {
        assert_eq!(
            expected_payments(TitheFrequency::Monthly, date(2025, 1, 31), date(2025, 2, 28)),
            1
        );
    }

    #[test]
    fn daily_and_weekly_count_whole_intervals() {
        let last = date(2025, 3, 1);
        assert_eq!(expected_payments(TitheFrequency::Daily, last, date(2025, 3, 11)), 10);
        assert_eq!(expected_payments(TitheFrequency::Weekly, last, date(2025, 3, 21)), 2);
        assert_eq!(expected_payments(TitheFrequency::Weekly, last, date(2025, 3, 1)), 0);
    }

    #[test]
    fn missed_never_goes_negative() {
        assert_eq!(missed_payments(0, 0), 0);
        assert_eq!(missed_payments(1, 0), 0);
        assert_eq!(missed_payments(2, 5), 0);
    }

    #[test]
    fn escalation_starts_at_twice_the_threshold() {
        let policy = ReminderPolicy { threshold: 2 };
        assert_eq!(policy.classify(1), ReminderAction::None);
        assert_eq!(policy.classify(2), ReminderAction::Remind);
        assert_eq!(policy.classify(4), ReminderAction::Escalate);
    }
}
