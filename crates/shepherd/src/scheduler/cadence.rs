use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Weekday};

/// When a job fires, in server-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Daily { at: NaiveTime },
    Weekly { weekday: Weekday, at: NaiveTime },
}

impl Cadence {
    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Cadence::Daily { at } => {
                let candidate = now.date().and_time(at);
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::days(1)
                }
            }
            Cadence::Weekly { weekday, at } => {
                let days_ahead = (7 + weekday.num_days_from_monday()
                    - now.weekday().num_days_from_monday())
                    % 7;
                let candidate = (now.date() + Duration::days(i64::from(days_ahead))).and_time(at);
                if candidate > now {
                    candidate
                } else {
                    candidate + Duration::weeks(1)
                }
            }
        }
    }

    /// Sleep needed from `now` until the next fire time.
    ///
    /// A fire time inside a DST gap is pushed forward by an hour.
    pub fn until_next(&self, now: DateTime<Local>) -> StdDuration {
        let next = self.next_after(now.naive_local());
        let target = Local
            .from_local_datetime(&next)
            .earliest()
            .or_else(|| Local.from_local_datetime(&(next + Duration::hours(1))).earliest())
            .unwrap_or(now + Duration::hours(1));
        (target - now).to_std().unwrap_or_default()
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Cadence::Weekly { weekday, at } => {
                write!(f, "every {weekday} at {}", at.format("%H:%M"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time")
    }

    #[test]
    fn daily_fires_later_today_or_tomorrow() {
        let cadence = Cadence::Daily { at: time(0) };
        assert_eq!(cadence.next_after(at(2025, 3, 3, 9, 30)), at(2025, 3, 4, 0, 0));
        assert_eq!(cadence.next_after(at(2025, 3, 3, 0, 0)), at(2025, 3, 4, 0, 0));

        let evening = Cadence::Daily { at: time(18) };
        assert_eq!(evening.next_after(at(2025, 3, 3, 9, 30)), at(2025, 3, 3, 18, 0));
    }

    #[test]
    fn weekly_rolls_to_the_next_matching_weekday() {
        let monday = Cadence::Weekly {
            weekday: Weekday::Mon,
            at: time(10),
        };
        // 2025-03-05 is a Wednesday.
        assert_eq!(monday.next_after(at(2025, 3, 5, 12, 0)), at(2025, 3, 10, 10, 0));
        // Monday before and after the fire time.
        assert_eq!(monday.next_after(at(2025, 3, 10, 9, 59)), at(2025, 3, 10, 10, 0));
        assert_eq!(monday.next_after(at(2025, 3, 10, 10, 0)), at(2025, 3, 17, 10, 0));
    }

    #[test]
    fn friday_evening_cadence() {
        let friday = Cadence::Weekly {
            weekday: Weekday::Fri,
            at: time(17),
        };
        assert_eq!(friday.next_after(at(2025, 3, 8, 8, 0)), at(2025, 3, 14, 17, 0));
    }
}
