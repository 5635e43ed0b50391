use chrono::{NaiveDate, Utc};

use crate::attendance::{AttendanceRecord, AttendanceRepository, AttendanceStatus, CheckIn};
use crate::members::Member;
use crate::store::MemoryStore;
use crate::testing::date;

/// Five consecutive Sundays ending on 9 March 2025.
pub(super) fn sundays() -> Vec<NaiveDate> {
    vec![
        date(2025, 2, 9),
        date(2025, 2, 16),
        date(2025, 2, 23),
        date(2025, 3, 2),
        date(2025, 3, 9),
    ]
}

/// The Monday the weekly scan fires after the last Sunday.
pub(super) fn scan_day() -> NaiveDate {
    date(2025, 3, 10)
}

pub(super) fn row(member: &Member, service_date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
    let mut check_in = CheckIn::present(member.id, service_date);
    check_in.status = status;
    check_in.into_record(Utc::now())
}

pub(super) async fn attend(store: &MemoryStore, member: &Member, dates: &[NaiveDate]) {
    for service_date in dates {
        store
            .upsert_attendance(row(member, *service_date, AttendanceStatus::Present))
            .await
            .expect("record attendance");
    }
}
