use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::{DateRange, RepositoryError};
use crate::attendance::{AttendanceRecord, AttendanceRepository};
use crate::members::{Department, DepartmentId, Member, MemberCredentials, MemberId, MemberRepository, Role};
use crate::notifications::{Notification, NotificationId, NotificationRepository};
use crate::tithes::{GivingPlan, TitheFrequency, TitheRecord, TitheRepository, TitheStats};

/// Process-local store used for development without a database and in tests.
///
/// Each table sits behind its own mutex; no method holds two guards at once.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    members: Arc<Mutex<HashMap<MemberId, MemberCredentials>>>,
    departments: Arc<Mutex<HashMap<DepartmentId, Department>>>,
    attendance: Arc<Mutex<Vec<AttendanceRecord>>>,
    tithes: Arc<Mutex<Vec<TitheRecord>>>,
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored notification, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().expect("notification mutex poisoned").clone()
    }

    /// Snapshot of every attendance row.
    pub fn attendance_rows(&self) -> Vec<AttendanceRecord> {
        self.attendance.lock().expect("attendance mutex poisoned").clone()
    }

    pub fn member_count(&self) -> usize {
        self.members.lock().expect("member mutex poisoned").len()
    }

    fn update_member(
        &self,
        id: MemberId,
        apply: impl FnOnce(&mut Member),
    ) -> Result<Member, RepositoryError> {
        let mut guard = self.members.lock().expect("member mutex poisoned");
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply(&mut record.member);
        record.member.updated_at = Utc::now();
        Ok(record.member.clone())
    }

    /// Mirrors the foreign key the relational schema enforces.
    fn require_department(&self, id: DepartmentId) -> Result<(), RepositoryError> {
        if self
            .departments
            .lock()
            .expect("department mutex poisoned")
            .contains_key(&id)
        {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn active_ids(&self) -> HashSet<MemberId> {
        self.members
            .lock()
            .expect("member mutex poisoned")
            .values()
            .filter(|record| record.member.is_active)
            .map(|record| record.member.id)
            .collect()
    }
}

fn sorted_members(mut members: Vec<Member>) -> Vec<Member> {
    members.sort_by(|a, b| {
        (a.last_name.as_str(), a.first_name.as_str()).cmp(&(b.last_name.as_str(), b.first_name.as_str()))
    });
    members
}

#[async_trait]
impl MemberRepository for MemoryStore {
    async fn insert_member(&self, record: MemberCredentials) -> Result<Member, RepositoryError> {
        if let Some(department) = record.member.department_id {
            self.require_department(department)?;
        }

        let mut guard = self.members.lock().expect("member mutex poisoned");
        if guard
            .values()
            .any(|existing| existing.member.email == record.member.email)
        {
            return Err(RepositoryError::Conflict);
        }
        let member = record.member.clone();
        guard.insert(member.id, record);
        Ok(member)
    }

    async fn member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        let guard = self.members.lock().expect("member mutex poisoned");
        Ok(guard.get(&id).map(|record| record.member.clone()))
    }

    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<MemberCredentials>, RepositoryError> {
        let guard = self.members.lock().expect("member mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.member.email == email)
            .cloned())
    }

    async fn active_members(&self) -> Result<Vec<Member>, RepositoryError> {
        let guard = self.members.lock().expect("member mutex poisoned");
        let members = guard
            .values()
            .filter(|record| record.member.is_active)
            .map(|record| record.member.clone())
            .collect();
        Ok(sorted_members(members))
    }

    async fn set_active(&self, id: MemberId, active: bool) -> Result<Member, RepositoryError> {
        self.update_member(id, |member| member.is_active = active)
    }

    async fn set_role(&self, id: MemberId, role: Role) -> Result<Member, RepositoryError> {
        self.update_member(id, |member| member.role = role)
    }

    async fn set_department(
        &self,
        id: MemberId,
        department: Option<DepartmentId>,
    ) -> Result<Member, RepositoryError> {
        if let Some(department) = department {
            self.require_department(department)?;
        }
        self.update_member(id, |member| member.department_id = department)
    }

    async fn insert_department(
        &self,
        department: Department,
    ) -> Result<Department, RepositoryError> {
        let mut guard = self.departments.lock().expect("department mutex poisoned");
        if guard.values().any(|existing| existing.name == department.name) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(department.id, department.clone());
        Ok(department)
    }

    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let guard = self.departments.lock().expect("department mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    async fn set_department_head(
        &self,
        id: DepartmentId,
        head: Option<MemberId>,
    ) -> Result<Department, RepositoryError> {
        if let Some(head) = head {
            if self.member(head).await?.is_none() {
                return Err(RepositoryError::NotFound);
            }
        }

        let mut guard = self.departments.lock().expect("department mutex poisoned");
        let department = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        department.head_id = head;
        Ok(department.clone())
    }

    async fn department_head(&self, member: MemberId) -> Result<Option<Member>, RepositoryError> {
        let Some(department_id) = self
            .member(member)
            .await?
            .and_then(|member| member.department_id)
        else {
            return Ok(None);
        };

        let head_id = self
            .departments
            .lock()
            .expect("department mutex poisoned")
            .get(&department_id)
            .and_then(|department| department.head_id);

        match head_id {
            Some(head_id) => Ok(self.member(head_id).await?.filter(|head| head.is_active)),
            None => Ok(None),
        }
    }

    async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError> {
        let guard = self.members.lock().expect("member mutex poisoned");
        let members = guard
            .values()
            .map(|record| &record.member)
            .filter(|member| member.is_active && member.birthday_falls_on(date))
            .cloned()
            .collect();
        Ok(sorted_members(members))
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn upsert_attendance(
        &self,
        record: AttendanceRecord,
    ) -> Result<AttendanceRecord, RepositoryError> {
        let mut guard = self.attendance.lock().expect("attendance mutex poisoned");
        if let Some(existing) = guard.iter_mut().find(|existing| {
            existing.member_id == record.member_id && existing.service_date == record.service_date
        }) {
            existing.check_in_time = record.check_in_time;
            existing.status = record.status;
            existing.notes = record.notes;
            return Ok(existing.clone());
        }
        guard.push(record.clone());
        Ok(record)
    }

    async fn attendance_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.attendance.lock().expect("attendance mutex poisoned");
        let mut records: Vec<AttendanceRecord> = guard
            .iter()
            .filter(|record| record.member_id == member && range.contains(record.service_date))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.service_date.cmp(&a.service_date));
        Ok(records)
    }

    async fn attendance_on(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let guard = self.attendance.lock().expect("attendance mutex poisoned");
        let mut records: Vec<AttendanceRecord> = guard
            .iter()
            .filter(|record| record.service_date == date)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.check_in_time);
        Ok(records)
    }

    async fn service_dates(
        &self,
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<NaiveDate>, RepositoryError> {
        let guard = self.attendance.lock().expect("attendance mutex poisoned");
        let mut dates: Vec<NaiveDate> = guard
            .iter()
            .map(|record| record.service_date)
            .filter(|date| range.contains(*date))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        if let Some(limit) = limit {
            dates.truncate(limit);
        }
        Ok(dates)
    }

    async fn absent_members(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError> {
        let checked_in: HashSet<MemberId> = self
            .attendance
            .lock()
            .expect("attendance mutex poisoned")
            .iter()
            .filter(|record| record.service_date == date)
            .map(|record| record.member_id)
            .collect();

        let guard = self.members.lock().expect("member mutex poisoned");
        let members = guard
            .values()
            .map(|record| &record.member)
            .filter(|member| member.is_active && !checked_in.contains(&member.id))
            .cloned()
            .collect();
        Ok(sorted_members(members))
    }
}

#[async_trait]
impl TitheRepository for MemoryStore {
    async fn insert_tithe(&self, record: TitheRecord) -> Result<TitheRecord, RepositoryError> {
        let mut guard = self.tithes.lock().expect("tithe mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.receipt_number == record.receipt_number)
        {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    async fn tithes_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<TitheRecord>, RepositoryError> {
        let guard = self.tithes.lock().expect("tithe mutex poisoned");
        let mut records: Vec<TitheRecord> = guard
            .iter()
            .filter(|record| record.member_id == member && range.contains(record.payment_date))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(records)
    }

    async fn tithe_by_receipt(&self, receipt: &str) -> Result<Option<TitheRecord>, RepositoryError> {
        let guard = self.tithes.lock().expect("tithe mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| record.receipt_number == receipt)
            .cloned())
    }

    async fn giving_plans(&self) -> Result<Vec<GivingPlan>, RepositoryError> {
        let active = self.active_ids();
        let guard = self.tithes.lock().expect("tithe mutex poisoned");

        let mut latest: BTreeMap<(MemberId, TitheFrequency), NaiveDate> = BTreeMap::new();
        for record in guard.iter().filter(|record| active.contains(&record.member_id)) {
            let entry = latest
                .entry((record.member_id, record.frequency))
                .or_insert(record.payment_date);
            if record.payment_date > *entry {
                *entry = record.payment_date;
            }
        }

        Ok(latest
            .into_iter()
            .map(|((member_id, frequency), last_payment)| GivingPlan {
                member_id,
                frequency,
                last_payment,
            })
            .collect())
    }

    async fn payments_after(
        &self,
        member: MemberId,
        frequency: TitheFrequency,
        after: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        let guard = self.tithes.lock().expect("tithe mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| {
                record.member_id == member
                    && record.frequency == frequency
                    && record.payment_date > after
            })
            .count() as u32)
    }

    async fn tithe_stats(&self, member: MemberId) -> Result<TitheStats, RepositoryError> {
        let guard = self.tithes.lock().expect("tithe mutex poisoned");
        let records: Vec<&TitheRecord> = guard
            .iter()
            .filter(|record| record.member_id == member)
            .collect();

        Ok(TitheStats {
            total_amount: records.iter().map(|record| record.amount).sum::<Decimal>(),
            total_payments: records.len() as u32,
            last_payment_date: records.iter().map(|record| record.payment_date).max(),
        })
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, RepositoryError> {
        let mut guard = self.notifications.lock().expect("notification mutex poisoned");
        if let Some(key) = &notification.idempotency_key {
            if guard
                .iter()
                .any(|existing| existing.idempotency_key.as_ref() == Some(key))
            {
                return Err(RepositoryError::Conflict);
            }
        }
        guard.push(notification.clone());
        Ok(notification)
    }

    async fn notifications_for(
        &self,
        member: MemberId,
        is_read: Option<bool>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let guard = self.notifications.lock().expect("notification mutex poisoned");
        let mut notifications: Vec<Notification> = guard
            .iter()
            .rev()
            .filter(|notification| {
                notification.member_id == member
                    && is_read.map_or(true, |flag| notification.is_read == flag)
            })
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        member: MemberId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let mut guard = self.notifications.lock().expect("notification mutex poisoned");
        let Some(notification) = guard
            .iter_mut()
            .find(|notification| notification.id == id && notification.member_id == member)
        else {
            return Ok(None);
        };

        if !notification.is_read {
            notification.is_read = true;
            notification.read_at = Some(Utc::now());
        }
        Ok(Some(notification.clone()))
    }

    async fn mark_all_read(&self, member: MemberId) -> Result<u64, RepositoryError> {
        let mut guard = self.notifications.lock().expect("notification mutex poisoned");
        let now = Utc::now();
        let mut updated = 0;
        for notification in guard
            .iter_mut()
            .filter(|notification| notification.member_id == member && !notification.is_read)
        {
            notification.is_read = true;
            notification.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }
}
