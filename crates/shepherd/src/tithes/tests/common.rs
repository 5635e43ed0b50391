use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::members::{
    Department, DepartmentId, Member, MemberCredentials, MemberId, MemberRepository, Role,
};
use crate::notifications::{
    Notification, NotificationDispatcher, NotificationId, NotificationRepository,
};
use crate::store::{DateRange, MemoryStore, RepositoryError};
use crate::testing::RecordingMailer;
use crate::tithes::{
    GivingPlan, ReceiptGenerator, ReminderPolicy, TitheFrequency, TitheId, TitheRecord,
    TitheRepository, TitheService, TitheStats,
};

pub(super) fn payment(
    member: &Member,
    frequency: TitheFrequency,
    payment_date: NaiveDate,
    amount: i64,
) -> TitheRecord {
    TitheRecord {
        id: TitheId::new(),
        member_id: member.id,
        amount: Decimal::new(amount, 0),
        frequency,
        payment_date,
        payment_method: "transfer".to_string(),
        receipt_number: format!("SEED-{}", TitheId::new().0.simple()),
        notes: None,
        created_at: Utc::now(),
    }
}

pub(super) async fn pay(
    store: &MemoryStore,
    member: &Member,
    frequency: TitheFrequency,
    payment_date: NaiveDate,
) {
    store
        .insert_tithe(payment(member, frequency, payment_date, 5_000))
        .await
        .expect("seed tithe");
}

/// Memory store whose first `collisions` tithe inserts report a receipt conflict.
pub(super) struct CollidingStore {
    pub(super) inner: MemoryStore,
    collisions: AtomicU32,
    pub(super) attempts: AtomicU32,
}

impl CollidingStore {
    pub(super) fn new(collisions: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            collisions: AtomicU32::new(collisions),
            attempts: AtomicU32::new(0),
        }
    }
}

pub(super) fn colliding_service(
    store: Arc<CollidingStore>,
) -> TitheService<CollidingStore, RecordingMailer> {
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        Arc::new(RecordingMailer::default()),
        "Grace Chapel",
    ));
    TitheService::new(
        store,
        dispatcher,
        ReceiptGenerator::new("GRC"),
        ReminderPolicy::default(),
    )
}

#[async_trait]
impl TitheRepository for CollidingStore {
    async fn insert_tithe(&self, record: TitheRecord) -> Result<TitheRecord, RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.collisions.load(Ordering::SeqCst);
        if remaining > 0 {
            self.collisions.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict);
        }
        self.inner.insert_tithe(record).await
    }

    async fn tithes_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<TitheRecord>, RepositoryError> {
        self.inner.tithes_for_member(member, range).await
    }

    async fn tithe_by_receipt(&self, receipt: &str) -> Result<Option<TitheRecord>, RepositoryError> {
        self.inner.tithe_by_receipt(receipt).await
    }

    async fn giving_plans(&self) -> Result<Vec<GivingPlan>, RepositoryError> {
        self.inner.giving_plans().await
    }

    async fn payments_after(
        &self,
        member: MemberId,
        frequency: TitheFrequency,
        after: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        self.inner.payments_after(member, frequency, after).await
    }

    async fn tithe_stats(&self, member: MemberId) -> Result<TitheStats, RepositoryError> {
        self.inner.tithe_stats(member).await
    }
}

#[async_trait]
impl MemberRepository for CollidingStore {
    async fn insert_member(&self, record: MemberCredentials) -> Result<Member, RepositoryError> {
        self.inner.insert_member(record).await
    }

    async fn member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        self.inner.member(id).await
    }

    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<MemberCredentials>, RepositoryError> {
        self.inner.credentials_by_email(email).await
    }

    async fn active_members(&self) -> Result<Vec<Member>, RepositoryError> {
        self.inner.active_members().await
    }

    async fn set_active(&self, id: MemberId, active: bool) -> Result<Member, RepositoryError> {
        self.inner.set_active(id, active).await
    }

    async fn set_role(&self, id: MemberId, role: Role) -> Result<Member, RepositoryError> {
        self.inner.set_role(id, role).await
    }

    async fn set_department(
        &self,
        id: MemberId,
        department: Option<DepartmentId>,
    ) -> Result<Member, RepositoryError> {
        self.inner.set_department(id, department).await
    }

    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        self.inner.department(id).await
    }

    async fn set_department_head(
        &self,
        id: DepartmentId,
        head: Option<MemberId>,
    ) -> Result<Department, RepositoryError> {
        self.inner.set_department_head(id, head).await
    }

    async fn insert_department(
        &self,
        department: Department,
    ) -> Result<Department, RepositoryError> {
        self.inner.insert_department(department).await
    }

    async fn department_head(&self, member: MemberId) -> Result<Option<Member>, RepositoryError> {
        self.inner.department_head(member).await
    }

    async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError> {
        self.inner.birthdays_on(date).await
    }
}

#[async_trait]
impl NotificationRepository for CollidingStore {
    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, RepositoryError> {
        self.inner.insert_notification(notification).await
    }

    async fn notifications_for(
        &self,
        member: MemberId,
        is_read: Option<bool>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.notifications_for(member, is_read).await
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        member: MemberId,
    ) -> Result<Option<Notification>, RepositoryError> {
        self.inner.mark_read(id, member).await
    }

    async fn mark_all_read(&self, member: MemberId) -> Result<u64, RepositoryError> {
        self.inner.mark_all_read(member).await
    }
}
