use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DateRange, RepositoryError};
use crate::attendance::{AttendanceId, AttendanceRecord, AttendanceRepository};
use crate::members::{
    Department, DepartmentId, Member, MemberCredentials, MemberId, MemberRepository, Role,
};
use crate::notifications::{Notification, NotificationId, NotificationRepository};
use crate::tithes::{GivingPlan, TitheFrequency, TitheId, TitheRecord, TitheRepository, TitheStats};

const MEMBER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, role, \
     department_id, cell_group_id, date_of_birth, address, is_first_timer, join_date, is_active, \
     created_at, updated_at";
const ATTENDANCE_COLUMNS: &str =
    "id, user_id, service_date, check_in_time, status, is_first_timer, notes, created_at";
const TITHE_COLUMNS: &str = "id, user_id, amount, frequency, payment_date, payment_method, \
     receipt_number, notes, created_at";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, type, title, message, is_read, read_at, metadata, idempotency_key, created_at";

/// Postgres-backed store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations. Each file runs in its own transaction.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn corrupt(column: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("unreadable {column} column: {err}"))
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    hod_id: Option<Uuid>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Self {
            id: DepartmentId(row.id),
            name: row.name,
            description: row.description,
            head_id: row.hod_id.map(MemberId),
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone_number: String,
    role: String,
    department_id: Option<Uuid>,
    cell_group_id: Option<Uuid>,
    date_of_birth: Option<NaiveDate>,
    address: Option<String>,
    is_first_timer: bool,
    join_date: NaiveDate,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MemberRow {
    fn into_credentials(self) -> Result<MemberCredentials, RepositoryError> {
        let role: Role = self.role.parse().map_err(|err| corrupt("role", err))?;
        Ok(MemberCredentials {
            member: Member {
                id: MemberId(self.id),
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                phone_number: self.phone_number,
                role,
                department_id: self.department_id.map(DepartmentId),
                cell_group_id: self.cell_group_id,
                date_of_birth: self.date_of_birth,
                address: self.address,
                is_first_timer: self.is_first_timer,
                join_date: self.join_date,
                is_active: self.is_active,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        })
    }

    fn into_member(self) -> Result<Member, RepositoryError> {
        Ok(self.into_credentials()?.member)
    }
}

fn into_members(rows: Vec<MemberRow>) -> Result<Vec<Member>, RepositoryError> {
    rows.into_iter().map(MemberRow::into_member).collect()
}

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: Uuid,
    user_id: Uuid,
    service_date: NaiveDate,
    check_in_time: DateTime<Utc>,
    status: String,
    is_first_timer: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = RepositoryError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            id: AttendanceId(row.id),
            member_id: MemberId(row.user_id),
            service_date: row.service_date,
            check_in_time: row.check_in_time,
            status: row.status.parse().map_err(|err| corrupt("status", err))?,
            is_first_timer: row.is_first_timer,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TitheRow {
    id: Uuid,
    user_id: Uuid,
    amount: Decimal,
    frequency: String,
    payment_date: NaiveDate,
    payment_method: String,
    receipt_number: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TitheRow> for TitheRecord {
    type Error = RepositoryError;

    fn try_from(row: TitheRow) -> Result<Self, Self::Error> {
        Ok(TitheRecord {
            id: TitheId(row.id),
            member_id: MemberId(row.user_id),
            amount: row.amount,
            frequency: row.frequency.parse().map_err(|err| corrupt("frequency", err))?,
            payment_date: row.payment_date,
            payment_method: row.payment_method,
            receipt_number: row.receipt_number,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GivingPlanRow {
    user_id: Uuid,
    frequency: String,
    last_payment: NaiveDate,
}

#[derive(sqlx::FromRow)]
struct TitheTotalsRow {
    total_amount: Decimal,
    total_payments: i64,
    last_payment: Option<NaiveDate>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    message: String,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    metadata: Value,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: NotificationId(row.id),
            member_id: MemberId(row.user_id),
            kind: row.kind.parse().map_err(|err| corrupt("type", err))?,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            read_at: row.read_at,
            metadata: row.metadata,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl MemberRepository for PgStore {
    async fn insert_member(&self, record: MemberCredentials) -> Result<Member, RepositoryError> {
        let member = &record.member;
        let sql = format!(
            "INSERT INTO users ({MEMBER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {MEMBER_COLUMNS}"
        );
        let row: MemberRow = sqlx::query_as(&sql)
            .bind(member.id.0)
            .bind(&member.email)
            .bind(&record.password_hash)
            .bind(&member.first_name)
            .bind(&member.last_name)
            .bind(&member.phone_number)
            .bind(member.role.as_str())
            .bind(member.department_id.map(|id| id.0))
            .bind(member.cell_group_id)
            .bind(member.date_of_birth)
            .bind(&member.address)
            .bind(member.is_first_timer)
            .bind(member.join_date)
            .bind(member.is_active)
            .bind(member.created_at)
            .bind(member.updated_at)
            .fetch_one(&self.pool)
            .await?;
        row.into_member()
    }

    async fn member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM users WHERE id = $1");
        let row: Option<MemberRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MemberRow::into_member).transpose()
    }

    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<MemberCredentials>, RepositoryError> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM users WHERE email = $1");
        let row: Option<MemberRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MemberRow::into_credentials).transpose()
    }

    async fn active_members(&self) -> Result<Vec<Member>, RepositoryError> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM users WHERE is_active ORDER BY last_name, first_name"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        into_members(rows)
    }

    async fn set_active(&self, id: MemberId, active: bool) -> Result<Member, RepositoryError> {
        let sql = format!(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        );
        let row: MemberRow = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(active)
            .fetch_one(&self.pool)
            .await?;
        row.into_member()
    }

    async fn set_department(
        &self,
        id: MemberId,
        department: Option<DepartmentId>,
    ) -> Result<Member, RepositoryError> {
        let sql = format!(
            "UPDATE users SET department_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        );
        let row: MemberRow = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(department.map(|id| id.0))
            .fetch_one(&self.pool)
            .await?;
        row.into_member()
    }

    async fn set_role(&self, id: MemberId, role: Role) -> Result<Member, RepositoryError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        );
        let row: MemberRow = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        row.into_member()
    }

    async fn insert_department(
        &self,
        department: Department,
    ) -> Result<Department, RepositoryError> {
        sqlx::query("INSERT INTO departments (id, name, description, hod_id) VALUES ($1, $2, $3, $4)")
            .bind(department.id.0)
            .bind(&department.name)
            .bind(&department.description)
            .bind(department.head_id.map(|id| id.0))
            .execute(&self.pool)
            .await?;
        Ok(department)
    }

    async fn department(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let row: Option<DepartmentRow> = sqlx::query_as(
            "SELECT id, name, description, hod_id FROM departments WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Department::from))
    }

    async fn set_department_head(
        &self,
        id: DepartmentId,
        head: Option<MemberId>,
    ) -> Result<Department, RepositoryError> {
        let row: DepartmentRow = sqlx::query_as(
            "UPDATE departments SET hod_id = $2 WHERE id = $1 \
             RETURNING id, name, description, hod_id",
        )
        .bind(id.0)
        .bind(head.map(|id| id.0))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn department_head(&self, member: MemberId) -> Result<Option<Member>, RepositoryError> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM users WHERE is_active AND id = ( \
                 SELECT d.hod_id FROM users u JOIN departments d ON d.id = u.department_id \
                 WHERE u.id = $1)"
        );
        let row: Option<MemberRow> = sqlx::query_as(&sql)
            .bind(member.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MemberRow::into_member).transpose()
    }

    async fn birthdays_on(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError> {
        let leap_day_fallback =
            date.month() == 2 && date.day() == 28 && !crate::members::domain::is_leap_year(date.year());
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM users \
             WHERE is_active AND date_of_birth IS NOT NULL AND ( \
                 (EXTRACT(MONTH FROM date_of_birth)::int = $1 AND EXTRACT(DAY FROM date_of_birth)::int = $2) \
                 OR ($3 AND EXTRACT(MONTH FROM date_of_birth)::int = 2 AND EXTRACT(DAY FROM date_of_birth)::int = 29)) \
             ORDER BY last_name, first_name"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(date.month() as i32)
            .bind(date.day() as i32)
            .bind(leap_day_fallback)
            .fetch_all(&self.pool)
            .await?;
        into_members(rows)
    }
}

#[async_trait]
impl AttendanceRepository for PgStore {
    async fn upsert_attendance(
        &self,
        record: AttendanceRecord,
    ) -> Result<AttendanceRecord, RepositoryError> {
        let sql = format!(
            "INSERT INTO attendance ({ATTENDANCE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, service_date) DO UPDATE SET \
                 check_in_time = EXCLUDED.check_in_time, \
                 status = EXCLUDED.status, \
                 notes = EXCLUDED.notes \
             RETURNING {ATTENDANCE_COLUMNS}"
        );
        let row: AttendanceRow = sqlx::query_as(&sql)
            .bind(record.id.0)
            .bind(record.member_id.0)
            .bind(record.service_date)
            .bind(record.check_in_time)
            .bind(record.status.as_str())
            .bind(record.is_first_timer)
            .bind(&record.notes)
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn attendance_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE user_id = $1 \
               AND ($2::date IS NULL OR service_date >= $2) \
               AND ($3::date IS NULL OR service_date <= $3) \
             ORDER BY service_date DESC"
        );
        let rows: Vec<AttendanceRow> = sqlx::query_as(&sql)
            .bind(member.0)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn attendance_on(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE service_date = $1 ORDER BY check_in_time ASC"
        );
        let rows: Vec<AttendanceRow> = sqlx::query_as(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn service_dates(
        &self,
        range: DateRange,
        limit: Option<usize>,
    ) -> Result<Vec<NaiveDate>, RepositoryError> {
        let limit = limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let dates: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT DISTINCT service_date FROM attendance \
             WHERE ($1::date IS NULL OR service_date >= $1) \
               AND ($2::date IS NULL OR service_date <= $2) \
             ORDER BY service_date DESC \
             LIMIT $3",
        )
        .bind(range.start)
        .bind(range.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    async fn absent_members(&self, date: NaiveDate) -> Result<Vec<Member>, RepositoryError> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM users \
             WHERE is_active AND NOT EXISTS ( \
                 SELECT 1 FROM attendance a WHERE a.user_id = users.id AND a.service_date = $1) \
             ORDER BY last_name, first_name"
        );
        let rows: Vec<MemberRow> = sqlx::query_as(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        into_members(rows)
    }
}

#[async_trait]
impl TitheRepository for PgStore {
    async fn insert_tithe(&self, record: TitheRecord) -> Result<TitheRecord, RepositoryError> {
        let sql = format!(
            "INSERT INTO tithes ({TITHE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {TITHE_COLUMNS}"
        );
        let row: TitheRow = sqlx::query_as(&sql)
            .bind(record.id.0)
            .bind(record.member_id.0)
            .bind(record.amount)
            .bind(record.frequency.as_str())
            .bind(record.payment_date)
            .bind(&record.payment_method)
            .bind(&record.receipt_number)
            .bind(&record.notes)
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn tithes_for_member(
        &self,
        member: MemberId,
        range: DateRange,
    ) -> Result<Vec<TitheRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {TITHE_COLUMNS} FROM tithes \
             WHERE user_id = $1 \
               AND ($2::date IS NULL OR payment_date >= $2) \
               AND ($3::date IS NULL OR payment_date <= $3) \
             ORDER BY payment_date DESC, created_at DESC"
        );
        let rows: Vec<TitheRow> = sqlx::query_as(&sql)
            .bind(member.0)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn tithe_by_receipt(&self, receipt: &str) -> Result<Option<TitheRecord>, RepositoryError> {
        let sql = format!("SELECT {TITHE_COLUMNS} FROM tithes WHERE receipt_number = $1");
        let row: Option<TitheRow> = sqlx::query_as(&sql)
            .bind(receipt)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TitheRecord::try_from).transpose()
    }

    async fn giving_plans(&self) -> Result<Vec<GivingPlan>, RepositoryError> {
        let rows: Vec<GivingPlanRow> = sqlx::query_as(
            "SELECT t.user_id, t.frequency, MAX(t.payment_date) AS last_payment \
             FROM tithes t JOIN users u ON u.id = t.user_id \
             WHERE u.is_active \
             GROUP BY t.user_id, t.frequency \
             ORDER BY t.user_id, t.frequency",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let frequency: TitheFrequency =
                    row.frequency.parse().map_err(|err| corrupt("frequency", err))?;
                Ok(GivingPlan {
                    member_id: MemberId(row.user_id),
                    frequency,
                    last_payment: row.last_payment,
                })
            })
            .collect()
    }

    async fn payments_after(
        &self,
        member: MemberId,
        frequency: TitheFrequency,
        after: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tithes WHERE user_id = $1 AND frequency = $2 AND payment_date > $3",
        )
        .bind(member.0)
        .bind(frequency.as_str())
        .bind(after)
        .fetch_one(&self.pool)
        .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn tithe_stats(&self, member: MemberId) -> Result<TitheStats, RepositoryError> {
        let row: TitheTotalsRow = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) AS total_amount, \
                    COUNT(*) AS total_payments, \
                    MAX(payment_date) AS last_payment \
             FROM tithes WHERE user_id = $1",
        )
        .bind(member.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(TitheStats {
            total_amount: row.total_amount,
            total_payments: u32::try_from(row.total_payments).unwrap_or(u32::MAX),
            last_payment_date: row.last_payment,
        })
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, RepositoryError> {
        let sql = format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row: NotificationRow = sqlx::query_as(&sql)
            .bind(notification.id.0)
            .bind(notification.member_id.0)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.is_read)
            .bind(notification.read_at)
            .bind(&notification.metadata)
            .bind(&notification.idempotency_key)
            .bind(notification.created_at)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn notifications_for(
        &self,
        member: MemberId,
        is_read: Option<bool>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 AND ($2::boolean IS NULL OR is_read = $2) \
             ORDER BY created_at DESC"
        );
        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(member.0)
            .bind(is_read)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        member: MemberId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let sql = format!(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, NOW()) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(member.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Notification::try_from).transpose()
    }

    async fn mark_all_read(&self, member: MemberId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(member.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
