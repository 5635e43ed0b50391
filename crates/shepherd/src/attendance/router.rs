use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::domain::{AttendanceRecord, AttendanceStats, AttendanceStatus, CheckIn};
use crate::api::{ApiJson, ApiPath, ApiQuery, ChurchApi};
use crate::auth::{AuthMember, Permission};
use crate::error::ApiError;
use crate::members::{Member, MemberId};
use crate::notifications::Mailer;
use crate::store::{DateRange, Store};

/// Check-in payload. Omitting `member_id` checks in the caller.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub member_id: Option<MemberId>,
    #[serde(default)]
    pub service_date: Option<NaiveDate>,
    #[serde(default)]
    pub check_in_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub is_first_timer: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn attendance_router<S, M>() -> Router<ChurchApi<S, M>>
where
    S: Store,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/attendance", post(record_handler::<S, M>))
        .route("/api/attendance/me", get(my_history_handler::<S, M>))
        .route("/api/attendance/me/stats", get(my_stats_handler::<S, M>))
        .route("/api/attendance/date/:date", get(by_date_handler::<S, M>))
        .route("/api/attendance/absent/:date", get(absent_handler::<S, M>))
        .route(
            "/api/attendance/members/:member_id",
            get(member_history_handler::<S, M>),
        )
}

pub(crate) async fn record_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiJson(request): ApiJson<CheckInRequest>,
) -> Result<(StatusCode, Json<AttendanceRecord>), ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let member_id = request.member_id.unwrap_or(caller.id);
    caller.require_self_or(member_id, Permission::RecordAttendanceForOthers)?;

    let check_in = CheckIn {
        member_id,
        service_date: request
            .service_date
            .unwrap_or_else(|| Local::now().date_naive()),
        check_in_time: request.check_in_time.unwrap_or_else(Utc::now),
        status: request.status.unwrap_or_default(),
        is_first_timer: request.is_first_timer,
        notes: request.notes,
    };

    let record = api.attendance.record(check_in).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn my_history_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    Ok(Json(api.attendance.history(caller.id, range).await?))
}

pub(crate) async fn my_stats_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
) -> Result<Json<AttendanceStats>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let today = Local::now().date_naive();
    Ok(Json(api.attendance.stats(caller.id, today).await?))
}

pub(crate) async fn by_date_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(date): ApiPath<NaiveDate>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ViewServiceAttendance)?;
    Ok(Json(api.attendance.on_date(date).await?))
}

pub(crate) async fn absent_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(date): ApiPath<NaiveDate>,
) -> Result<Json<Vec<Member>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ViewServiceAttendance)?;
    Ok(Json(api.attendance.absent_on(date).await?))
}

pub(crate) async fn member_history_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(member_id): ApiPath<Uuid>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let member_id = MemberId(member_id);
    caller.require_self_or(member_id, Permission::ViewMemberRecords)?;
    Ok(Json(api.attendance.history(member_id, range).await?))
}
