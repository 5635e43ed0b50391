use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::domain::{NewTithe, TitheFrequency, TitheRecord, TitheStats};
use crate::api::{ApiJson, ApiPath, ApiQuery, ChurchApi};
use crate::auth::{AuthMember, Permission};
use crate::error::ApiError;
use crate::members::MemberId;
use crate::notifications::Mailer;
use crate::store::{DateRange, Store};

/// Payment payload. Omitting `member_id` records the caller's own tithe.
#[derive(Debug, Deserialize)]
pub struct TitheRequest {
    #[serde(default)]
    pub member_id: Option<MemberId>,
    pub amount: Decimal,
    pub frequency: TitheFrequency,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn tithe_router<S, M>() -> Router<ChurchApi<S, M>>
where
    S: Store,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/tithes", post(record_handler::<S, M>))
        .route("/api/tithes/me", get(my_history_handler::<S, M>))
        .route("/api/tithes/me/stats", get(my_stats_handler::<S, M>))
        .route("/api/tithes/receipt/:receipt", get(receipt_handler::<S, M>))
        .route(
            "/api/tithes/members/:member_id",
            get(member_history_handler::<S, M>),
        )
}

pub(crate) async fn record_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiJson(request): ApiJson<TitheRequest>,
) -> Result<(StatusCode, Json<TitheRecord>), ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let member_id = request.member_id.unwrap_or(caller.id);
    caller.require_self_or(member_id, Permission::RecordTitheForOthers)?;

    let record = api
        .tithes
        .record(NewTithe {
            member_id,
            amount: request.amount,
            frequency: request.frequency,
            payment_date: request
                .payment_date
                .unwrap_or_else(|| Local::now().date_naive()),
            payment_method: request.payment_method,
            notes: request.notes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn my_history_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<Vec<TitheRecord>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    Ok(Json(api.tithes.history(caller.id, range).await?))
}

pub(crate) async fn my_stats_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
) -> Result<Json<TitheStats>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    Ok(Json(api.tithes.stats(caller.id).await?))
}

pub(crate) async fn receipt_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(receipt): ApiPath<String>,
) -> Result<Json<TitheRecord>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let record = api
        .tithes
        .by_receipt(&receipt)
        .await?
        .ok_or_else(|| ApiError::NotFound("tithe record not found".to_string()))?;
    caller.require_self_or(record.member_id, Permission::ViewMemberRecords)?;
    Ok(Json(record))
}

pub(crate) async fn member_history_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(member_id): ApiPath<Uuid>,
    ApiQuery(range): ApiQuery<DateRange>,
) -> Result<Json<Vec<TitheRecord>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let member_id = MemberId(member_id);
    caller.require_self_or(member_id, Permission::ViewMemberRecords)?;
    Ok(Json(api.tithes.history(member_id, range).await?))
}
