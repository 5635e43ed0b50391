use axum::{
    extract::State,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{Notification, NotificationId};
use super::mailer::Mailer;
use crate::api::{ApiPath, ApiQuery, ChurchApi};
use crate::auth::AuthMember;
use crate::error::ApiError;
use crate::store::Store;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub is_read: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// The caller's notification inbox.
pub fn notification_router<S, M>() -> Router<ChurchApi<S, M>>
where
    S: Store,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/notifications", get(inbox_handler::<S, M>))
        .route(
            "/api/notifications/read-all",
            patch(mark_all_read_handler::<S, M>),
        )
        .route(
            "/api/notifications/:notification_id/read",
            patch(mark_read_handler::<S, M>),
        )
}

pub(crate) async fn inbox_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiQuery(query): ApiQuery<InboxQuery>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    Ok(Json(api.notifications.inbox(caller.id, query.is_read).await?))
}

pub(crate) async fn mark_read_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(notification_id): ApiPath<Uuid>,
) -> Result<Json<Notification>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let notification = api
        .notifications
        .mark_read(NotificationId(notification_id), caller.id)
        .await?;
    Ok(Json(notification))
}

pub(crate) async fn mark_all_read_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
) -> Result<Json<MarkAllReadResponse>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let updated = api.notifications.mark_all_read(caller.id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
