use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use super::jobs::{Job, JobReport};
use crate::api::{ApiPath, ApiQuery, ChurchApi};
use crate::auth::{AuthMember, Permission};
use crate::error::ApiError;
use crate::notifications::Mailer;
use crate::store::Store;

#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    /// Run as if it were this date; defaults to the server's local date.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

pub fn job_router<S, M>() -> Router<ChurchApi<S, M>>
where
    S: Store,
    M: Mailer + 'static,
{
    Router::new().route("/api/admin/jobs/:job", post(trigger_handler::<S, M>))
}

pub(crate) async fn trigger_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(job): ApiPath<String>,
    ApiQuery(query): ApiQuery<TriggerQuery>,
) -> Result<Json<JobReport>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::RunJobs)?;
    let job: Job = job
        .parse()
        .map_err(|err: super::jobs::UnknownJob| ApiError::Validation(err.to_string()))?;
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());

    tracing::info!(%job, triggered_by = %caller.id, "manual job trigger");
    Ok(Json(api.jobs.run(job, today).await?))
}
