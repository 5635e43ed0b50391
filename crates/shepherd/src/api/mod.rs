//! HTTP surface: shared handler state and the composed `/api` router.

mod extract;
mod rate_limit;

pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use rate_limit::{rate_limit, with_rate_limit, RateLimiter};

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::attendance::{AbsencePolicy, AttendanceService};
use crate::auth::JwtKeys;
use crate::config::{ChurchConfig, CorsConfig, NotificationThresholds};
use crate::members::{MemberRepository, MemberService};
use crate::notifications::{Mailer, NotificationDispatcher};
use crate::scheduler::JobRunner;
use crate::store::Store;
use crate::tithes::{ReceiptGenerator, ReminderPolicy, TitheService};

/// Services shared by every handler.
pub struct ChurchApi<S, M> {
    pub members: Arc<MemberService<S>>,
    pub attendance: Arc<AttendanceService<S, M>>,
    pub tithes: Arc<TitheService<S, M>>,
    pub notifications: Arc<NotificationDispatcher<S, M>>,
    pub jobs: Arc<JobRunner<S, M>>,
    pub keys: Arc<JwtKeys>,
    /// Read side used by the auth extractor to re-check the bearer's account.
    pub directory: Arc<dyn MemberRepository>,
}

impl<S, M> ChurchApi<S, M>
where
    S: Store,
    M: Mailer + 'static,
{
    /// Wire every service over one store and one mail transport.
    pub fn new(
        store: Arc<S>,
        mailer: Arc<M>,
        keys: JwtKeys,
        church: &ChurchConfig,
        thresholds: NotificationThresholds,
    ) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            mailer,
            church.name.clone(),
        ));
        let attendance = Arc::new(AttendanceService::new(
            store.clone(),
            dispatcher.clone(),
            AbsencePolicy::from_thresholds(&thresholds),
            church.name.clone(),
        ));
        let tithes = Arc::new(TitheService::new(
            store.clone(),
            dispatcher.clone(),
            ReceiptGenerator::new(church.receipt_prefix.clone()),
            ReminderPolicy::from_thresholds(&thresholds),
        ));
        let jobs = Arc::new(JobRunner::new(
            store.clone(),
            attendance.clone(),
            tithes.clone(),
            dispatcher.clone(),
            church.name.clone(),
        ));

        let directory: Arc<dyn MemberRepository> = store.clone();
        Self {
            members: Arc::new(MemberService::new(store)),
            attendance,
            tithes,
            notifications: dispatcher,
            jobs,
            keys: Arc::new(keys),
            directory,
        }
    }
}

impl<S, M> Clone for ChurchApi<S, M> {
    fn clone(&self) -> Self {
        Self {
            members: self.members.clone(),
            attendance: self.attendance.clone(),
            tithes: self.tithes.clone(),
            notifications: self.notifications.clone(),
            jobs: self.jobs.clone(),
            keys: self.keys.clone(),
            directory: self.directory.clone(),
        }
    }
}

impl<S, M> FromRef<ChurchApi<S, M>> for Arc<JwtKeys> {
    fn from_ref(api: &ChurchApi<S, M>) -> Self {
        api.keys.clone()
    }
}

impl<S, M> FromRef<ChurchApi<S, M>> for Arc<dyn MemberRepository> {
    fn from_ref(api: &ChurchApi<S, M>) -> Self {
        api.directory.clone()
    }
}

/// Router builder exposing every `/api` endpoint.
pub fn church_router<S, M>(api: ChurchApi<S, M>) -> Router
where
    S: Store,
    M: Mailer + 'static,
{
    Router::new()
        .merge(crate::members::member_router::<S, M>())
        .merge(crate::attendance::attendance_router::<S, M>())
        .merge(crate::tithes::tithe_router::<S, M>())
        .merge(crate::notifications::notification_router::<S, M>())
        .merge(crate::scheduler::job_router::<S, M>())
        .with_state(api)
}

/// CORS policy for the browser client. `*` allows any origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = config
            .origin
            .split(',')
            .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
