use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use shepherd::scheduler::Job;
use shepherd::store::PgStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operational state shared by the health, readiness and metrics endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) database: Option<PgStore>,
}

impl AppState {
    /// Ready once the listener is bound and, when configured, the database answers.
    pub(crate) async fn is_ready(&self) -> bool {
        if !self.readiness.load(Ordering::Acquire) {
            return false;
        }
        match &self.database {
            Some(store) => match store.ping().await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(error = %err, "database ping failed");
                    false
                }
            },
            None => true,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_job(raw: &str) -> Result<Job, String> {
    raw.parse::<Job>().map_err(|err| err.to_string())
}
