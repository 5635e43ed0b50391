//! Fixtures shared by the per-module test suites.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tower::ServiceExt;

use crate::api::{church_router, ChurchApi};
use crate::auth::JwtKeys;
use crate::config::{ChurchConfig, NotificationThresholds};
use crate::members::{Member, MemberCredentials, MemberId, MemberRepository, Role};
use crate::notifications::{MailError, Mailer, OutboundEmail};
use crate::store::MemoryStore;

pub(crate) const TEST_SECRET: &str = "test-secret";

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(crate) fn church() -> ChurchConfig {
    ChurchConfig {
        name: "Grace Chapel".to_string(),
        receipt_prefix: "GRC".to_string(),
    }
}

pub(crate) fn member(first_name: &str, last_name: &str) -> Member {
    let now = Utc::now();
    Member {
        id: MemberId::new(),
        email: format!(
            "{}.{}@grace.test",
            first_name.to_ascii_lowercase(),
            last_name.to_ascii_lowercase()
        ),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone_number: "+2348000000000".to_string(),
        role: Role::Member,
        department_id: None,
        cell_group_id: None,
        date_of_birth: None,
        address: None,
        is_first_timer: false,
        join_date: date(2024, 1, 1),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Insert a member directly; the password hash is a placeholder.
pub(crate) async fn seed(store: &MemoryStore, member: Member) -> Member {
    store
        .insert_member(MemberCredentials {
            member,
            password_hash: "not-a-real-hash".to_string(),
        })
        .await
        .expect("seed member")
}

pub(crate) async fn seed_with_role(store: &MemoryStore, first_name: &str, role: Role) -> Member {
    let mut record = member(first_name, "Staff");
    record.role = role;
    seed(store, record).await
}

#[derive(Default, Clone)]
pub(crate) struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl RecordingMailer {
    pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().expect("mailer mutex poisoned").push(email);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutboundEmail) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".to_string()))
    }
}

pub(crate) struct Harness {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) mailer: Arc<RecordingMailer>,
    pub(crate) api: ChurchApi<MemoryStore, RecordingMailer>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let api = ChurchApi::new(
            store.clone(),
            mailer.clone(),
            JwtKeys::new(TEST_SECRET, 1),
            &church(),
            NotificationThresholds::default(),
        );
        Self { store, mailer, api }
    }

    pub(crate) fn router(&self) -> Router {
        church_router(self.api.clone())
    }

    pub(crate) fn token(&self, member: &Member) -> String {
        self.api.keys.issue(member).expect("issue token")
    }

    /// Send one request through the full router and decode the JSON body.
    pub(crate) async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self.router().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }
}
