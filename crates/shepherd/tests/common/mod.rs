#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use shepherd::auth::JwtKeys;
use shepherd::config::{ChurchConfig, NotificationThresholds};
use shepherd::members::{DepartmentId, Member, MemberCredentials, MemberId, MemberRepository, Role};
use shepherd::notifications::{MailError, Mailer, OutboundEmail};
use shepherd::store::MemoryStore;
use shepherd::{church_router, ChurchApi};
use tower::ServiceExt;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

#[derive(Default, Clone)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl Outbox {
    pub fn len(&self) -> usize {
        self.sent.lock().expect("outbox mutex poisoned").len()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().expect("outbox mutex poisoned").push(email);
        Ok(())
    }
}

pub struct Church {
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<Outbox>,
    pub api: ChurchApi<MemoryStore, Outbox>,
}

impl Church {
    pub fn open() -> Self {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::default());
        let api = ChurchApi::new(
            store.clone(),
            outbox.clone(),
            JwtKeys::new("integration-secret", 1),
            &ChurchConfig {
                name: "Dunamis Chapel".to_string(),
                receipt_prefix: "DCU".to_string(),
            },
            NotificationThresholds::default(),
        );
        Self { store, outbox, api }
    }

    /// Insert a member without going through registration.
    pub async fn enrol(
        &self,
        first_name: &str,
        role: Role,
        department_id: Option<DepartmentId>,
    ) -> Member {
        let now = Utc::now();
        let member = Member {
            id: MemberId::new(),
            email: format!("{}@dunamis.test", first_name.to_ascii_lowercase()),
            first_name: first_name.to_string(),
            last_name: "Member".to_string(),
            phone_number: "+2348011111111".to_string(),
            role,
            department_id,
            cell_group_id: None,
            date_of_birth: None,
            address: None,
            is_first_timer: false,
            join_date: date(2024, 6, 1),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_member(MemberCredentials {
                member,
                password_hash: "unused".to_string(),
            })
            .await
            .expect("enrol member")
    }

    pub fn token(&self, member: &Member) -> String {
        self.api.keys.issue(member).expect("issue token")
    }

    pub async fn call(
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
                .body(Body::from(body.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = church_router(self.api.clone())
            .oneshot(request)
            .await
            .expect("router response");
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
