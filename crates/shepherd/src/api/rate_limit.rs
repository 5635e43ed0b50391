//! Fixed-window request budget per client address for the `/api` router.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

struct ClientWindow {
    count: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    /// client address -> current window
    clients: Arc<Mutex<HashMap<String, ClientWindow>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            max_requests: config.max_requests,
            window: Duration::from_millis(config.window_ms),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request from `client`; `false` once the window's budget is spent.
    pub async fn check(&self, client: &str) -> bool {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        let entry = clients
            .entry(client.to_owned())
            .or_insert_with(|| ClientWindow {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);
        entry.count <= self.max_requests
    }

    /// Drop clients whose window has expired.
    pub async fn cleanup(&self) {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();
        clients.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
    }
}

/// Wrap `router` so every request is counted against its client's window.
pub fn with_rate_limit(router: Router, limiter: RateLimiter) -> Router {
    router.layer(middleware::from_fn_with_state(limiter, rate_limit))
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let client = client_address(&request);
    if !limiter.check(&client).await {
        tracing::warn!(%client, "rate limit exceeded");
        return Err(too_many_requests());
    }
    Ok(next.run(request).await)
}

/// First `X-Forwarded-For` entry when behind a proxy, then the peer address.
fn client_address(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({"error": "too many requests, please try again later"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method};
    use tower::ServiceExt;

    use crate::members::Role;
    use crate::testing::{seed_with_role, Harness};

    fn limited(harness: &Harness, max_requests: u32) -> Router {
        with_rate_limit(
            harness.router(),
            RateLimiter::new(&RateLimitConfig {
                max_requests,
                window_ms: 60_000,
            }),
        )
    }

    async fn me(router: &Router, token: &str, client: &str) -> StatusCode {
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri("/api/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .expect("build request");
        router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
            .status()
    }

    #[tokio::test]
    async fn requests_past_the_budget_are_refused() {
        let harness = Harness::new();
        let member = seed_with_role(&harness.store, "Ruth", Role::Member).await;
        let token = harness.token(&member);
        let router = limited(&harness, 2);

        assert_eq!(me(&router, &token, "10.0.0.1").await, StatusCode::OK);
        assert_eq!(me(&router, &token, "10.0.0.1").await, StatusCode::OK);
        assert_eq!(
            me(&router, &token, "10.0.0.1").await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(me(&router, &token, "10.0.0.2, 172.16.0.1").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn refusal_carries_a_json_error() {
        let harness = Harness::new();
        let router = limited(&harness, 0);
        let request = axum::http::Request::builder()
            .uri("/api/auth/me")
            .body(Body::empty())
            .expect("build request");

        let response = router.oneshot(request).await.expect("router response");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn budget_resets_when_the_window_expires() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 1,
            window_ms: 20,
        });
        assert!(limiter.check("10.0.0.9").await);
        assert!(!limiter.check("10.0.0.9").await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.cleanup().await;
        assert!(limiter.clients.lock().await.is_empty());
        assert!(limiter.check("10.0.0.9").await);
    }
}
