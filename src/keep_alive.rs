//! Keep-alive HTTP server and self-ping task.
//!
//! Hosting platforms shut idle services down; this serves three read-only
//! routes and periodically requests the first of them so the process looks
//! busy. Entirely best-effort and independent of the bot's event loop.

use crate::config::SELF_PING_INTERVAL_SECS;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Process start time, for the uptime field.
#[derive(Clone, Copy)]
struct StartedAt(Instant);

async fn home() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "message": "YouTube Downloader Bot is running!",
        "timestamp": chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
    }))
}

async fn health(State(started): State<StartedAt>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime": started.0.elapsed().as_secs_f64(),
        "service": "YouTube Downloader Bot",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ping() -> &'static str {
    "pong"
}

fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/ping", get(ping))
        .with_state(StartedAt(Instant::now()))
}

/// Spawn the keep-alive server on `port` plus the periodic self-ping
/// against `ping_url`. Failures are logged, never fatal.
pub fn spawn(port: u16, ping_url: String) {
    tokio::spawn(async move {
        let addr = format!("0.0.0.0:{port}");
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Keep-alive server failed to bind {addr}: {e}");
                return;
            }
        };
        info!("Keep-alive server listening on {addr}");
        if let Err(e) = axum::serve(listener, router()).await {
            error!("Keep-alive server error: {e}");
        }
    });

    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut interval =
            tokio::time::interval(Duration::from_secs(SELF_PING_INTERVAL_SECS));
        // First tick fires immediately; skip it so the server can come up
        interval.tick().await;
        loop {
            interval.tick().await;
            match client
                .get(&ping_url)
                .timeout(Duration::from_secs(10))
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    info!("Self-ping successful: {}", resp.status());
                }
                Ok(resp) => warn!("Self-ping returned: {}", resp.status()),
                Err(e) => error!("Self-ping failed: {e}"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn routes_answer() -> anyhow::Result<()> {
        use tower::util::ServiceExt;

        let app = router();
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/ping")
                    .body(axum::body::Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        Ok(())
    }
}
