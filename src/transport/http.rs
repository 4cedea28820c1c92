//! HTTP facade
//!
//! `GET /` answers with a short up-message and `GET /health` with
//! `{"status":"UP"}` for external health checks.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::utils::RelayError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

async fn index() -> &'static str {
    "topic-relay is up"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

pub async fn serve(listener: TcpListener) -> Result<(), RelayError> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP facade listening on http://{addr}");
    }
    axum::serve(listener, router())
        .await
        .map_err(RelayError::Http)
}
