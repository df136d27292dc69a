//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::ExtractorBackend;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub backend: ExtractorBackend,
    pub backend_available: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_available = state.extraction().is_available().await;

    Json(HealthResponse {
        status: if backend_available { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        service: "receipt-ocr-server",
        backend: state.extraction().backend(),
        backend_available,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
