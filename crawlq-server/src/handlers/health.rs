use axum::response::Json;
use crawlq_core::api_types::HealthResponse;

/// Liveness only; the backlog store is not consulted.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
