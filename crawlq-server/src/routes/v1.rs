use axum::{
    Router,
    routing::{get, post},
};
use crawlq_core::api::routes::v1;

use crate::{AppState, handlers::queue};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(v1::queue::REQUEST_WORK, post(queue::request_work_handler))
        .route(v1::queue::HEARTBEAT, post(queue::heartbeat_handler))
        .route(v1::queue::REPORT_FAILURE, post(queue::report_failure_handler))
        .route(v1::queue::RELEASE, post(queue::release_handler))
        .route(v1::queue::STATS, get(queue::stats_handler))
}
