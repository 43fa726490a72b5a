//! HTTP front end for the crawlq coordinator.
//!
//! The binary loads [`infra::config::Config`], connects the Postgres backlog
//! store, and serves the router built by [`create_app`].

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{Router, routing::get};
use crawlq_core::api::routes::HEALTH;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(HEALTH, get(handlers::health::health_handler))
        .merge(routes::create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
