use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use crawlq_core::api_types::{
    ReportFailureRequest, RequestWorkRequest, RequestWorkResponse,
    StatsResponse, StatusResponse, WorkerRequest,
};

use crate::infra::{app_state::AppState, errors::AppResult};

/// Lease domains to the caller and hand out a batch from them.
///
/// Body rejections (missing fields, wrong types, bad JSON) surface as 400.
pub async fn request_work_handler(
    State(state): State<AppState>,
    payload: Result<Json<RequestWorkRequest>, JsonRejection>,
) -> AppResult<Json<RequestWorkResponse>> {
    let Json(request) = payload?;
    let work = request.validate()?;
    let batch = state.coordinator().request_work(work).await?;
    Ok(Json(batch.into()))
}

/// Unknown workers get the same success response; they are simply not
/// registered.
pub async fn heartbeat_handler(
    State(state): State<AppState>,
    payload: Result<Json<WorkerRequest>, JsonRejection>,
) -> AppResult<Json<StatusResponse>> {
    let Json(request) = payload?;
    let worker_id = request.validate()?;
    state.coordinator().heartbeat(&worker_id).await;
    Ok(Json(StatusResponse::success()))
}

pub async fn report_failure_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReportFailureRequest>, JsonRejection>,
) -> AppResult<Json<StatusResponse>> {
    let Json(request) = payload?;
    let (worker_id, domain) = request.validate()?;
    state.coordinator().report_failure(&worker_id, &domain).await;
    Ok(Json(StatusResponse::success()))
}

pub async fn release_handler(
    State(state): State<AppState>,
    payload: Result<Json<WorkerRequest>, JsonRejection>,
) -> AppResult<Json<StatusResponse>> {
    let Json(request) = payload?;
    let worker_id = request.validate()?;
    state.coordinator().release(&worker_id).await;
    Ok(Json(StatusResponse::success()))
}

pub async fn stats_handler(
    State(state): State<AppState>,
) -> AppResult<Json<StatsResponse>> {
    let stats = state.coordinator().stats().await?;
    Ok(Json(stats.into()))
}
