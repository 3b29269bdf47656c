use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, ApplicationStatus, JobId};
use super::store::ApplicationFilter;
use super::supervisor::{Supervisor, SupervisorError};
use super::tracker::{ApplicationTracker, StatisticsWindow, TrackerError};
use crate::pipeline::store::JobQuery;

/// Shared handle the HTTP surface works through.
#[derive(Clone)]
pub struct PipelineHandle {
    pub supervisor: Arc<Supervisor>,
    pub tracker: Arc<ApplicationTracker>,
}

/// Router builder exposing the pipeline trigger, status, and application
/// tracking endpoints.
pub fn pipeline_router(handle: PipelineHandle) -> Router {
    Router::new()
        .route("/api/v1/pipeline/trigger", post(trigger_handler))
        .route("/api/v1/pipeline/dispatch", post(dispatch_handler))
        .route("/api/v1/pipeline/stop", post(stop_handler))
        .route("/api/v1/pipeline/status", get(status_handler))
        .route("/api/v1/pipeline/health", get(health_handler))
        .route("/api/v1/applications", get(list_handler))
        .route("/api/v1/applications/statistics", get(statistics_handler))
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler).delete(delete_handler),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(update_status_handler),
        )
        .with_state(Arc::new(handle))
}

async fn trigger_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Json(query): Json<JobQuery>,
) -> Response {
    match handle.supervisor.spawn_cycle(query) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "cycle started" })),
        )
            .into_response(),
        Err(err @ SupervisorError::CycleBusy { .. }) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct DispatchRequest {
    job_ids: Vec<String>,
}

async fn dispatch_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Json(request): Json<DispatchRequest>,
) -> Response {
    let job_ids = request.job_ids.into_iter().map(JobId).collect();
    match handle.supervisor.dispatch_jobs(job_ids).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err @ SupervisorError::CycleBusy { .. }) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn stop_handler(State(handle): State<Arc<PipelineHandle>>) -> Response {
    handle.supervisor.disable_auto();
    handle.supervisor.request_stop();
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "stop requested" })),
    )
        .into_response()
}

async fn status_handler(State(handle): State<Arc<PipelineHandle>>) -> Response {
    (StatusCode::OK, Json(handle.supervisor.status())).into_response()
}

async fn health_handler(State(handle): State<Arc<PipelineHandle>>) -> Response {
    (StatusCode::OK, Json(handle.supervisor.health())).into_response()
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<ApplicationStatus>,
    company: Option<String>,
}

async fn list_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Query(params): Query<ListParams>,
) -> Response {
    let filter = ApplicationFilter {
        status: params.status,
        company: params.company,
        ..ApplicationFilter::default()
    };
    match handle.tracker.list(&filter) {
        Ok(applications) => {
            let views: Vec<_> = applications
                .iter()
                .map(|application| application.status_view())
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => tracker_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct StatisticsParams {
    #[serde(default = "default_window_days")]
    days: i64,
}

fn default_window_days() -> i64 {
    30
}

async fn statistics_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Query(params): Query<StatisticsParams>,
) -> Response {
    let window = StatisticsWindow::last_days(params.days.max(0));
    match handle.tracker.statistics(window) {
        Ok(statistics) => (StatusCode::OK, Json(statistics)).into_response(),
        Err(err) => tracker_error_response(err),
    }
}

async fn get_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Path(application_id): Path<String>,
) -> Response {
    match handle.tracker.get(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => tracker_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: ApplicationStatus,
    #[serde(default)]
    notes: Option<String>,
}

async fn update_status_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Path(application_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Response {
    match handle.tracker.update_status(
        &ApplicationId(application_id),
        request.status,
        request.notes,
    ) {
        Ok(application) => (StatusCode::OK, Json(application.status_view())).into_response(),
        Err(err) => tracker_error_response(err),
    }
}

async fn delete_handler(
    State(handle): State<Arc<PipelineHandle>>,
    Path(application_id): Path<String>,
) -> Response {
    match handle.tracker.remove(&ApplicationId(application_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => tracker_error_response(err),
    }
}

fn tracker_error_response(err: TrackerError) -> Response {
    let status = match &err {
        TrackerError::InvalidTransition { .. } => StatusCode::CONFLICT,
        TrackerError::NotFound => StatusCode::NOT_FOUND,
        TrackerError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
