use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use reporter_api_types::{ArtifactResponse, BeyonderDataResponse, BeyonderLogsResponse};
use tracing::info;

use crate::{
    application::{error::AppError, reports::ReportService},
    cache::CacheCoordinator,
    config::EndpointSettings,
};

use super::{
    middleware::{log_responses, set_request_context},
    not_found,
};

#[derive(Clone)]
pub struct HttpState {
    pub coordinator: CacheCoordinator,
    pub reports: Arc<ReportService>,
}

/// Public JSON routes; each one is registered only when its toggle is on.
pub fn build_router(state: HttpState, endpoints: &EndpointSettings) -> Router {
    let mut router = Router::new();

    if endpoints.player_pathway {
        router = router.route("/pathway/single/{player}", get(player_pathway));
        info!(target = "reporter::http", route = "/pathway/single/{player}", "registered");
    }
    if endpoints.everyone_pathway {
        router = router.route("/pathway/everyone", get(everyone_pathway));
        info!(target = "reporter::http", route = "/pathway/everyone", "registered");
    }
    if endpoints.beyonder_data {
        router = router.route("/beyonder/{player}", get(beyonder_data));
        info!(target = "reporter::http", route = "/beyonder/{player}", "registered");
    }
    if endpoints.beyonder_logs {
        router = router.route("/beyonder/logs/{player}/{amount}", get(beyonder_logs));
        info!(
            target = "reporter::http",
            route = "/beyonder/logs/{player}/{amount}",
            "registered"
        );
    }
    if endpoints.artifact {
        router = router.route("/artifact/{id}", get(artifact));
        info!(target = "reporter::http", route = "/artifact/{id}", "registered");
    }

    router
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn player_pathway(
    State(state): State<HttpState>,
    Path(player): Path<String>,
) -> Result<Response, AppError> {
    let record = state.coordinator.get_entity(&player).await?;
    Ok(Json(record).into_response())
}

async fn everyone_pathway(State(state): State<HttpState>) -> Result<Response, AppError> {
    let snapshot = state.coordinator.get_snapshot().await?;
    Ok(Json(snapshot).into_response())
}

async fn beyonder_data(
    State(state): State<HttpState>,
    Path(player): Path<String>,
) -> Json<BeyonderDataResponse> {
    Json(state.reports.beyonder_data(&player).await)
}

async fn beyonder_logs(
    State(state): State<HttpState>,
    Path((player, amount)): Path<(String, String)>,
) -> Json<BeyonderLogsResponse> {
    Json(state.reports.beyonder_logs(&player, &amount).await)
}

async fn artifact(
    State(state): State<HttpState>,
    Path(artifact_id): Path<String>,
) -> Json<ArtifactResponse> {
    Json(state.reports.artifact(&artifact_id).await)
}
