use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reporter_api_types::{CacheStatsResponse, CommandRequest, CommandResponse};

use crate::{
    application::{
        commands::{CommandService, ReporterCommand},
        error::AppError,
    },
    cache::CacheStats,
};

use super::{
    middleware::{log_responses, set_request_context},
    not_found,
};

#[derive(Clone)]
pub struct AdminState {
    pub commands: CommandService,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(admin_health))
        .route("/cache/refresh", post(refresh_cache))
        .route("/cache/clear", post(clear_all))
        .route("/cache/clear/{player}", post(clear_player))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/reload", post(reload_config))
        .route("/command", post(run_command))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn refresh_cache(State(state): State<AdminState>) -> Result<Response, AppError> {
    let lines = state.commands.execute(&ReporterCommand::Refresh)?;
    Ok((StatusCode::ACCEPTED, Json(CommandResponse { lines })).into_response())
}

async fn clear_all(State(state): State<AdminState>) -> Result<Json<CommandResponse>, AppError> {
    let lines = state
        .commands
        .execute(&ReporterCommand::Clear { player: None })?;
    Ok(Json(CommandResponse { lines }))
}

async fn clear_player(
    State(state): State<AdminState>,
    Path(player): Path<String>,
) -> Result<Json<CommandResponse>, AppError> {
    let lines = state.commands.execute(&ReporterCommand::Clear {
        player: Some(player),
    })?;
    Ok(Json(CommandResponse { lines }))
}

async fn cache_stats(State(state): State<AdminState>) -> Json<CacheStatsResponse> {
    Json(stats_response(state.commands.coordinator().stats()))
}

async fn reload_config(State(state): State<AdminState>) -> Result<Json<CommandResponse>, AppError> {
    let lines = state.commands.execute(&ReporterCommand::Reload)?;
    Ok(Json(CommandResponse { lines }))
}

/// Free-form operator command, e.g. `{"args": ["clear", "Klein"]}`.
async fn run_command(
    State(state): State<AdminState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let command = ReporterCommand::parse(&request.args);
    let lines = state.commands.execute(&command)?;
    Ok(Json(CommandResponse { lines }))
}

fn stats_response(stats: CacheStats) -> CacheStatsResponse {
    CacheStatsResponse {
        player_entries: stats.player_entries,
        everyone_entries: stats.everyone_entries,
        snapshot_cached: stats.snapshot_cached,
        refresh_interval_minutes: stats.refresh_interval_minutes,
        scheduler_running: stats.scheduler_running,
    }
}
