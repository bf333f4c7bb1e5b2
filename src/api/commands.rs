use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use office_types::{Command, NewCommand, StatusUpdate};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, ApiResponse, ApiResult, AppState};
use crate::commands::resolve_new_command;
use crate::store::CommandFilter;

pub(super) async fn create_command(
    State(state): State<AppState>,
    Json(request): Json<NewCommand>,
) -> Result<(StatusCode, Json<ApiResponse<Command>>), ApiError> {
    let draft = resolve_new_command(request)?;
    let command = state.store.insert(draft).await?;
    info!(id = %command.id, kind = command.action.kind(), "Command created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(command))))
}

pub(super) async fn list_commands(
    State(state): State<AppState>,
    Query(filter): Query<CommandFilter>,
) -> ApiResult<Vec<Command>> {
    let commands = state.store.list(&filter).await?;
    Ok(Json(ApiResponse::ok(commands)))
}

pub(super) async fn get_command(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Command> {
    state
        .store
        .get(id)
        .await?
        .map(|c| Json(ApiResponse::ok(c)))
        .ok_or_else(|| not_found(id))
}

pub(super) async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Command> {
    let command = state
        .store
        .update_status(id, update.status, update.error.as_deref())
        .await?
        .ok_or_else(|| not_found(id))?;
    info!(id = %id, status = %command.status, "Command status updated");
    Ok(Json(ApiResponse::ok(command)))
}

pub(super) async fn delete_command(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Uuid> {
    if state.store.delete(id).await? {
        info!(id = %id, "Command deleted");
        Ok(Json(ApiResponse::ok(id)))
    } else {
        Err(not_found(id))
    }
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Command {} not found", id))
}
