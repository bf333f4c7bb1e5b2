use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{attachment, ApiError, ApiResponse, ApiResult, AppState};
use crate::disk::{normalize_path, DirectoryListing};

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    #[serde(default = "root")]
    path: String,
    limit: Option<u32>,
    offset: Option<u32>,
}

fn root() -> String {
    "disk:/".to_string()
}

#[derive(Debug, Deserialize)]
pub(super) struct PathQuery {
    path: String,
    #[serde(default)]
    overwrite: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct UploadResult {
    path: String,
    size: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct FolderResult {
    path: String,
    /// `false` when the folder already existed
    created: bool,
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<DirectoryListing> {
    let listing = state
        .disk()?
        .list(&query.path, query.limit, query.offset)
        .await?;
    Ok(Json(ApiResponse::ok(listing)))
}

pub(super) async fn download(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let bytes = state.disk()?.download(&query.path).await?;
    let file_name = normalize_path(&query.path)
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("download")
        .to_string();
    Ok(attachment(bytes, "application/octet-stream", &file_name))
}

pub(super) async fn upload(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    body: Bytes,
) -> ApiResult<UploadResult> {
    let disk = state.disk()?;
    let size = body.len();
    disk.upload(&query.path, body.to_vec(), query.overwrite.unwrap_or(true))
        .await?;
    Ok(Json(ApiResponse::ok(UploadResult {
        path: normalize_path(&query.path),
        size,
    })))
}

pub(super) async fn create_folder(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<FolderResult> {
    let created = state.disk()?.create_folder(&query.path).await?;
    Ok(Json(ApiResponse::ok(FolderResult {
        path: normalize_path(&query.path),
        created,
    })))
}
