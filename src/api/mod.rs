//! REST API
//!
//! Every JSON endpoint answers with the [`ApiResponse`] envelope; document
//! and disk downloads answer with raw bytes.

mod commands;
mod disk;
mod documents;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::disk::YandexDiskClient;
use crate::error::{DiskError, DocxError, GenerateError, OfficeError, ParseError};
use crate::generator::DocumentGenerator;
use crate::learning::LearningLibrary;
use crate::store::CommandStore;

/// Uploaded documents and disk files
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CommandStore>,
    pub generator: Arc<DocumentGenerator>,
    pub learning: Arc<LearningLibrary>,
    /// `None` when no Yandex Disk token is configured
    pub disk: Option<Arc<YandexDiskClient>>,
}

impl AppState {
    fn disk(&self) -> Result<&YandexDiskClient, ApiError> {
        self.disk
            .as_deref()
            .ok_or_else(|| DiskError::NotConfigured.into())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Error response: status code plus an `ApiResponse` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Worker task failed: {}", e),
        )
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<DocxError> for ApiError {
    fn from(e: DocxError) -> Self {
        let status = match e {
            DocxError::PartTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<GenerateError> for ApiError {
    fn from(e: GenerateError) -> Self {
        let status = match e {
            GenerateError::MissingField { .. } | GenerateError::InvalidDate(_) => {
                StatusCode::BAD_REQUEST
            }
            GenerateError::Template(_) | GenerateError::Docx(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<DiskError> for ApiError {
    fn from(e: DiskError) -> Self {
        let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
        Self::new(status, e.to_string())
    }
}

impl From<OfficeError> for ApiError {
    fn from(e: OfficeError) -> Self {
        match e {
            OfficeError::Parse(e) => e.into(),
            OfficeError::Docx(e) => e.into(),
            OfficeError::Generate(e) => e.into(),
            OfficeError::Disk(e) => e.into(),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

/// Binary download with a `Content-Disposition` file name
pub(crate) fn attachment(bytes: Vec<u8>, content_type: &'static str, file_name: &str) -> Response {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(file_name.as_bytes()).collect();
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        encoded.replace('+', "%20")
    );

    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    store: &'static str,
    disk_configured: bool,
    learning_examples: usize,
    version: &'static str,
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<ApiResponse<Health>> {
    Json(ApiResponse::ok(Health {
        status: "ok",
        store: state.store.backend_name(),
        disk_configured: state.disk.is_some(),
        learning_examples: state.learning.len(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route(
            "/api/commands",
            post(commands::create_command).get(commands::list_commands),
        )
        .route(
            "/api/commands/:id",
            get(commands::get_command).delete(commands::delete_command),
        )
        .route("/api/commands/:id/status", patch(commands::update_status))
        .route("/api/templates", get(documents::list_templates))
        .route("/api/documents/generate", post(documents::generate))
        .route("/api/documents/analyze", post(documents::analyze))
        .route(
            "/api/learning/examples",
            get(documents::list_examples).post(documents::add_example),
        )
        .route("/api/disk/list", get(disk::list))
        .route("/api/disk/download", get(disk::download))
        .route("/api/disk/upload", post(disk::upload))
        .route("/api/disk/folders", post(disk::create_folder))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
