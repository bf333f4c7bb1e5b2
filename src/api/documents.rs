use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use office_types::{DocumentParams, TemplateType};
use serde::{Deserialize, Serialize};

use super::{attachment, ApiError, ApiResponse, ApiResult, AppState};
use crate::docx::{analyze_docx, DocumentStructure};
use crate::generator::{GeneratedDocument, LetterStyle};
use crate::learning::StructureProfile;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Serialize)]
pub(super) struct TemplateInfo {
    name: &'static str,
    title: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
pub(super) struct TemplateCatalog {
    templates: Vec<TemplateInfo>,
    letter_styles: Vec<LetterStyle>,
}

pub(super) async fn list_templates() -> Json<ApiResponse<TemplateCatalog>> {
    let templates = TemplateType::all()
        .iter()
        .map(|t| TemplateInfo {
            name: t.name(),
            title: t.title_ru(),
            description: t.description(),
        })
        .collect();
    Json(ApiResponse::ok(TemplateCatalog {
        templates,
        letter_styles: LetterStyle::all().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct GenerateRequest {
    template_type: TemplateType,
    #[serde(default)]
    params: DocumentParams,
    /// Follow the latest learning example of this type
    #[serde(default = "default_true")]
    use_learning: bool,
    /// Answer with JSON (summary + base64 content) instead of the file
    #[serde(default)]
    inline: bool,
}

#[derive(Serialize)]
pub(super) struct InlineDocument {
    #[serde(flatten)]
    document: GeneratedDocument,
    content_base64: String,
}

fn default_true() -> bool {
    true
}

pub(super) async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    let profile = if request.use_learning {
        state.learning.profile_for(request.template_type)
    } else {
        None
    };
    let generated =
        state
            .generator
            .generate(request.template_type, &request.params, profile.as_ref())?;

    if request.inline {
        let content_base64 = BASE64.encode(&generated.bytes);
        let body = ApiResponse::ok(InlineDocument {
            document: generated,
            content_base64,
        });
        return Ok(Json(body).into_response());
    }

    let mut response = attachment(generated.bytes, DOCX_CONTENT_TYPE, &generated.file_name);
    if let Ok(value) = HeaderValue::from_str(&generated.sha256) {
        response.headers_mut().insert("x-document-sha256", value);
    }
    Ok(response)
}

pub(super) async fn analyze(body: Bytes) -> ApiResult<DocumentStructure> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body must contain a .docx file"));
    }
    let structure = tokio::task::spawn_blocking(move || analyze_docx(&body)).await??;
    Ok(Json(ApiResponse::ok(structure)))
}

pub(super) async fn list_examples(
    State(state): State<AppState>,
) -> ApiResult<Vec<StructureProfile>> {
    Ok(Json(ApiResponse::ok(state.learning.list())))
}

#[derive(Debug, Deserialize)]
pub(super) struct ExampleQuery {
    name: Option<String>,
}

pub(super) async fn add_example(
    State(state): State<AppState>,
    Query(query): Query<ExampleQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<StructureProfile>>), ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body must contain a .docx file"));
    }
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("example_{}", chrono::Utc::now().format("%Y%m%d%H%M%S")));
    let learning = state.learning.clone();
    let profile = tokio::task::spawn_blocking(move || learning.add_example(&name, &body)).await??;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(profile))))
}
