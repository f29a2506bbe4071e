//! Proposal API endpoints

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::error::DocgenError;
use crate::extract::template_preview;
use crate::generate::{is_safe_filename, unknown_tokens, DocumentGenerator};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Clone)]
pub struct DocgenState {
    config: Arc<AppConfig>,
}

impl DocgenState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub ok: bool,
    pub template_text: String,
    pub tokens: Vec<String>,
    /// Tokens with no matching form field
    pub unknown_tokens: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub ok: bool,
    pub filename: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            ok: false,
            error: error.into(),
            hint: None,
        }),
    )
}

fn template_missing(config: &AppConfig) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            ok: false,
            error: DocgenError::TemplateNotFound {
                path: config.template_path.clone(),
            }
            .to_string(),
            hint: Some(config.template_hint()),
        }),
    )
}

fn docgen_error(config: &AppConfig, e: DocgenError) -> ApiError {
    if e.is_template_missing() {
        return template_missing(config);
    }
    error!("Document processing failed: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("Blocking task failed: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

/// GET /template
/// Visible text of the template for the client-side preview
async fn get_template(State(state): State<DocgenState>) -> Result<Json<TemplateResponse>, ApiError> {
    let config = state.config;
    if !config.template_exists() {
        return Err(template_missing(&config));
    }

    let path = config.template_path.clone();
    let preview = tokio::task::spawn_blocking(move || template_preview(&path))
        .await
        .map_err(join_error)?
        .map_err(|e| docgen_error(&config, e))?;

    let unknown = unknown_tokens(&preview.tokens);
    if !unknown.is_empty() {
        warn!(
            "Template {} uses tokens no form field fills: {}",
            config.template_path.display(),
            unknown.join(", ")
        );
    }

    Ok(Json(TemplateResponse {
        ok: true,
        template_text: preview.text,
        tokens: preview.tokens,
        unknown_tokens: unknown,
    }))
}

/// POST /generate
/// Fill the template from the JSON body. A missing or malformed body is an
/// empty form, so every token falls back to its default.
async fn generate(
    State(state): State<DocgenState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let config = state.config;
    if !config.template_exists() {
        return Err(template_missing(&config));
    }

    let payload = parse_payload(&body);
    let generator = DocumentGenerator::new(config.as_ref().clone());
    let generated = tokio::task::spawn_blocking(move || generator.generate(&payload))
        .await
        .map_err(join_error)?
        .map_err(|e| docgen_error(&config, e))?;

    Ok(Json(GenerateResponse {
        ok: true,
        filename: generated.filename,
        download_url: generated.download_url,
    }))
}

fn parse_payload(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Default::default());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!("Ignoring non-object generate payload: {}", other);
            Value::Object(Default::default())
        }
        Err(e) => {
            warn!("Ignoring malformed generate payload: {}", e);
            Value::Object(Default::default())
        }
    }
}

/// GET /download/:filename
/// Stream a generated document as an attachment (ranges and HEAD included)
async fn download(
    State(state): State<DocgenState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    if !is_safe_filename(&filename) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid file name"));
    }

    let path = state.config.output_dir.join(&filename);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(api_error(StatusCode::NOT_FOUND, "File not found")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(api_error(StatusCode::NOT_FOUND, "File not found"));
        }
        Err(e) => {
            error!("Failed to stat {}: {}", path.display(), e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    }

    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);
    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DOCX_CONTENT_TYPE));
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}

/// `attachment` with an ASCII fallback and the RFC 5987 UTF-8 name
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

// ============================================================================
// Router Factory
// ============================================================================

/// Create the proposal router: API routes, the front end, CORS and tracing
pub fn create_docgen_router(config: Arc<AppConfig>) -> Router {
    let index = ServeFile::new(config.index_file());
    let public = ServeDir::new(config.public_dir());
    let state = DocgenState::new(config);

    Router::new()
        .route("/health", get(health))
        .route("/template", get(get_template))
        .route("/generate", post(generate))
        .route("/download/:filename", get(download))
        .route_service("/", index)
        .nest_service("/public", public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
