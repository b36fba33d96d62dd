//! HTTP transport over the pipeline.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, warn};

use crate::error::{Error, ErrorKind};
use crate::pipeline::{
    artifact, Artifact, ArtifactKind, Pipeline, PipelineError, PipelineOutcome, Request,
    RequestKind, Stage,
};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Prefix of returned download URLs, without a trailing slash.
    pub public_url: String,
}

impl AppState {
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>, public_url: &str) -> Self {
        Self {
            pipeline,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn download_url(&self, name: &str) -> String {
        format!("{}/download/{name}", self.public_url)
    }
}

/// Builds the router. An empty `allowed_origins` allows any origin.
///
/// The `_h5` routes are aliases kept for clients of the older endpoint names.
pub fn app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/export_stl/", post(export_stl))
        .route("/h5_to_vis/", post(h5_to_vis))
        .route("/encode/", post(encode))
        .route("/encode_h5/", post(encode))
        .route("/decode/", post(decode))
        .route("/decode_h5/", post(decode))
        .route("/encode_decode/", post(encode_decode))
        .route("/encode_decode_h5/", post(encode_decode))
        .route("/download/{name}", get(download))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ArtifactJson {
    kind: ArtifactKind,
    name: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    message: String,
    stl_file_url: Option<String>,
    artifacts: Vec<ArtifactJson>,
    warnings: Vec<String>,
    triangle_count: Option<usize>,
    stages: Vec<Stage>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn from_error(error: &Error, stage: Option<Stage>) -> Self {
        let kind = error.kind();
        let (status, message) = match kind {
            ErrorKind::UnsupportedRequest => (StatusCode::BAD_REQUEST, error.to_string()),
            ErrorKind::WriteError | ErrorKind::Internal => {
                error!(%error, ?stage, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ErrorKind::MalformedSequence
            | ErrorKind::ReconstructionError
            | ErrorKind::ValidityWarning
            | ErrorKind::MeshingFailed
            | ErrorKind::TransformFailed => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        };
        Self {
            status,
            body: ErrorResponse {
                error: message,
                kind,
                stage,
            },
        }
    }

    fn unsupported(message: impl Into<String>) -> Self {
        Self::from_error(&Error::UnsupportedRequest(message.into()), None)
    }

    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: "internal error".to_string(),
                kind: ErrorKind::Internal,
                stage: None,
            },
        }
    }

    fn not_found(name: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error: format!("artifact `{name}` not found"),
                kind: ErrorKind::UnsupportedRequest,
                stage: None,
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::from_error(&err.error, Some(err.stage))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn export_stl(
    state: State<AppState>,
    form: Multipart,
) -> Result<Json<RunResponse>, ApiError> {
    run(state, RequestKind::Export, form).await
}

async fn h5_to_vis(state: State<AppState>, form: Multipart) -> Result<Json<RunResponse>, ApiError> {
    run(state, RequestKind::H5ToVis, form).await
}

async fn encode(state: State<AppState>, form: Multipart) -> Result<Json<RunResponse>, ApiError> {
    run(state, RequestKind::Encode, form).await
}

async fn decode(state: State<AppState>, form: Multipart) -> Result<Json<RunResponse>, ApiError> {
    run(state, RequestKind::Decode, form).await
}

async fn encode_decode(
    state: State<AppState>,
    form: Multipart,
) -> Result<Json<RunResponse>, ApiError> {
    run(state, RequestKind::EncodeDecode, form).await
}

async fn run(
    State(state): State<AppState>,
    kind: RequestKind,
    form: Multipart,
) -> Result<Json<RunResponse>, ApiError> {
    let request = read_form(kind, form).await?;
    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&request))
        .await
        .map_err(|join| {
            error!(%join, "pipeline task panicked");
            ApiError::internal()
        })??;
    Ok(Json(response(&state, &outcome)))
}

async fn read_form(kind: RequestKind, mut form: Multipart) -> Result<Request, ApiError> {
    let mut src: Option<(String, Vec<u8>)> = None;
    let mut file_format: Option<String> = None;
    let mut deflection: Option<f64> = None;

    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| ApiError::unsupported(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "src" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::unsupported(format!("cannot read `src`: {e}")))?;
                src = Some((file_name, bytes.to_vec()));
            }
            "file_format" | "deflection" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::unsupported(format!("cannot read `{name}`: {e}")))?;
                if name == "file_format" {
                    file_format = Some(text.trim().to_string());
                } else {
                    let value = text.trim().parse::<f64>().map_err(|_| {
                        ApiError::unsupported(format!("deflection `{text}` is not a number"))
                    })?;
                    deflection = Some(value);
                }
            }
            other => warn!(field = other, "ignoring unknown form field"),
        }
    }

    let (file_name, bytes) = src.ok_or_else(|| ApiError::unsupported("missing `src` file"))?;
    let file_format = file_format.ok_or_else(|| ApiError::unsupported("missing `file_format`"))?;
    Ok(Request {
        kind,
        file_name,
        file_format,
        deflection,
        bytes,
    })
}

fn response(state: &AppState, outcome: &PipelineOutcome) -> RunResponse {
    let artifacts: Vec<ArtifactJson> = outcome
        .artifacts
        .iter()
        .map(|a: &Artifact| ArtifactJson {
            kind: a.kind,
            name: a.name.clone(),
            url: state.download_url(&a.name),
        })
        .collect();
    RunResponse {
        message: format!("{} completed", outcome.kind.name()),
        stl_file_url: outcome.mesh().map(|m| state.download_url(&m.name)),
        artifacts,
        warnings: outcome.warnings.clone(),
        triangle_count: outcome.triangle_count,
        stages: outcome.trail.clone(),
    }
}

async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let Some(path) = state.pipeline.storage().find(&name) else {
        return Err(ApiError::not_found(&name));
    };
    let bytes = tokio::task::spawn_blocking(move || std::fs::read(path))
        .await
        .ok()
        .and_then(Result::ok)
        .ok_or_else(|| ApiError::not_found(&name))?;

    let content_type = if name.ends_with(".stl") {
        "model/stl"
    } else {
        "application/json"
    };
    let disposition = artifact::plain_file_name(&name)
        .and_then(|n| HeaderValue::from_str(&format!("attachment; filename=\"{n}\"")).ok())
        .unwrap_or_else(|| HeaderValue::from_static("attachment"));

    let mut response = Response::new(Body::from(bytes));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response.headers_mut().insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}
