//! HTTP surface for docbrief.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /summarize` – Summarize a PDF or PowerPoint file. Accepts either `multipart/form-data`
//!   with a `file` part (direct upload), or `application/json` `{ "fileKey", "fileName"?,
//!   "fileType"? }` referencing a document previously uploaded through `/upload-url`.
//!   Returns `{ "summary": string }`.
//! - `POST /upload-url` – Issue a presigned upload URL for documents above the direct upload limit.
//! - `GET /metrics` – Observe summarization counters per extraction path.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures are reported as `{ "error": string, "details"?: string }` with a 4xx status for
//! caller mistakes, 504 when provider polling runs out, and 500 otherwise.

use crate::document::{Document, DocumentKind};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::types::UNSUPPORTED_TYPE_MESSAGE;
use crate::pipeline::{PipelineError, SummaryApi, SummaryInput, UploadTicket, UploadUrlRequest};
use crate::storage::StorageError;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, FromRequest, Multipart, Request, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Room left in the request body limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummaryApi + 'static,
{
    let body_limit = service.direct_upload_limit() + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route("/summarize", post(summarize::<S>))
        .route("/upload-url", post(create_upload_url::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// JSON body for `POST /summarize` when the document already sits in object storage.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSummaryRequest {
    /// Object storage key returned by `/upload-url`.
    file_key: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
}

/// Success response for `POST /summarize`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Summarize an uploaded or stored document.
///
/// The request body format is chosen by `Content-Type`; anything other than multipart or JSON
/// is rejected with 415 before any provider is contacted.
async fn summarize<S>(
    State(service): State<Arc<S>>,
    request: Request,
) -> Result<Json<SummaryResponse>, ApiError>
where
    S: SummaryApi,
{
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let input = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        read_upload(multipart).await?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<StoredSummaryRequest>::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        SummaryInput::Stored {
            key: body.file_key,
            file_name: body.file_name,
            content_type: body.file_type,
        }
    } else {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Content-Type must be multipart/form-data or application/json",
        ));
    };

    let outcome = service.summarize(input).await?;
    tracing::info!(source = %outcome.source, "Summarize request completed");
    Ok(Json(SummaryResponse {
        summary: outcome.summary,
    }))
}

async fn read_upload(mut multipart: Multipart) -> Result<SummaryInput, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(ApiError::from)?;
        let kind = DocumentKind::resolve(content_type.as_deref(), &file_name)
            .ok_or_else(|| ApiError::bad_request(UNSUPPORTED_TYPE_MESSAGE))?;
        return Ok(SummaryInput::Direct(Document::new(file_name, kind, bytes)));
    }
    Err(ApiError::bad_request("No file uploaded"))
}

/// Issue a presigned upload URL.
async fn create_upload_url<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> Result<Json<UploadTicket>, ApiError>
where
    S: SummaryApi,
{
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let ticket = service.create_upload_url(request).await?;
    Ok(Json(ticket))
}

/// Return the summarization counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SummaryApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Summarize a PDF or PowerPoint file sent as multipart `file`, or a stored upload referenced by JSON `fileKey`. Response returns { \"summary\": string }.",
                request_example: Some(json!({
                    "fileKey": "uploads/1700000000000-report.pdf",
                    "fileName": "report.pdf",
                    "fileType": "application/pdf"
                })),
            },
            CommandDescriptor {
                name: "upload_url",
                method: "POST",
                path: "/upload-url",
                description: "Issue a presigned PUT URL for large documents. Response returns { \"uploadUrl\", \"fileKey\", \"fileUrl\" }.",
                request_example: Some(json!({
                    "fileName": "report.pdf",
                    "fileType": "application/pdf",
                    "fileSize": 12_582_912
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters per extraction path, fallbacks, and failures.",
                request_example: None,
            },
        ],
    })
}

/// Error response rendered as `{ "error", "details"? }`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = json!(details);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::new(error.status(), error.body_text())
    }
}

impl From<PipelineError> for ApiError {
    fn from(error: PipelineError) -> Self {
        if error.is_timeout() {
            return Self::new(StatusCode::GATEWAY_TIMEOUT, "Processing timed out")
                .with_details(error.to_string());
        }
        match error {
            PipelineError::Validation(message) => Self::bad_request(message),
            error @ PipelineError::PayloadTooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, error.to_string())
            }
            PipelineError::Storage(StorageError::NotFound(key)) => {
                Self::bad_request("Stored document not found").with_details(key)
            }
            PipelineError::Storage(inner) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to access stored document",
            )
            .with_details(inner.to_string()),
            error @ PipelineError::StorageUnavailable => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
            PipelineError::Staging(inner) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to stage document")
                    .with_details(inner.to_string())
            }
            PipelineError::Extraction(inner) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to extract text from document",
            )
            .with_details(inner.to_string()),
            PipelineError::Summarization(inner) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to summarize document")
                    .with_details(inner.to_string())
            }
        }
    }
}
