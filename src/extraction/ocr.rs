//! OCR.space client used as the last-resort text extractor.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the OCR provider.
#[derive(Debug, Error)]
pub enum OcrError {
    /// HTTP layer failed before receiving a response.
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("OCR provider returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider accepted the request but reported a processing error.
    #[error("OCR provider could not process the document: {0}")]
    Processing(String),
}

/// Where the OCR provider should read the document from.
#[derive(Clone, Debug)]
pub enum OcrSource {
    /// Upload the bytes as a multipart file part.
    File {
        /// File name sent to the provider; the extension drives format detection.
        file_name: String,
        /// Raw document contents.
        bytes: Bytes,
    },
    /// Let the provider fetch the document from an externally reachable URL.
    Url(String),
}

/// Interface implemented by OCR backends.
#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Return the recognized text, or an empty string when nothing was recognized.
    async fn extract_text(&self, source: OcrSource) -> Result<String, OcrError>;
}

/// OCR.space REST client.
pub struct OcrSpaceClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OcrSpaceClient {
    /// Build a client for the given API root and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, OcrError> {
        let http = Client::builder().user_agent("docbrief/ocr").build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/parse/image", self.base_url.trim_end_matches('/'))
    }

    fn build_form(&self, source: OcrSource) -> Form {
        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("OCREngine", "2")
            .text("isOverlayRequired", "false")
            .text("language", "eng");
        match source {
            OcrSource::File { file_name, bytes } => {
                form.part("file", Part::bytes(bytes.to_vec()).file_name(file_name))
            }
            OcrSource::Url(url) => form.text("url", url),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

#[async_trait]
impl OcrClient for OcrSpaceClient {
    async fn extract_text(&self, source: OcrSource) -> Result<String, OcrError> {
        let mode = match &source {
            OcrSource::File { bytes, .. } => format!("file ({} bytes)", bytes.len()),
            OcrSource::Url(_) => "url".to_string(),
        };
        tracing::debug!(mode = %mode, "Submitting document to OCR.space");

        let response = self
            .http
            .post(self.endpoint())
            .multipart(self.build_form(source))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::UnexpectedStatus { status, body });
        }

        let body: OcrSpaceResponse = response.json().await?;
        let fragments = body.parsed_results.unwrap_or_default();
        if fragments.is_empty() && body.is_errored_on_processing {
            return Err(OcrError::Processing(flatten_error_message(
                body.error_message.as_ref(),
            )));
        }

        let text = fragments
            .iter()
            .map(|fragment| fragment.parsed_text.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        tracing::debug!(
            fragments = fragments.len(),
            chars = text.chars().count(),
            "OCR.space responded"
        );
        Ok(text)
    }
}

// OCR.space reports errors as either a string or a list of strings.
fn flatten_error_message(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Array(messages)) => messages
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => "unknown OCR error".to_string(),
    }
}
