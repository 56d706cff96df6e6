//! Text extraction for scanned documents and the cloud → OCR fallback chain.
//!
//! Documents with a usable text layer never reach this module; they are summarized as files.
//! Everything else goes through cloud text detection first and falls back to OCR only when an
//! OCR key is configured and the document fits under the OCR payload ceiling. At most one
//! strategy runs to completion per document.

pub mod cloud;
pub mod ocr;
pub mod textract;

use crate::document::{Document, ExtractionResult, ExtractionSource};
use crate::metrics::SummaryMetrics;
use crate::polling::JobStatus;
use cloud::CloudTextExtractor;
use ocr::{OcrClient, OcrError, OcrSource};
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by the extraction strategies.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Text detection does not accept this file format.
    #[error("Unsupported document format for text detection")]
    UnsupportedFormat,
    /// Text detection refused the payload size.
    #[error("Document is too large for text detection")]
    TooLarge,
    /// Text detection could not read the stored object.
    #[error("Access denied while reading the document for text detection")]
    AccessDenied,
    /// Stored object is missing or unreadable by the detection service.
    #[error("The stored document could not be read by text detection")]
    InvalidStoredObject,
    /// Document is damaged or not a recognizable format.
    #[error("The document is damaged or unreadable")]
    BadDocument,
    /// Any other text detection failure, with the provider's message.
    #[error("Text detection failed: {0}")]
    Provider(String),
    /// Detection finished without a single line of text.
    #[error("No text detected in document")]
    NoTextDetected,
    /// Document needs asynchronous detection but was not uploaded to object storage.
    #[error(
        "Document of {size} bytes requires asynchronous text detection, but it is not in object storage"
    )]
    MissingObjectKey {
        /// Size of the rejected buffer.
        size: usize,
    },
    /// Document needs asynchronous detection but no bucket is configured.
    #[error(
        "Document of {size} bytes requires asynchronous text detection, but no storage bucket is configured"
    )]
    MissingBucket {
        /// Size of the rejected buffer.
        size: usize,
    },
    /// Asynchronous detection job reported failure.
    #[error("Text detection job failed: {0}")]
    JobFailed(String),
    /// Asynchronous detection job never reached a terminal state.
    #[error("Text detection job timed out after {attempts} attempts (last status: {status})")]
    TimedOut {
        /// Number of status polls issued.
        attempts: u32,
        /// Last status observed.
        status: JobStatus,
    },
    /// OCR provider failed.
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
    /// OCR was requested but no OCR key is configured.
    #[error("OCR is not configured")]
    OcrUnavailable,
    /// Strategy succeeded but returned only whitespace.
    #[error("{strategy} extraction returned no text")]
    EmptyText {
        /// Strategy that returned nothing.
        strategy: ExtractionSource,
    },
    /// Cloud detection failed and the OCR fallback was skipped or failed too.
    #[error("{cloud}; {fallback}")]
    Exhausted {
        /// Original cloud detection failure.
        cloud: Box<ExtractionError>,
        /// Why the fallback did not produce text.
        fallback: String,
    },
}

impl ExtractionError {
    /// Whether the failure came from an exhausted polling budget.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::TimedOut { .. } => true,
            Self::Exhausted { cloud, .. } => cloud.is_timeout(),
            _ => false,
        }
    }
}

/// Runs the cloud → OCR chain against a scanned document.
pub struct TextExtractor {
    cloud: CloudTextExtractor,
    ocr: Option<Arc<dyn OcrClient>>,
    ocr_max_bytes: usize,
    metrics: Arc<SummaryMetrics>,
}

impl TextExtractor {
    /// Assemble the chain; `ocr` is `None` when no OCR key is configured. `metrics` should be
    /// the registry the pipeline records into.
    pub fn new(
        cloud: CloudTextExtractor,
        ocr: Option<Arc<dyn OcrClient>>,
        ocr_max_bytes: usize,
        metrics: Arc<SummaryMetrics>,
    ) -> Self {
        Self {
            cloud,
            ocr,
            ocr_max_bytes,
            metrics,
        }
    }

    /// Extract text: cloud detection first, then OCR when eligible.
    ///
    /// `ocr_url` lets OCR fetch a stored copy instead of receiving the bytes.
    pub async fn extract(
        &self,
        document: &Document,
        object_key: Option<&str>,
        ocr_url: Option<String>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let cloud_error = match self.detect_cloud(document, object_key).await {
            Ok(result) => return Ok(result),
            Err(error) => error,
        };
        tracing::warn!(error = %cloud_error, bytes = document.size(), "Cloud text detection failed");

        let client = match self.ocr_client(document.size()) {
            Ok(client) => client,
            Err(reason) => {
                tracing::warn!(reason = %reason, "OCR fallback unavailable");
                return Err(ExtractionError::Exhausted {
                    cloud: Box::new(cloud_error),
                    fallback: reason,
                });
            }
        };

        tracing::info!(bytes = document.size(), "Falling back to OCR");
        self.metrics.record_ocr_fallback();
        self.run_ocr(client, document, ocr_url)
            .await
            .map_err(|ocr_error| ExtractionError::Exhausted {
                cloud: Box::new(cloud_error),
                fallback: format!("OCR fallback failed: {ocr_error}"),
            })
    }

    async fn detect_cloud(
        &self,
        document: &Document,
        object_key: Option<&str>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let text = self.cloud.extract(&document.bytes, object_key).await?;
        non_blank(text, ExtractionSource::CloudTextDetection)
    }

    async fn run_ocr(
        &self,
        client: &Arc<dyn OcrClient>,
        document: &Document,
        ocr_url: Option<String>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let source = match ocr_url {
            Some(url) => OcrSource::Url(url),
            None => OcrSource::File {
                file_name: document.file_name.clone(),
                bytes: document.bytes.clone(),
            },
        };
        let text = client.extract_text(source).await?;
        non_blank(text, ExtractionSource::Ocr)
    }

    fn ocr_client(&self, size: usize) -> Result<&Arc<dyn OcrClient>, String> {
        let Some(client) = self.ocr.as_ref() else {
            return Err("OCR fallback is not configured".to_string());
        };
        if size > self.ocr_max_bytes {
            return Err(format!(
                "OCR fallback skipped: document is {size} bytes, above the {}-byte OCR limit",
                self.ocr_max_bytes
            ));
        }
        Ok(client)
    }
}

fn non_blank(
    text: String,
    strategy: ExtractionSource,
) -> Result<ExtractionResult, ExtractionError> {
    let result = ExtractionResult::new(text, strategy);
    if result.is_blank() {
        return Err(ExtractionError::EmptyText { strategy });
    }
    tracing::info!(source = %strategy, chars = result.char_count, "Extracted text");
    Ok(result)
}
