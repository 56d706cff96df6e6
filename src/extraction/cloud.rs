//! Cloud text detection with synchronous and asynchronous modes.

use super::ExtractionError;
use super::textract::{
    BlockKind, DetectionJob, TextBlock, TextDetectionClient, TextDetectionError,
};
use crate::polling::{JobStatus, PollPolicy, Polled};
use bytes::Bytes;
use std::sync::Arc;

/// Tunables for cloud text detection.
#[derive(Clone, Debug)]
pub struct CloudDetectionSettings {
    /// Buffers strictly below this size are detected synchronously.
    pub sync_max_bytes: usize,
    /// Bucket holding stored uploads; asynchronous detection needs it.
    pub bucket: Option<String>,
    /// Job polling schedule.
    pub poll: PollPolicy,
}

impl Default for CloudDetectionSettings {
    fn default() -> Self {
        Self {
            sync_max_bytes: 10 * 1024 * 1024,
            bucket: None,
            poll: PollPolicy::detection_job(),
        }
    }
}

/// Selects a detection mode by payload size and turns provider blocks into text.
pub struct CloudTextExtractor {
    client: Arc<dyn TextDetectionClient>,
    settings: CloudDetectionSettings,
}

impl CloudTextExtractor {
    /// Wrap a provider client.
    pub fn new(client: Arc<dyn TextDetectionClient>, settings: CloudDetectionSettings) -> Self {
        Self { client, settings }
    }

    /// Extract text, submitting bytes inline when small enough and otherwise running a job
    /// against the stored copy under `object_key`.
    pub async fn extract(
        &self,
        bytes: &Bytes,
        object_key: Option<&str>,
    ) -> Result<String, ExtractionError> {
        if bytes.len() < self.settings.sync_max_bytes {
            self.detect_inline(bytes).await
        } else {
            self.detect_stored(bytes.len(), object_key).await
        }
    }

    async fn detect_inline(&self, bytes: &Bytes) -> Result<String, ExtractionError> {
        tracing::debug!(bytes = bytes.len(), "Running synchronous text detection");
        let blocks = self
            .client
            .detect_document_text(bytes.clone())
            .await
            .map_err(map_provider_error)?;
        join_lines(&blocks)
    }

    async fn detect_stored(
        &self,
        size: usize,
        object_key: Option<&str>,
    ) -> Result<String, ExtractionError> {
        let Some(key) = object_key else {
            return Err(ExtractionError::MissingObjectKey { size });
        };
        let Some(bucket) = self.settings.bucket.as_deref() else {
            return Err(ExtractionError::MissingBucket { size });
        };

        let job_id = self
            .client
            .start_document_text_detection(bucket, key)
            .await
            .map_err(map_provider_error)?;
        tracing::info!(job_id = %job_id, key, size, "Started asynchronous text detection");

        let client = &self.client;
        let job_id = job_id.as_str();
        let queued = DetectionJob {
            status: JobStatus::Queued,
            status_message: None,
            blocks: Vec::new(),
        };
        let polled = self
            .settings
            .poll
            .poll(queued, |job| job.status.is_pending(), |attempt| async move {
                let job = client
                    .get_document_text_detection(job_id)
                    .await
                    .map_err(map_provider_error)?;
                tracing::debug!(job_id, attempt, status = %job.status, "Polled text detection job");
                Ok::<_, ExtractionError>(job)
            })
            .await?;

        match polled {
            Polled::Settled { attempts, value: job } if job.status == JobStatus::Completed => {
                tracing::info!(job_id, attempts, "Text detection job completed");
                join_lines(&job.blocks)
            }
            Polled::Settled { value: job, .. } => Err(ExtractionError::JobFailed(
                job.status_message
                    .unwrap_or_else(|| "no status message".to_string()),
            )),
            Polled::Exhausted { attempts, last } => Err(ExtractionError::TimedOut {
                attempts,
                status: last.status,
            }),
        }
    }
}

fn join_lines(blocks: &[TextBlock]) -> Result<String, ExtractionError> {
    let lines: Vec<&str> = blocks
        .iter()
        .filter(|block| block.kind == BlockKind::Line)
        .filter_map(|block| block.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Err(ExtractionError::NoTextDetected);
    }
    Ok(lines.join("\n"))
}

pub(crate) fn map_provider_error(error: TextDetectionError) -> ExtractionError {
    match error {
        TextDetectionError::Provider { code, message } => match code.as_deref() {
            Some("UnsupportedDocumentException") => ExtractionError::UnsupportedFormat,
            Some("DocumentTooLargeException") => ExtractionError::TooLarge,
            Some("AccessDeniedException") => ExtractionError::AccessDenied,
            Some("InvalidS3ObjectException") => ExtractionError::InvalidStoredObject,
            Some("BadDocumentException") => ExtractionError::BadDocument,
            _ => ExtractionError::Provider(message),
        },
        other @ TextDetectionError::MissingJobId => ExtractionError::Provider(other.to_string()),
    }
}
