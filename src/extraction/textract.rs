//! Cloud text-detection provider seam and its AWS Textract implementation.

use crate::polling::JobStatus;
use async_trait::async_trait;
use aws_sdk_textract::{
    Client,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::Blob,
    types::{
        Block, BlockType, Document as TextractDocument, DocumentLocation,
        JobStatus as TextractJobStatus, S3Object,
    },
};
use bytes::Bytes;
use thiserror::Error;

/// Errors returned by a text-detection provider.
#[derive(Debug, Error)]
pub enum TextDetectionError {
    /// Provider rejected or failed the call.
    #[error("{message}")]
    Provider {
        /// Provider error code such as `UnsupportedDocumentException`.
        code: Option<String>,
        /// Provider error message.
        message: String,
    },
    /// Asynchronous job was accepted without an identifier.
    #[error("text detection provider returned no job identifier")]
    MissingJobId,
}

/// Granularity of a detected block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// Whole page.
    Page,
    /// Single line of text.
    Line,
    /// Single word.
    Word,
    /// Anything else (tables, key/value pairs, ...).
    Other,
}

/// One detected text block, in provider order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    /// Block granularity.
    pub kind: BlockKind,
    /// Detected text, when the block carries any.
    pub text: Option<String>,
}

impl TextBlock {
    /// Convenience constructor for line blocks.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Line,
            text: Some(text.into()),
        }
    }

    /// Convenience constructor for word blocks.
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Word,
            text: Some(text.into()),
        }
    }
}

/// Status and results of an asynchronous detection job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionJob {
    /// Current job status.
    pub status: JobStatus,
    /// Provider status message, populated on failure.
    pub status_message: Option<String>,
    /// Every block of every result page, populated once the job completes.
    pub blocks: Vec<TextBlock>,
}

/// Interface implemented by managed text-detection services.
#[async_trait]
pub trait TextDetectionClient: Send + Sync {
    /// Detect text in a small document submitted inline.
    async fn detect_document_text(&self, bytes: Bytes)
    -> Result<Vec<TextBlock>, TextDetectionError>;

    /// Start an asynchronous job against a document already in object storage.
    async fn start_document_text_detection(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, TextDetectionError>;

    /// Fetch the status, and once finished the blocks, of an asynchronous job.
    async fn get_document_text_detection(
        &self,
        job_id: &str,
    ) -> Result<DetectionJob, TextDetectionError>;
}

/// AWS Textract backed text detection.
pub struct TextractClient {
    client: Client,
}

impl TextractClient {
    /// Build a client from a loaded AWS SDK configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl TextDetectionClient for TextractClient {
    async fn detect_document_text(
        &self,
        bytes: Bytes,
    ) -> Result<Vec<TextBlock>, TextDetectionError> {
        let document = TextractDocument::builder()
            .bytes(Blob::new(bytes.to_vec()))
            .build();
        let output = self
            .client
            .detect_document_text()
            .document(document)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(output.blocks().iter().map(map_block).collect())
    }

    async fn start_document_text_detection(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, TextDetectionError> {
        let location = DocumentLocation::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();
        let output = self
            .client
            .start_document_text_detection()
            .document_location(location)
            .send()
            .await
            .map_err(provider_error)?;
        output
            .job_id()
            .map(str::to_string)
            .ok_or(TextDetectionError::MissingJobId)
    }

    async fn get_document_text_detection(
        &self,
        job_id: &str,
    ) -> Result<DetectionJob, TextDetectionError> {
        let mut blocks = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .get_document_text_detection()
                .job_id(job_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(provider_error)?;

            let status = map_job_status(output.job_status());
            if status != JobStatus::Completed {
                return Ok(DetectionJob {
                    status,
                    status_message: output.status_message().map(str::to_string),
                    blocks: Vec::new(),
                });
            }

            blocks.extend(output.blocks().iter().map(map_block));
            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => {
                    return Ok(DetectionJob {
                        status,
                        status_message: output.status_message().map(str::to_string),
                        blocks,
                    });
                }
            }
        }
    }
}

fn map_block(block: &Block) -> TextBlock {
    let kind = match block.block_type() {
        Some(BlockType::Line) => BlockKind::Line,
        Some(BlockType::Word) => BlockKind::Word,
        Some(BlockType::Page) => BlockKind::Page,
        _ => BlockKind::Other,
    };
    TextBlock {
        kind,
        text: block.text().map(str::to_string),
    }
}

fn map_job_status(status: Option<&TextractJobStatus>) -> JobStatus {
    match status {
        None => JobStatus::Queued,
        Some(TextractJobStatus::InProgress) => JobStatus::InProgress,
        Some(TextractJobStatus::Succeeded) => JobStatus::Completed,
        Some(TextractJobStatus::PartialSuccess) => {
            tracing::warn!("Text detection job finished with partial success");
            JobStatus::Completed
        }
        Some(TextractJobStatus::Failed) => JobStatus::Failed,
        Some(other) => {
            tracing::warn!(status = ?other, "Unrecognized text detection job status");
            JobStatus::Failed
        }
    }
}

fn provider_error<E, R>(error: SdkError<E, R>) -> TextDetectionError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = error.code().map(str::to_string);
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&error).to_string());
    TextDetectionError::Provider { code, message }
}
