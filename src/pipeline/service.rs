//! Service facade shared by the HTTP surface and the CLI.

use super::orchestrator::{PipelineSettings, SummaryPipeline};
use super::types::{
    PipelineError, SummaryInput, SummaryOutcome, UNSUPPORTED_TYPE_MESSAGE, UploadTicket,
    UploadUrlRequest,
};
use crate::config::Config;
use crate::document::DocumentKind;
use crate::extraction::TextExtractor;
use crate::extraction::cloud::{CloudDetectionSettings, CloudTextExtractor};
use crate::extraction::ocr::{OcrClient, OcrError, OcrSpaceClient};
use crate::extraction::textract::TextractClient;
use crate::metrics::{MetricsSnapshot, SummaryMetrics};
use crate::polling::PollPolicy;
use crate::storage::{ObjectStorage, S3ObjectStorage, StorageError, unix_millis, upload_key};
use crate::summarization::{OpenAiSettings, OpenAiSummarizer, SummarizeError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while wiring providers at startup.
#[derive(Debug, Error)]
pub enum InitError {
    /// Summarization client could not be built.
    #[error("Failed to initialize summarization client: {0}")]
    Summarizer(#[from] SummarizeError),
    /// OCR client could not be built.
    #[error("Failed to initialize OCR client: {0}")]
    Ocr(#[from] OcrError),
    /// Object storage could not be configured.
    #[error("Failed to initialize object storage: {0}")]
    Storage(#[from] StorageError),
}

/// Abstraction over the summarization service used by external surfaces.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Summarize one document.
    async fn summarize(&self, input: SummaryInput) -> Result<SummaryOutcome, PipelineError>;

    /// Issue a presigned upload URL for a document too large for direct upload.
    async fn create_upload_url(
        &self,
        request: UploadUrlRequest,
    ) -> Result<UploadTicket, PipelineError>;

    /// Largest direct upload accepted by [`SummaryApi::summarize`].
    fn direct_upload_limit(&self) -> usize;

    /// Current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Default [`SummaryApi`] implementation wrapping a [`SummaryPipeline`].
pub struct SummaryService {
    pipeline: SummaryPipeline,
    metrics: Arc<SummaryMetrics>,
    direct_upload_limit: usize,
    upload_url_ttl: Duration,
}

impl SummaryService {
    /// Wrap a pipeline; `metrics` must be the registry the pipeline records into.
    pub fn new(
        pipeline: SummaryPipeline,
        metrics: Arc<SummaryMetrics>,
        direct_upload_limit: usize,
        upload_url_ttl: Duration,
    ) -> Self {
        Self {
            pipeline,
            metrics,
            direct_upload_limit,
            upload_url_ttl,
        }
    }

    /// Build every provider client from configuration.
    pub async fn from_config(config: &Config) -> Result<Self, InitError> {
        let interval = Duration::from_millis(config.poll_interval_ms);

        let summarizer = OpenAiSummarizer::new(OpenAiSettings {
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            assistant_id: config.openai_assistant_id.clone(),
            model: config.openai_model.clone(),
            poll: PollPolicy::new(interval, config.run_poll_attempts),
        })?;

        let ocr = match &config.ocr_space_api_key {
            Some(key) => {
                let client = OcrSpaceClient::new(config.ocr_space_url.clone(), key.clone())?;
                Some(Arc::new(client) as Arc<dyn OcrClient>)
            }
            None => {
                tracing::warn!("OCR_SPACE_API_KEY not set; OCR fallback disabled");
                None
            }
        };

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()));
        if let Some(endpoint) = &config.aws_endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let aws = loader.load().await;
        let detector = Arc::new(TextractClient::new(&aws));

        let storage = match &config.aws_s3_bucket_name {
            Some(bucket) => {
                let storage = S3ObjectStorage::new(
                    bucket.clone(),
                    config.aws_region.clone(),
                    config.aws_endpoint_url.clone(),
                )?;
                Some(Arc::new(storage) as Arc<dyn ObjectStorage>)
            }
            None => {
                tracing::warn!("AWS_S3_BUCKET_NAME not set; stored uploads and asynchronous detection disabled");
                None
            }
        };

        let metrics = Arc::new(SummaryMetrics::new());
        let extractor = TextExtractor::new(
            CloudTextExtractor::new(
                detector,
                CloudDetectionSettings {
                    sync_max_bytes: config.sync_detection_max_bytes,
                    bucket: config.aws_s3_bucket_name.clone(),
                    poll: PollPolicy::new(interval, config.job_poll_attempts),
                },
            ),
            ocr,
            config.ocr_max_bytes,
            metrics.clone(),
        );

        let upload_url_ttl = Duration::from_secs(config.upload_url_ttl_secs);
        let pipeline = SummaryPipeline::new(
            extractor,
            Arc::new(summarizer),
            storage,
            metrics.clone(),
            PipelineSettings {
                temp_dir: std::env::temp_dir(),
                direct_upload_max_bytes: config.direct_upload_max_bytes,
                delete_after_processing: config.delete_after_processing,
                ocr_url_ttl: upload_url_ttl,
            },
        );

        Ok(Self::new(
            pipeline,
            metrics,
            config.direct_upload_max_bytes,
            upload_url_ttl,
        ))
    }
}

#[async_trait]
impl SummaryApi for SummaryService {
    async fn summarize(&self, input: SummaryInput) -> Result<SummaryOutcome, PipelineError> {
        self.pipeline.run(input).await
    }

    async fn create_upload_url(
        &self,
        request: UploadUrlRequest,
    ) -> Result<UploadTicket, PipelineError> {
        if DocumentKind::from_content_type(&request.file_type).is_none() {
            return Err(PipelineError::Validation(UNSUPPORTED_TYPE_MESSAGE.into()));
        }
        if request.file_name.trim().is_empty() {
            return Err(PipelineError::Validation("fileName is required".into()));
        }
        if request.file_size == 0 {
            return Err(PipelineError::Validation("fileSize must be positive".into()));
        }
        let storage = self
            .pipeline
            .storage()
            .ok_or(PipelineError::StorageUnavailable)?;

        let key = upload_key(&request.file_name, unix_millis());
        let upload_url = storage
            .presigned_upload_url(&key, self.upload_url_ttl)
            .await?;
        tracing::info!(
            key = %key,
            file_type = %request.file_type,
            bytes = request.file_size,
            ttl_secs = self.upload_url_ttl.as_secs(),
            "Issued presigned upload URL"
        );

        Ok(UploadTicket {
            upload_url,
            file_url: storage.public_url(&key),
            file_key: key,
        })
    }

    fn direct_upload_limit(&self) -> usize {
        self.direct_upload_limit
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
