//! Per-request state machine routing a document to a summary.
//!
//! `Received → Classifying → {NativeSummarizing | Extracting → Summarizing} → Done | Failed`.
//! The staged copy is removed on every exit path, and stored uploads are deleted afterwards
//! when configured.

use super::types::{PipelineError, Stage, SummaryInput, SummaryOutcome, UNSUPPORTED_TYPE_MESSAGE};
use crate::classifier::{Classifier, classify};
use crate::document::{Document, DocumentKind, ExtractionSource};
use crate::extraction::TextExtractor;
use crate::metrics::SummaryMetrics;
use crate::storage::{ObjectStorage, sanitize_file_name};
use crate::summarization::{Summarizer, is_placeholder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::Instrument;
use uuid::Uuid;

/// Longest staged file name, leaving room for the extension.
const MAX_STAGED_NAME_LEN: usize = 200;

/// Pipeline tunables derived from configuration.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Directory under which each request stages its upload.
    pub temp_dir: PathBuf,
    /// Largest document accepted as a direct upload.
    pub direct_upload_max_bytes: usize,
    /// Delete stored uploads once a request finishes.
    pub delete_after_processing: bool,
    /// Lifetime of the presigned URL handed to the OCR provider.
    pub ocr_url_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            direct_upload_max_bytes: 4_718_592,
            delete_after_processing: false,
            ocr_url_ttl: Duration::from_secs(600),
        }
    }
}

/// Routes documents through classification, extraction, and summarization.
pub struct SummaryPipeline {
    classifier: Classifier,
    extractor: TextExtractor,
    summarizer: Arc<dyn Summarizer>,
    storage: Option<Arc<dyn ObjectStorage>>,
    metrics: Arc<SummaryMetrics>,
    settings: PipelineSettings,
}

impl SummaryPipeline {
    /// Assemble a pipeline from its providers.
    pub fn new(
        extractor: TextExtractor,
        summarizer: Arc<dyn Summarizer>,
        storage: Option<Arc<dyn ObjectStorage>>,
        metrics: Arc<SummaryMetrics>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier: classify,
            extractor,
            summarizer,
            storage,
            metrics,
            settings,
        }
    }

    /// Replace the text-layer classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Object storage handle, when a bucket is configured.
    pub fn storage(&self) -> Option<&Arc<dyn ObjectStorage>> {
        self.storage.as_ref()
    }

    /// Produce a summary for one document.
    pub async fn run(&self, input: SummaryInput) -> Result<SummaryOutcome, PipelineError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("summarize", %request_id);
        async move {
            let stored_key = input.stored_key().map(str::to_string);
            let result = self.process(input).await;

            if let Some(key) = stored_key {
                if self.settings.delete_after_processing {
                    self.delete_stored(&key).await;
                }
            }

            match &result {
                Ok(outcome) => {
                    self.metrics.record_summary(outcome.source);
                    if is_placeholder(&outcome.summary) {
                        self.metrics.record_soft_failure();
                        tracing::warn!(stage = %Stage::Done, source = %outcome.source, summary = %outcome.summary, "Provider returned a placeholder summary");
                    } else {
                        tracing::info!(stage = %Stage::Done, source = %outcome.source, chars = outcome.summary.chars().count(), "Summary ready");
                    }
                }
                Err(error) => {
                    self.metrics.record_failure();
                    if error.is_client_error() {
                        tracing::info!(stage = %Stage::Failed, error = %error, "Request rejected");
                    } else {
                        tracing::warn!(stage = %Stage::Failed, error = %error, "Summarization failed");
                    }
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn process(&self, input: SummaryInput) -> Result<SummaryOutcome, PipelineError> {
        let (document, object_key) = self.receive(input).await?;
        tracing::info!(stage = %Stage::Received, bytes = document.size(), file_name = %document.file_name, "Document received");

        let staged = self.stage(&document)?;
        let outcome = self
            .route(&document, object_key.as_deref(), &staged.path)
            .await;
        staged.close();
        outcome
    }

    async fn receive(
        &self,
        input: SummaryInput,
    ) -> Result<(Document, Option<String>), PipelineError> {
        match input {
            SummaryInput::Direct(document) => {
                let limit = self.settings.direct_upload_max_bytes;
                if document.size() > limit {
                    return Err(PipelineError::PayloadTooLarge {
                        size: document.size(),
                        limit,
                    });
                }
                if document.size() == 0 {
                    return Err(PipelineError::Validation("Uploaded file is empty".into()));
                }
                Ok((document, None))
            }
            SummaryInput::Stored {
                key,
                file_name,
                content_type,
            } => {
                if key.trim().is_empty() {
                    return Err(PipelineError::Validation("fileKey is required".into()));
                }
                let storage = self
                    .storage
                    .as_ref()
                    .ok_or(PipelineError::StorageUnavailable)?;
                let file_name = file_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| key.rsplit('/').next().unwrap_or(&key).to_string());
                let kind = DocumentKind::resolve(content_type.as_deref(), &file_name)
                    .ok_or_else(|| PipelineError::Validation(UNSUPPORTED_TYPE_MESSAGE.into()))?;

                let bytes = storage.get(&key).await?;
                if bytes.is_empty() {
                    return Err(PipelineError::Validation("Stored file is empty".into()));
                }
                if !kind.matches_signature(&bytes) {
                    return Err(PipelineError::Validation(
                        "Stored file content does not match its declared type".into(),
                    ));
                }
                Ok((Document::new(file_name, kind, bytes), Some(key)))
            }
        }
    }

    fn stage(&self, document: &Document) -> Result<StagedDocument, PipelineError> {
        let dir = tempfile::Builder::new()
            .prefix("docbrief-")
            .tempdir_in(&self.settings.temp_dir)?;
        let path = dir.path().join(staged_file_name(document));
        std::fs::write(&path, &document.bytes)?;
        tracing::debug!(path = %path.display(), bytes = document.size(), "Staged document");
        Ok(StagedDocument { dir, path })
    }

    async fn route(
        &self,
        document: &Document,
        object_key: Option<&str>,
        staged: &Path,
    ) -> Result<SummaryOutcome, PipelineError> {
        tracing::info!(stage = %Stage::Classifying, "Classifying document");
        if self.is_native(document).await {
            tracing::info!(stage = %Stage::NativeSummarizing, source = %ExtractionSource::Native, "Summarizing file");
            let summary = self.summarizer.summarize_file(staged).await?;
            return Ok(SummaryOutcome {
                summary,
                source: ExtractionSource::Native,
            });
        }

        tracing::info!(stage = %Stage::Extracting, bytes = document.size(), "Extracting text");
        let ocr_url = self.ocr_url(object_key).await;
        let extraction = self.extractor.extract(document, object_key, ocr_url).await?;

        tracing::info!(stage = %Stage::Summarizing, source = %extraction.source, chars = extraction.char_count, "Summarizing extracted text");
        let summary = self.summarizer.summarize_text(&extraction.text).await?;
        Ok(SummaryOutcome {
            summary,
            source: extraction.source,
        })
    }

    async fn is_native(&self, document: &Document) -> bool {
        let classifier = self.classifier;
        let bytes = document.bytes.clone();
        match tokio::task::spawn_blocking(move || classifier(&bytes)).await {
            Ok(verdict) => {
                tracing::info!(
                    native = verdict.is_native_text,
                    chars = verdict.char_count,
                    words = verdict.word_count,
                    "Classified document"
                );
                verdict.is_native_text
            }
            Err(error) => {
                tracing::warn!(error = %error, "Classifier crashed; treating document as scanned");
                false
            }
        }
    }

    async fn ocr_url(&self, object_key: Option<&str>) -> Option<String> {
        let (storage, key) = (self.storage.as_ref()?, object_key?);
        match storage
            .presigned_download_url(key, self.settings.ocr_url_ttl)
            .await
        {
            Ok(url) => Some(url),
            Err(error) => {
                tracing::warn!(key, error = %error, "Could not presign stored document; OCR will receive bytes");
                None
            }
        }
    }

    async fn delete_stored(&self, key: &str) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        if let Err(error) = storage.delete(key).await {
            tracing::warn!(key, error = %error, "Failed to delete stored document");
        }
    }
}

/// Upload copied into a per-request directory under its client file name.
struct StagedDocument {
    dir: TempDir,
    path: PathBuf,
}

impl StagedDocument {
    fn close(self) {
        let dir = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged document"),
            Err(error) => {
                tracing::warn!(path = %dir.display(), error = %error, "Failed to remove staged document")
            }
        }
    }
}

/// Sanitized client file name, carrying an extension that matches the document kind.
fn staged_file_name(document: &Document) -> String {
    let mut name = sanitize_file_name(document.file_name.trim());
    name.truncate(MAX_STAGED_NAME_LEN);
    let suffix = format!(".{}", document.staging_extension());
    if name.len() > suffix.len() && name.to_ascii_lowercase().ends_with(&suffix) {
        return name;
    }
    if name.is_empty() {
        name.push_str("document");
    }
    name + &suffix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::extraction::cloud::{CloudDetectionSettings, CloudTextExtractor};
    use crate::extraction::ocr::{OcrClient, OcrError, OcrSource};
    use crate::extraction::textract::{
        DetectionJob, TextBlock, TextDetectionClient, TextDetectionError,
    };
    use crate::metrics::MetricsSnapshot;
    use crate::storage::StorageError;
    use crate::summarization::{NO_SUMMARY_FOUND, SummarizeError};
    use crate::test_support::{image_only_pdf, lorem_words, text_pdf};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSummarizer {
        fail: bool,
        file_reply: Option<String>,
        files: Mutex<Vec<(PathBuf, bool)>>,
        texts: Mutex<Vec<String>>,
    }

    impl FakeSummarizer {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn summarize_file(&self, path: &Path) -> Result<String, SummarizeError> {
            self.files
                .lock()
                .unwrap()
                .push((path.to_path_buf(), path.exists()));
            if self.fail {
                return Err(SummarizeError::InvalidResponse("forced failure".into()));
            }
            Ok(self
                .file_reply
                .clone()
                .unwrap_or_else(|| "Summary: Lorem ipsum document.".into()))
        }

        async fn summarize_text(&self, text: &str) -> Result<String, SummarizeError> {
            self.texts.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(SummarizeError::InvalidResponse("forced failure".into()));
            }
            Ok("A brief greeting document.".into())
        }
    }

    struct FakeDetector {
        lines: Option<Vec<&'static str>>,
    }

    #[async_trait]
    impl TextDetectionClient for FakeDetector {
        async fn detect_document_text(
            &self,
            _bytes: Bytes,
        ) -> Result<Vec<TextBlock>, TextDetectionError> {
            match &self.lines {
                Some(lines) => Ok(lines.iter().map(|line| TextBlock::line(*line)).collect()),
                None => Err(TextDetectionError::Provider {
                    code: Some("BadDocumentException".into()),
                    message: "unreadable".into(),
                }),
            }
        }

        async fn start_document_text_detection(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<String, TextDetectionError> {
            Ok("job-1".into())
        }

        async fn get_document_text_detection(
            &self,
            _job_id: &str,
        ) -> Result<DetectionJob, TextDetectionError> {
            Ok(DetectionJob {
                status: crate::polling::JobStatus::Completed,
                status_message: None,
                blocks: vec![TextBlock::line("stored")],
            })
        }
    }

    #[derive(Default)]
    struct FakeOcr {
        sources: Mutex<Vec<OcrSource>>,
    }

    #[async_trait]
    impl OcrClient for FakeOcr {
        async fn extract_text(&self, source: OcrSource) -> Result<String, OcrError> {
            self.sources.lock().unwrap().push(source);
            Ok("ocr words".into())
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        objects: Mutex<Vec<(String, Bytes)>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeStorage {
        fn with_object(key: &str, bytes: Vec<u8>) -> Self {
            let storage = Self::default();
            storage
                .objects
                .lock()
                .unwrap()
                .push((key.to_string(), Bytes::from(bytes)));
            storage
        }
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        fn public_url(&self, key: &str) -> String {
            format!("https://docs.example/{key}")
        }

        async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
            self.objects
                .lock()
                .unwrap()
                .iter()
                .find(|(stored, _)| stored == key)
                .map(|(_, bytes)| bytes.clone())
                .ok_or_else(|| StorageError::NotFound(key.to_string()))
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn presigned_upload_url(
            &self,
            key: &str,
            _ttl: Duration,
        ) -> Result<String, StorageError> {
            Ok(format!("https://signed.example/put/{key}"))
        }

        async fn presigned_download_url(
            &self,
            key: &str,
            _ttl: Duration,
        ) -> Result<String, StorageError> {
            Ok(format!("https://signed.example/get/{key}"))
        }
    }

    struct Harness {
        pipeline: SummaryPipeline,
        summarizer: Arc<FakeSummarizer>,
        ocr: Arc<FakeOcr>,
        metrics: Arc<SummaryMetrics>,
        temp: TempDir,
    }

    impl Harness {
        fn staged_files(&self) -> usize {
            std::fs::read_dir(self.temp.path())
                .expect("read temp dir")
                .count()
        }

        fn snapshot(&self) -> MetricsSnapshot {
            self.metrics.snapshot()
        }
    }

    fn harness(
        lines: Option<Vec<&'static str>>,
        summarizer: FakeSummarizer,
        storage: Option<Arc<FakeStorage>>,
        delete_after_processing: bool,
    ) -> Harness {
        let temp = TempDir::new().expect("temp dir");
        let summarizer = Arc::new(summarizer);
        let ocr = Arc::new(FakeOcr::default());
        let metrics = Arc::new(SummaryMetrics::default());
        let extractor = TextExtractor::new(
            CloudTextExtractor::new(
                Arc::new(FakeDetector { lines }),
                CloudDetectionSettings::default(),
            ),
            Some(ocr.clone() as Arc<dyn OcrClient>),
            1024 * 1024,
            metrics.clone(),
        );
        let pipeline = SummaryPipeline::new(
            extractor,
            summarizer.clone(),
            storage.map(|storage| storage as Arc<dyn ObjectStorage>),
            metrics.clone(),
            PipelineSettings {
                temp_dir: temp.path().to_path_buf(),
                delete_after_processing,
                ..PipelineSettings::default()
            },
        );
        Harness {
            pipeline,
            summarizer,
            ocr,
            metrics,
            temp,
        }
    }

    fn pdf(bytes: Vec<u8>) -> SummaryInput {
        SummaryInput::Direct(Document::new("upload.pdf", DocumentKind::Pdf, bytes))
    }

    fn always_native(_buffer: &[u8]) -> Classification {
        Classification {
            is_native_text: true,
            char_count: 500,
            word_count: 80,
        }
    }

    fn crashing_classifier(_buffer: &[u8]) -> Classification {
        panic!("classifier blew up")
    }

    #[tokio::test]
    async fn native_pdf_is_summarized_as_a_file() {
        let h = harness(None, FakeSummarizer::default(), None, false);

        let outcome = h
            .pipeline
            .run(pdf(text_pdf(&lorem_words(50))))
            .await
            .expect("summary");

        assert_eq!(outcome.summary, "Summary: Lorem ipsum document.");
        assert_eq!(outcome.source, ExtractionSource::Native);
        let files = h.summarizer.files.lock().unwrap().clone();
        assert_eq!(files.len(), 1);
        assert!(files[0].1, "staged file must exist while summarizing");
        assert_eq!(
            files[0].0.file_name().and_then(|name| name.to_str()),
            Some("upload.pdf")
        );
        assert!(h.summarizer.texts.lock().unwrap().is_empty());
        assert_eq!(h.staged_files(), 0);
        assert_eq!(h.snapshot().native_summaries, 1);
    }

    #[tokio::test]
    async fn scanned_pdf_goes_through_cloud_detection() {
        let h = harness(
            Some(vec!["Hello", "World", "Test"]),
            FakeSummarizer::default(),
            None,
            false,
        );

        let outcome = h.pipeline.run(pdf(image_only_pdf())).await.expect("summary");

        assert_eq!(outcome.summary, "A brief greeting document.");
        assert_eq!(outcome.source, ExtractionSource::CloudTextDetection);
        assert_eq!(
            h.summarizer.texts.lock().unwrap().as_slice(),
            ["Hello\nWorld\nTest".to_string()]
        );
        assert!(h.summarizer.files.lock().unwrap().is_empty());
        assert!(h.ocr.sources.lock().unwrap().is_empty());
        assert_eq!(h.staged_files(), 0);
        assert_eq!(h.snapshot().cloud_summaries, 1);
    }

    #[tokio::test]
    async fn cloud_failure_falls_back_to_ocr() {
        let h = harness(None, FakeSummarizer::default(), None, false);

        let outcome = h.pipeline.run(pdf(image_only_pdf())).await.expect("summary");

        assert_eq!(outcome.source, ExtractionSource::Ocr);
        assert_eq!(
            h.summarizer.texts.lock().unwrap().as_slice(),
            ["ocr words".to_string()]
        );
        let snapshot = h.snapshot();
        assert_eq!(snapshot.ocr_summaries, 1);
        assert_eq!(snapshot.ocr_fallbacks, 1);
    }

    #[tokio::test]
    async fn fallback_is_counted_even_when_summarization_fails() {
        let h = harness(None, FakeSummarizer::failing(), None, false);

        let error = h
            .pipeline
            .run(pdf(image_only_pdf()))
            .await
            .expect_err("forced summarization failure");

        assert!(matches!(error, PipelineError::Summarization(_)));
        assert_eq!(h.ocr.sources.lock().unwrap().len(), 1);
        let snapshot = h.snapshot();
        assert_eq!(snapshot.ocr_fallbacks, 1);
        assert_eq!(snapshot.ocr_summaries, 0);
        assert_eq!(snapshot.failures, 1);
    }

    #[test]
    fn staged_names_follow_the_client_file_name() {
        let name = |file_name: &str, kind| {
            staged_file_name(&Document::new(file_name, kind, vec![1]))
        };

        assert_eq!(name("Lecture 3 (final).pdf", DocumentKind::Pdf), "Lecture_3__final_.pdf");
        assert_eq!(name("deck.PPT", DocumentKind::Presentation), "deck.PPT");
        assert_eq!(name("notes", DocumentKind::Pdf), "notes.pdf");
        assert_eq!(name("../../etc/passwd", DocumentKind::Pdf), ".._.._etc_passwd.pdf");
        assert_eq!(name("   ", DocumentKind::Pdf), "document.pdf");
        assert_eq!(name(&"a".repeat(400), DocumentKind::Pdf).len(), 204);
    }

    #[tokio::test]
    async fn classifier_crash_fails_open_and_cleans_up() {
        let h = harness(None, FakeSummarizer::failing(), None, false);
        let h = Harness {
            pipeline: h.pipeline.with_classifier(crashing_classifier),
            ..h
        };
        let pipeline = &h.pipeline;

        let error = pipeline
            .run(pdf(text_pdf(&lorem_words(50))))
            .await
            .expect_err("forced summarization failure");

        assert!(matches!(error, PipelineError::Summarization(_)));
        assert_eq!(h.ocr.sources.lock().unwrap().len(), 1);
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn extraction_failure_cleans_up() {
        let h = harness(None, FakeSummarizer::default(), None, false);
        let big_scan = vec![0u8; 1024 * 1024 + 1];

        let error = h.pipeline.run(pdf(big_scan)).await.expect_err("exhausted");

        assert!(matches!(error, PipelineError::Extraction(_)));
        let message = error.to_string();
        assert!(message.contains("damaged or unreadable"), "{message}");
        assert!(message.contains("OCR fallback skipped"), "{message}");
        assert_eq!(h.staged_files(), 0);
        assert_eq!(h.snapshot().failures, 1);
    }

    #[tokio::test]
    async fn native_summarization_failure_cleans_up() {
        let h = harness(None, FakeSummarizer::failing(), None, false);
        let h = Harness {
            pipeline: h.pipeline.with_classifier(always_native),
            ..h
        };
        let pipeline = &h.pipeline;

        let error = pipeline
            .run(pdf(b"%PDF-1.4".to_vec()))
            .await
            .expect_err("forced failure");

        assert!(matches!(error, PipelineError::Summarization(_)));
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn placeholder_summaries_are_soft_failures() {
        let summarizer = FakeSummarizer {
            file_reply: Some(NO_SUMMARY_FOUND.into()),
            ..FakeSummarizer::default()
        };
        let h = harness(None, summarizer, None, false);

        let outcome = h
            .pipeline
            .run(pdf(text_pdf(&lorem_words(50))))
            .await
            .expect("placeholder is still a summary");

        assert_eq!(outcome.summary, NO_SUMMARY_FOUND);
        let snapshot = h.snapshot();
        assert_eq!(snapshot.native_summaries, 1);
        assert_eq!(snapshot.soft_failures, 1);
    }

    #[tokio::test]
    async fn stored_documents_are_fetched_and_deleted() {
        let storage = Arc::new(FakeStorage::with_object(
            "uploads/1-scan.pdf",
            image_only_pdf(),
        ));
        let h = harness(None, FakeSummarizer::default(), Some(storage.clone()), true);

        let outcome = h
            .pipeline
            .run(SummaryInput::Stored {
                key: "uploads/1-scan.pdf".into(),
                file_name: None,
                content_type: None,
            })
            .await
            .expect("summary");

        assert_eq!(outcome.source, ExtractionSource::Ocr);
        assert!(matches!(
            &h.ocr.sources.lock().unwrap()[0],
            OcrSource::Url(url) if url == "https://signed.example/get/uploads/1-scan.pdf"
        ));
        assert_eq!(
            storage.deleted.lock().unwrap().as_slice(),
            ["uploads/1-scan.pdf".to_string()]
        );
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn stored_documents_are_kept_without_delete_flag() {
        let storage = Arc::new(FakeStorage::with_object(
            "uploads/1-notes.pdf",
            text_pdf(&lorem_words(50)),
        ));
        let h = harness(None, FakeSummarizer::default(), Some(storage.clone()), false);

        h.pipeline
            .run(SummaryInput::Stored {
                key: "uploads/1-notes.pdf".into(),
                file_name: Some("notes.pdf".into()),
                content_type: Some("application/pdf".into()),
            })
            .await
            .expect("summary");

        assert!(storage.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_input_requires_storage() {
        let h = harness(None, FakeSummarizer::default(), None, false);

        let error = h
            .pipeline
            .run(SummaryInput::Stored {
                key: "uploads/1-a.pdf".into(),
                file_name: None,
                content_type: None,
            })
            .await
            .expect_err("no storage");
        assert!(matches!(error, PipelineError::StorageUnavailable));
    }

    #[tokio::test]
    async fn missing_stored_object_is_a_client_error() {
        let storage = Arc::new(FakeStorage::default());
        let h = harness(None, FakeSummarizer::default(), Some(storage), true);

        let error = h
            .pipeline
            .run(SummaryInput::Stored {
                key: "uploads/missing.pdf".into(),
                file_name: None,
                content_type: None,
            })
            .await
            .expect_err("not found");
        assert!(error.is_client_error(), "{error}");
    }

    #[tokio::test]
    async fn unsupported_stored_type_is_rejected() {
        let storage = Arc::new(FakeStorage::with_object("uploads/1-a.docx", vec![1, 2, 3]));
        let h = harness(None, FakeSummarizer::default(), Some(storage), false);

        let error = h
            .pipeline
            .run(SummaryInput::Stored {
                key: "uploads/1-a.docx".into(),
                file_name: None,
                content_type: None,
            })
            .await
            .expect_err("unsupported");
        assert!(
            matches!(&error, PipelineError::Validation(message) if message == UNSUPPORTED_TYPE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn stored_content_must_match_declared_type() {
        let storage = Arc::new(FakeStorage::with_object(
            "uploads/1-report.pdf",
            b"PK\x03\x04 not a pdf".to_vec(),
        ));
        let h = harness(None, FakeSummarizer::default(), Some(storage), false);

        let error = h
            .pipeline
            .run(SummaryInput::Stored {
                key: "uploads/1-report.pdf".into(),
                file_name: None,
                content_type: Some("application/pdf".into()),
            })
            .await
            .expect_err("mismatched content");

        assert!(
            matches!(&error, PipelineError::Validation(message) if message.contains("declared type")),
            "{error}"
        );
        assert!(h.summarizer.files.lock().unwrap().is_empty());
        assert!(h.ocr.sources.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn direct_upload_limits_are_enforced() {
        let h = harness(None, FakeSummarizer::default(), None, false);

        let too_large = h
            .pipeline
            .run(pdf(vec![0u8; 4_718_593]))
            .await
            .expect_err("too large");
        assert!(matches!(
            too_large,
            PipelineError::PayloadTooLarge { size: 4_718_593, limit: 4_718_592 }
        ));

        let empty = h.pipeline.run(pdf(Vec::new())).await.expect_err("empty");
        assert!(matches!(empty, PipelineError::Validation(_)));
        assert!(h.summarizer.files.lock().unwrap().is_empty());
        assert_eq!(h.snapshot().failures, 2);
    }
}
