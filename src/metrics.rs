use crate::document::ExtractionSource;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    native_summaries: AtomicU64,
    cloud_summaries: AtomicU64,
    ocr_summaries: AtomicU64,
    ocr_fallbacks: AtomicU64,
    soft_failures: AtomicU64,
    failures: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed summary and the extraction path that produced its input.
    pub fn record_summary(&self, source: ExtractionSource) {
        let counter = match source {
            ExtractionSource::Native => &self.native_summaries,
            ExtractionSource::CloudTextDetection => &self.cloud_summaries,
            ExtractionSource::Ocr => &self.ocr_summaries,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that cloud detection failed and the OCR fallback was attempted.
    pub fn record_ocr_fallback(&self) {
        self.ocr_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary that came back as a provider placeholder.
    pub fn record_soft_failure(&self) {
        self.soft_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that ended in the failed state.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            native_summaries: self.native_summaries.load(Ordering::Relaxed),
            cloud_summaries: self.cloud_summaries.load(Ordering::Relaxed),
            ocr_summaries: self.ocr_summaries.load(Ordering::Relaxed),
            ocr_fallbacks: self.ocr_fallbacks.load(Ordering::Relaxed),
            soft_failures: self.soft_failures.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Summaries produced from natively extractable documents.
    pub native_summaries: u64,
    /// Summaries produced from cloud text detection output.
    pub cloud_summaries: u64,
    /// Summaries produced from OCR output.
    pub ocr_summaries: u64,
    /// Requests where cloud detection failed and OCR was attempted, whatever the outcome.
    pub ocr_fallbacks: u64,
    /// Summaries that were provider placeholders rather than real content.
    pub soft_failures: u64,
    /// Requests that failed outright.
    pub failures: u64,
}
