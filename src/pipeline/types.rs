//! Request, outcome, and error types for the summarization pipeline.

use crate::document::{Document, ExtractionSource};
use crate::extraction::ExtractionError;
use crate::storage::StorageError;
use crate::summarization::SummarizeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message returned when a document type is not accepted.
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Only PDF and PowerPoint files are supported";

/// Lifecycle stage of a single summarization request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Document accepted and being staged.
    Received,
    /// Deciding whether the text layer is usable.
    Classifying,
    /// Summarizing the file as a whole.
    NativeSummarizing,
    /// Recovering text from a scanned document.
    Extracting,
    /// Summarizing extracted text.
    Summarizing,
    /// Summary produced.
    Done,
    /// Request failed.
    Failed,
}

impl Stage {
    /// Stable label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Classifying => "classifying",
            Self::NativeSummarizing => "native_summarizing",
            Self::Extracting => "extracting",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the pipeline reads the document from.
#[derive(Clone, Debug)]
pub enum SummaryInput {
    /// Bytes uploaded directly with the request.
    Direct(Document),
    /// Object previously uploaded through a presigned URL.
    Stored {
        /// Object storage key.
        key: String,
        /// Client file name; defaults to the last key segment.
        file_name: Option<String>,
        /// Declared MIME type; the file name extension is used when absent.
        content_type: Option<String>,
    },
}

impl SummaryInput {
    /// Object storage key, for stored inputs.
    pub fn stored_key(&self) -> Option<&str> {
        match self {
            Self::Direct(_) => None,
            Self::Stored { key, .. } => Some(key),
        }
    }
}

/// Result of a successful summarization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Final summary, possibly a provider placeholder.
    pub summary: String,
    /// Path that produced the summary input.
    pub source: ExtractionSource,
}

/// Client request for a presigned upload URL.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    /// Name of the file about to be uploaded.
    pub file_name: String,
    /// MIME type of the file about to be uploaded.
    pub file_type: String,
    /// Size in bytes of the file about to be uploaded.
    pub file_size: u64,
}

/// Presigned upload details handed back to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    /// URL the client `PUT`s the file to.
    pub upload_url: String,
    /// Key to pass back to `/summarize`.
    pub file_key: String,
    /// Public location of the object once uploaded.
    pub file_url: String,
}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request was malformed or referenced an unsupported document.
    #[error("{0}")]
    Validation(String),
    /// Direct upload exceeded the configured limit.
    #[error(
        "File of {size} bytes exceeds the {limit}-byte upload limit; use a presigned upload instead"
    )]
    PayloadTooLarge {
        /// Size of the rejected upload.
        size: usize,
        /// Configured direct upload limit.
        limit: usize,
    },
    /// Stored input was requested but no bucket is configured.
    #[error("Object storage is not configured")]
    StorageUnavailable,
    /// Object storage call failed.
    #[error("Failed to access stored document: {0}")]
    Storage(#[from] StorageError),
    /// Document could not be staged to a temporary file.
    #[error("Failed to stage document: {0}")]
    Staging(#[from] std::io::Error),
    /// No extractor produced text.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Summarization provider failed.
    #[error("Failed to summarize document: {0}")]
    Summarization(#[from] SummarizeError),
}

impl PipelineError {
    /// Whether the failure came from an exhausted polling budget.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Extraction(error) => error.is_timeout(),
            Self::Summarization(error) => error.is_timeout(),
            _ => false,
        }
    }

    /// Whether the caller, rather than a provider, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::PayloadTooLarge { .. }
                | Self::Storage(StorageError::NotFound(_))
        )
    }
}
