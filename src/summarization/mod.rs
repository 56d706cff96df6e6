//! Abstractive summarization backed by a conversational AI service.
//!
//! Two contracts are exposed through [`Summarizer`]: whole-file summarization for PDFs with a
//! readable text layer, and plain-text summarization for content recovered by an extractor.
//! Providers signal "no answer" with placeholder strings rather than errors; callers can detect
//! those with [`is_placeholder`].

pub mod openai;

pub use openai::{OpenAiSettings, OpenAiSummarizer};

use async_trait::async_trait;
use reqwest::StatusCode;
use std::borrow::Cow;
use std::path::Path;
use thiserror::Error;

/// Largest number of characters forwarded to the text summarizer.
pub const MAX_TEXT_CHARS: usize = 50_000;
/// Appended to text that was cut at [`MAX_TEXT_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated ...]";
/// Returned when an assistant run completes without an assistant message.
pub const NO_SUMMARY_FOUND: &str = "No summary found";
/// Returned when a chat completion carries no content.
pub const NO_SUMMARY_GENERATED: &str = "No summary generated";

/// Errors surfaced while generating a summary.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// HTTP layer failed before receiving a response.
    #[error("Summarization request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("Summarization provider returned {status} for {operation}: {body}")]
    UnexpectedStatus {
        /// Provider operation that failed, e.g. `file upload`.
        operation: &'static str,
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Assistant run was still pending when the polling budget ran out.
    #[error("Assistant run did not complete after {attempts} status checks (last status: {status})")]
    RunTimedOut {
        /// Number of status polls issued.
        attempts: u32,
        /// Last status reported by the provider.
        status: String,
    },
    /// Assistant run reached a terminal status other than `completed`.
    #[error("Assistant run ended with status {status}: {detail}")]
    RunFailed {
        /// Terminal status reported by the provider.
        status: String,
        /// Provider error detail, when available.
        detail: String,
    },
    /// Staged file could not be read.
    #[error("Failed to read staged document: {0}")]
    Io(#[from] std::io::Error),
}

impl SummarizeError {
    /// Whether the failure came from an exhausted polling budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RunTimedOut { .. })
    }
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a document file as a whole.
    async fn summarize_file(&self, path: &Path) -> Result<String, SummarizeError>;

    /// Summarize extracted plain text.
    async fn summarize_text(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Cut `text` to `max_chars` characters, appending [`TRUNCATION_MARKER`] when anything was cut.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut])),
    }
}

/// Whether `summary` is one of the provider "no answer" placeholders.
pub fn is_placeholder(summary: &str) -> bool {
    summary == NO_SUMMARY_FOUND || summary == NO_SUMMARY_GENERATED
}
