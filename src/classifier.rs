//! Text extractability classifier.
//!
//! Decides whether a document carries a usable text layer or is an image-only scan that needs
//! OCR or cloud text detection. Parsing failures are never surfaced: anything the PDF parser
//! cannot read is routed to the extraction path.

use lopdf::Document as PdfDocument;
use thiserror::Error;

/// Minimum number of characters a native text layer must exceed.
pub const MIN_NATIVE_CHARS: usize = 100;
/// Minimum number of words a native text layer must exceed.
pub const MIN_NATIVE_WORDS: usize = 20;

/// Errors raised while reading the PDF text layer.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The buffer is not a PDF the parser understands.
    #[error("failed to parse PDF: {0}")]
    Parse(String),
}

/// Verdict of the classifier along with the counts that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Whether the document can be summarized from its own text layer.
    pub is_native_text: bool,
    /// Characters found in the trimmed text layer.
    pub char_count: usize,
    /// Whitespace-separated words found in the text layer.
    pub word_count: usize,
}

impl Classification {
    /// Verdict used when the text layer could not be read at all.
    pub const fn unreadable() -> Self {
        Self {
            is_native_text: false,
            char_count: 0,
            word_count: 0,
        }
    }
}

/// Signature shared by the production classifier and test doubles.
pub type Classifier = fn(&[u8]) -> Classification;

/// Classify a document buffer, treating parser errors as "not native".
pub fn classify(buffer: &[u8]) -> Classification {
    match extract_text_layer(buffer) {
        Ok(text) => judge_text(&text),
        Err(error) => {
            tracing::debug!(error = %error, bytes = buffer.len(), "Text layer unreadable");
            Classification::unreadable()
        }
    }
}

/// Apply the character and word thresholds to an extracted text layer.
pub fn judge_text(text: &str) -> Classification {
    let cleaned = text.trim();
    let char_count = cleaned.chars().count();
    let word_count = cleaned.split_whitespace().count();
    Classification {
        is_native_text: char_count > MIN_NATIVE_CHARS && word_count > MIN_NATIVE_WORDS,
        char_count,
        word_count,
    }
}

/// Read the text layer of every page, in page order.
///
/// Pages whose content streams cannot be decoded are skipped rather than failing the document.
pub fn extract_text_layer(buffer: &[u8]) -> Result<String, ClassifyError> {
    let document =
        PdfDocument::load_mem(buffer).map_err(|error| ClassifyError::Parse(error.to_string()))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pages.push(trimmed.to_string());
                }
            }
            Err(error) => {
                tracing::trace!(page = page_number, error = %error, "Skipping unreadable page");
            }
        }
    }

    Ok(pages.join("\n"))
}
