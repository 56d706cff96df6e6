//! Request-scoped document and extraction types.

use bytes::Bytes;
use std::fmt;

/// MIME type of PDF uploads.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
/// MIME type of modern PowerPoint decks.
pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
/// MIME type of legacy PowerPoint decks.
pub const PPT_CONTENT_TYPE: &str = "application/vnd.ms-powerpoint";

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_HEADER_WINDOW: usize = 1024;
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Document families accepted for summarization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// PowerPoint presentation (`.ppt` or `.pptx`).
    Presentation,
}

impl DocumentKind {
    /// Map a MIME type (parameters ignored) onto a supported document kind.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            PDF_CONTENT_TYPE => Some(Self::Pdf),
            PPTX_CONTENT_TYPE | PPT_CONTENT_TYPE => Some(Self::Presentation),
            _ => None,
        }
    }

    /// Map a file name extension onto a supported document kind.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        match file_extension(file_name)?.as_str() {
            "pdf" => Some(Self::Pdf),
            "ppt" | "pptx" => Some(Self::Presentation),
            _ => None,
        }
    }

    /// Resolve the kind from a declared content type, falling back to the file name when the
    /// content type is absent or generic.
    pub fn resolve(content_type: Option<&str>, file_name: &str) -> Option<Self> {
        content_type
            .and_then(Self::from_content_type)
            .or_else(|| Self::from_file_name(file_name))
    }

    /// Whether `bytes` carry the file signature of this kind: `%PDF-` within the first KiB for
    /// PDFs, a ZIP (`.pptx`) or OLE2 (`.ppt`) header for presentations.
    pub fn matches_signature(self, bytes: &[u8]) -> bool {
        match self {
            Self::Pdf => {
                let head = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
                head.windows(PDF_MAGIC.len()).any(|window| window == PDF_MAGIC)
            }
            Self::Presentation => bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC),
        }
    }

    /// Extension used when a document is staged on disk.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Presentation => "pptx",
        }
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

/// An uploaded document held in memory for the duration of one request.
#[derive(Clone, Debug)]
pub struct Document {
    /// Client-supplied file name.
    pub file_name: String,
    /// Detected document family.
    pub kind: DocumentKind,
    /// Raw file contents.
    pub bytes: Bytes,
}

impl Document {
    /// Wrap an uploaded buffer.
    pub fn new(file_name: impl Into<String>, kind: DocumentKind, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            bytes: bytes.into(),
        }
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Extension used when staging the document, preferring the one the client sent.
    pub fn staging_extension(&self) -> String {
        match file_extension(&self.file_name) {
            Some(extension) if Self::kind_matches(self.kind, &extension) => extension,
            _ => self.kind.default_extension().to_string(),
        }
    }

    fn kind_matches(kind: DocumentKind, extension: &str) -> bool {
        matches!(
            (kind, extension),
            (DocumentKind::Pdf, "pdf") | (DocumentKind::Presentation, "ppt" | "pptx")
        )
    }
}

/// Which extraction strategy produced the text handed to the summarizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// PDF text layer; the file itself is summarized.
    Native,
    /// Third-party OCR service.
    Ocr,
    /// Managed cloud text detection.
    CloudTextDetection,
}

impl ExtractionSource {
    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ocr => "ocr",
            Self::CloudTextDetection => "cloud_text_detection",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text recovered from a document together with its provenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Extracted plain text.
    pub text: String,
    /// Strategy that produced the text.
    pub source: ExtractionSource,
    /// Number of characters extracted.
    pub char_count: usize,
}

impl ExtractionResult {
    /// Build a result, counting characters rather than bytes.
    pub fn new(text: String, source: ExtractionSource) -> Self {
        let char_count = text.chars().count();
        Self {
            text,
            source,
            char_count,
        }
    }

    /// Whether the extraction yielded nothing worth summarizing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
