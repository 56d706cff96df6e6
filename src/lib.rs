#![deny(missing_docs)]

//! Core library for the docbrief document summarization service.

/// HTTP routing and REST handlers.
pub mod api;
/// Text-layer classification of uploaded documents.
pub mod classifier;
/// Environment-driven configuration management.
pub mod config;
/// Document and extraction result types.
pub mod document;
/// Cloud text detection and OCR extractors.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization metrics helpers.
pub mod metrics;
/// Request orchestration from upload to summary.
pub mod pipeline;
/// Bounded polling shared by long-running provider jobs.
pub mod polling;
/// Object storage for presigned uploads.
pub mod storage;
/// Summarization provider abstraction and the OpenAI client.
pub mod summarization;

#[cfg(test)]
mod test_support;
