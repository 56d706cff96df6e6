//! Summarization pipeline: staging, classification, extraction fallback, and summarization.

mod orchestrator;
mod service;
pub mod types;

pub use orchestrator::{PipelineSettings, SummaryPipeline};
pub use service::{InitError, SummaryApi, SummaryService};
pub use types::{
    PipelineError, Stage, SummaryInput, SummaryOutcome, UploadTicket, UploadUrlRequest,
};
