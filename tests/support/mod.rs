//! PDF fixtures and request builders shared by integration tests.

use axum::body::Body;
use axum::http::{Method, Request};

#[path = "../../src/test_support.rs"]
mod fixtures;

pub(crate) use fixtures::{image_only_pdf, lorem_words, text_pdf};

const BOUNDARY: &str = "docbrief-integration";

/// `POST /summarize` with a single multipart `file` part.
pub fn upload_request(file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/summarize")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}
