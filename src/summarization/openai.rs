//! OpenAI client covering the Assistants v2 file flow and chat completions.

use super::{
    MAX_TEXT_CHARS, NO_SUMMARY_FOUND, NO_SUMMARY_GENERATED, SummarizeError, Summarizer,
    truncate_for_prompt,
};
use crate::polling::{PollPolicy, Polled};
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;

const FILE_INSTRUCTION: &str = "Please summarize the uploaded file, highlighting the key points, main topics and important details.";
const TEXT_SYSTEM_PROMPT: &str = "You are an expert document summarizer. Produce a comprehensive summary of the document provided by the user, covering its key points, main topics and important details. Use clear structure and plain language.";
const MAX_COMPLETION_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.3;

/// Connection and polling settings for [`OpenAiSummarizer`].
#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    /// API root, without the `/v1` suffix.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Assistant used for whole-file summaries.
    pub assistant_id: String,
    /// Chat model used for text summaries.
    pub model: String,
    /// Run status polling schedule.
    pub poll: PollPolicy,
}

/// OpenAI-backed [`Summarizer`].
pub struct OpenAiSummarizer {
    http: Client,
    settings: OpenAiSettings,
}

impl OpenAiSummarizer {
    /// Build a client; fails only if the HTTP stack cannot be initialized.
    pub fn new(settings: OpenAiSettings) -> Result<Self, SummarizeError> {
        let http = Client::builder().user_agent("docbrief/summary").build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1/{path}",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.get(self.endpoint(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http.post(self.endpoint(path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.settings.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn upload_file(&self, path: &Path) -> Result<String, SummarizeError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(file_name));
        let file: IdObject = send(self.post("files").multipart(form), "file upload").await?;
        Ok(file.id)
    }

    async fn wait_for_run(&self, thread_id: &str, run: RunObject) -> Result<(), SummarizeError> {
        let path = format!("threads/{thread_id}/runs/{}", run.id);
        let polled = self
            .settings
            .poll
            .poll(run, |run| is_pending(&run.status), |attempt| {
                let request = self.get(&path);
                async move {
                    let run: RunObject = send(request, "run status").await?;
                    tracing::debug!(run_id = %run.id, attempt, status = %run.status, "Polled assistant run");
                    Ok::<_, SummarizeError>(run)
                }
            })
            .await?;

        let run = match polled {
            Polled::Settled { attempts, value } if value.status == "completed" => {
                tracing::info!(run_id = %value.id, attempts, "Assistant run completed");
                return Ok(());
            }
            Polled::Settled { value, .. } => value,
            Polled::Exhausted { attempts, last } => {
                return Err(SummarizeError::RunTimedOut {
                    attempts,
                    status: last.status,
                });
            }
        };
        let detail = run
            .last_error
            .map(|error| format!("{}: {}", error.code, error.message))
            .unwrap_or_else(|| "no error detail".to_string());
        Err(SummarizeError::RunFailed {
            status: run.status,
            detail,
        })
    }
}

fn is_pending(status: &str) -> bool {
    matches!(status, "queued" | "in_progress")
}

async fn send<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &'static str,
) -> Result<T, SummarizeError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SummarizeError::UnexpectedStatus {
            operation,
            status,
            body,
        });
    }
    response.json().await.map_err(|error| {
        SummarizeError::InvalidResponse(format!("failed to decode {operation} response: {error}"))
    })
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize_file(&self, path: &Path) -> Result<String, SummarizeError> {
        let file_id = self.upload_file(path).await?;
        tracing::debug!(file_id = %file_id, "Uploaded document to assistant storage");

        let thread: IdObject =
            send(self.post("threads").json(&json!({})), "thread creation").await?;
        let _: IdObject = send(
            self.post(&format!("threads/{}/messages", thread.id))
                .json(&json!({
                    "role": "user",
                    "content": FILE_INSTRUCTION,
                    "attachments": [{
                        "file_id": file_id,
                        "tools": [{ "type": "file_search" }],
                    }],
                })),
            "message creation",
        )
        .await?;

        let run: RunObject = send(
            self.post(&format!("threads/{}/runs", thread.id))
                .json(&json!({ "assistant_id": self.settings.assistant_id })),
            "run creation",
        )
        .await?;
        self.wait_for_run(&thread.id, run).await?;

        let messages: MessageList = send(
            self.get(&format!("threads/{}/messages", thread.id)),
            "message listing",
        )
        .await?;
        let summary = messages
            .data
            .into_iter()
            .find(|message| message.role == "assistant")
            .and_then(|message| message.content.into_iter().next())
            .and_then(|content| content.text)
            .map(|text| text.value)
            .filter(|value| !value.is_empty());

        Ok(summary.unwrap_or_else(|| NO_SUMMARY_FOUND.to_string()))
    }

    async fn summarize_text(&self, text: &str) -> Result<String, SummarizeError> {
        let prompt = truncate_for_prompt(text, MAX_TEXT_CHARS);
        let payload = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": TEXT_SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": TEMPERATURE,
        });

        let completion: ChatCompletion = send(
            self.post("chat/completions").json(&payload),
            "chat completion",
        )
        .await?;
        let summary = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        Ok(summary.unwrap_or_else(|| NO_SUMMARY_GENERATED.to_string()))
    }
}
