use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OCR_SPACE_URL: &str = "https://api.ocr.space";
const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Runtime configuration for the docbrief server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key used for every OpenAI request.
    pub openai_api_key: String,
    /// Assistant profile that summarizes uploaded files.
    pub openai_assistant_id: String,
    /// Base URL of the OpenAI REST API.
    pub openai_base_url: String,
    /// Chat model used to summarize extracted text.
    pub openai_model: String,
    /// OCR.space API key; the OCR fallback is disabled when absent.
    pub ocr_space_api_key: Option<String>,
    /// Base URL of the OCR.space API.
    pub ocr_space_url: String,
    /// Largest payload accepted by the OCR fallback.
    pub ocr_max_bytes: usize,
    /// AWS region shared by S3 and Textract.
    pub aws_region: String,
    /// Bucket holding presigned uploads; storage ingestion is disabled when absent.
    pub aws_s3_bucket_name: Option<String>,
    /// Custom endpoint for S3-compatible providers and local stacks.
    pub aws_endpoint_url: Option<String>,
    /// Delete stored objects once a summary request finishes.
    pub delete_after_processing: bool,
    /// Largest file accepted through a direct multipart upload.
    pub direct_upload_max_bytes: usize,
    /// Documents below this size are sent to synchronous text detection.
    pub sync_detection_max_bytes: usize,
    /// Delay between status polls for assistant runs and detection jobs.
    pub poll_interval_ms: u64,
    /// Maximum number of assistant run status polls.
    pub run_poll_attempts: u32,
    /// Maximum number of detection job status polls.
    pub job_poll_attempts: u32,
    /// Lifetime of presigned upload URLs.
    pub upload_url_ttl_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_assistant_id: load_env("OPENAI_ASSISTANT_ID")?,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: load_env_optional("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            ocr_space_api_key: load_env_optional("OCR_SPACE_API_KEY"),
            ocr_space_url: load_env_optional("OCR_SPACE_URL")
                .unwrap_or_else(|| DEFAULT_OCR_SPACE_URL.to_string()),
            ocr_max_bytes: parse_env_or("OCR_MAX_BYTES", 1024 * 1024)?,
            aws_region: load_env_optional("AWS_REGION")
                .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            aws_s3_bucket_name: load_env_optional("AWS_S3_BUCKET_NAME"),
            aws_endpoint_url: load_env_optional("AWS_ENDPOINT_URL"),
            delete_after_processing: load_env_optional("DELETE_AFTER_PROCESSING")
                .map(|value| parse_flag("DELETE_AFTER_PROCESSING", &value))
                .transpose()?
                .unwrap_or(false),
            direct_upload_max_bytes: parse_env_or("DIRECT_UPLOAD_MAX_BYTES", 4_718_592)?,
            sync_detection_max_bytes: parse_env_or("SYNC_DETECTION_MAX_BYTES", 10 * 1024 * 1024)?,
            poll_interval_ms: parse_env_or("POLL_INTERVAL_MS", 2_000)?,
            run_poll_attempts: parse_env_or("RUN_POLL_ATTEMPTS", 30)?,
            job_poll_attempts: parse_env_or("JOB_POLL_ATTEMPTS", 60)?,
            upload_url_ttl_secs: parse_env_or("UPLOAD_URL_TTL_SECS", 600)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        openai_base_url = %config.openai_base_url,
        openai_model = %config.openai_model,
        ocr_enabled = config.ocr_space_api_key.is_some(),
        bucket = ?config.aws_s3_bucket_name,
        region = %config.aws_region,
        delete_after_processing = config.delete_after_processing,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
