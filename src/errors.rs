// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdeError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx reply from `run_code`; `detail` comes from the response body.
    #[error("Execution request failed with status {status}: {detail}")]
    ExecutionRequest { status: u16, detail: String },

    /// The backend answered 2xx but refused to schedule the run.
    #[error("Backend rejected the run: {0}")]
    BackendRejection(String),

    #[error("Unexpected response structure: {0}")]
    UnexpectedResponse(String),

    #[error("WebSocket connection error: {0}")]
    Connection(String),

    #[error("Failed to delete submission: {0}")]
    Cleanup(String),

    #[error("Grading submission failed with status {status}: {body}")]
    Grading { status: u16, body: String },

    #[error("Language '{0}' cannot be used here")]
    UnsupportedLanguage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl IdeError {
    /// The text shown to the user after `"Error: "`.
    pub fn user_message(&self) -> String {
        match self {
            IdeError::ExecutionRequest { detail, .. } => detail.clone(),
            IdeError::BackendRejection(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IdeError>;
