// src/models.rs
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{IdeError, Result};

/// Body of `POST /problem/run_code`. Built fresh for every run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub language: String,
    pub source: String,
    pub stdin: String,
}

impl RunRequest {
    pub fn new(language: impl Into<String>, source: impl Into<String>, stdin: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            source: source.into(),
            stdin: stdin.into(),
        }
    }
}

/// What a scheduled run hands back: the channel to listen on and the record to clean up.
/// `submission_id` is `None` when the backend answered with the `"none"` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionHandle {
    pub channel: String,
    pub submission_id: Option<String>,
}

/// Raw 2xx reply of `run_code`: either `{error}` or `{channel, submission_id}`.
#[derive(Deserialize, Debug, Default)]
pub struct RunCodeResponse {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub submission_id: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunCodeResponse {
    pub fn into_handle(self) -> Result<SubmissionHandle> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(IdeError::BackendRejection(error));
        }
        let channel = self
            .channel
            .filter(|c| !c.is_empty())
            .ok_or_else(|| IdeError::UnexpectedResponse("run_code reply has no channel".to_string()))?;

        let submission_id = match self.submission_id {
            Some(Value::String(id)) if id != "none" && !id.is_empty() => Some(id),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        Ok(SubmissionHandle { channel, submission_id })
    }
}

/// Body of a non-2xx `run_code` reply.
#[derive(Deserialize, Debug)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Reply of `POST /submission/delete/`.
#[derive(Deserialize, Debug)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// First frame on every event connection.
#[derive(Serialize, Debug)]
pub struct FilterCommand<'a> {
    pub command: &'static str,
    pub filter: [&'a str; 1],
}

impl<'a> FilterCommand<'a> {
    pub fn for_channel(channel: &'a str) -> Self {
        Self {
            command: "set-filter",
            filter: [channel],
        }
    }
}

/// `result.result` of an `on_test_case_ide` event.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    #[serde(default)]
    pub proc_output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time: Option<Value>,
    #[serde(default)]
    pub max_memory: Option<Value>,
}

/// `result` of an `on_test_case_ide2` event. Only the first case is kept; later
/// cases are never decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseReport {
    pub name: Option<String>,
    pub first_case: Option<CaseResult>,
}

impl CaseReport {
    fn from_value(result: &Value) -> Self {
        let first_case = result
            .get("cases")
            .and_then(Value::as_array)
            .and_then(|cases| cases.first())
            .map(|case| lenient(case.clone(), ResultMessage::TEST_CASE_IDE2));

        Self {
            name: result.get("name").and_then(Value::as_str).map(str::to_string),
            first_case,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CaseResult {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub memory: Option<Value>,
}

/// A decoded event from the result channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMessage {
    TestCaseIde(ExecutionResult),
    TestCaseIde2(CaseReport),
    CompileError { log: Option<String> },
    /// Any other `type`; kept only so it can be logged.
    Unrecognized(String),
}

#[derive(Deserialize)]
struct Envelope {
    message: RawMessage,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    msg: Value,
}

impl ResultMessage {
    pub const TEST_CASE_IDE: &'static str = "on_test_case_ide";
    pub const TEST_CASE_IDE2: &'static str = "on_test_case_ide2";
    pub const COMPILE_ERROR: &'static str = "ide-compile-error";

    /// Decode a `{message: {type, ...}}` frame.
    pub fn decode(frame: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(frame)?;
        Ok(Self::from_raw(envelope.message))
    }

    pub fn decode_slice(frame: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(frame)?;
        Ok(Self::from_raw(envelope.message))
    }

    fn from_raw(raw: RawMessage) -> Self {
        match raw.kind.as_str() {
            Self::TEST_CASE_IDE => {
                let inner = raw.result.get("result").cloned().unwrap_or(Value::Null);
                ResultMessage::TestCaseIde(lenient(inner, Self::TEST_CASE_IDE))
            }
            Self::TEST_CASE_IDE2 => ResultMessage::TestCaseIde2(CaseReport::from_value(&raw.result)),
            Self::COMPILE_ERROR => ResultMessage::CompileError {
                log: raw.msg.get("log").and_then(Value::as_str).map(str::to_string),
            },
            _ => ResultMessage::Unrecognized(raw.kind),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ResultMessage::TestCaseIde(_) => Self::TEST_CASE_IDE,
            ResultMessage::TestCaseIde2(_) => Self::TEST_CASE_IDE2,
            ResultMessage::CompileError { .. } => Self::COMPILE_ERROR,
            ResultMessage::Unrecognized(kind) => kind.as_str(),
        }
    }
}

/// Payload shapes drift between judge versions; a malformed body degrades to empty fields.
fn lenient<T: DeserializeOwned + Default>(value: Value, kind: &str) -> T {
    if value.is_null() {
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("⚠️  Malformed {} payload, using empty fields: {}", kind, e);
        T::default()
    })
}
