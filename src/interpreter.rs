// src/interpreter.rs
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

use crate::models::{CaseReport, ExecutionResult, ResultMessage};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalKind {
    Success,
    CompileError,
    ConnectionError,
    RequestError,
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalKind::Success => write!(f, "success"),
            TerminalKind::CompileError => write!(f, "compile_error"),
            TerminalKind::ConnectionError => write!(f, "connection_error"),
            TerminalKind::RequestError => write!(f, "request_error"),
        }
    }
}

/// The single piece of text a run leaves on the output surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOutcome {
    pub kind: TerminalKind,
    pub text: String,
}

impl TerminalOutcome {
    pub fn new(kind: TerminalKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn request_error(message: &str) -> Self {
        Self::new(TerminalKind::RequestError, format!("Error: {}", message))
    }

    pub fn connection_error() -> Self {
        Self::new(TerminalKind::ConnectionError, "WebSocket connection error.")
    }

    pub fn connection_closed() -> Self {
        Self::new(
            TerminalKind::ConnectionError,
            "WebSocket connection closed before a result arrived.",
        )
    }

    pub fn timed_out() -> Self {
        Self::new(TerminalKind::ConnectionError, "Timed out waiting for a result.")
    }
}

/// Verdict on one channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Not a result; keep listening.
    Continue,
    Terminal(TerminalOutcome),
}

impl Interpretation {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Interpretation::Terminal(_))
    }

    pub fn rendered_text(&self) -> Option<&str> {
        match self {
            Interpretation::Continue => None,
            Interpretation::Terminal(outcome) => Some(outcome.text.as_str()),
        }
    }
}

/// Map a channel message to what the output surface should show. Pure.
pub fn interpret(message: &ResultMessage) -> Interpretation {
    let outcome = match message {
        ResultMessage::TestCaseIde(result) => render_execution(result),
        ResultMessage::TestCaseIde2(report) => render_case_report(report),
        ResultMessage::CompileError { log } => {
            let log = log.as_deref().unwrap_or("Unknown Compile Error!");
            TerminalOutcome::new(
                TerminalKind::CompileError,
                format!("Compile Error:\n{}", strip_ansi(log)),
            )
        }
        ResultMessage::Unrecognized(_) => return Interpretation::Continue,
    };
    Interpretation::Terminal(outcome)
}

fn render_execution(result: &ExecutionResult) -> TerminalOutcome {
    let mut text = result.proc_output.clone().unwrap_or_default();
    if let Some(error) = result.error.as_deref().filter(|e| !e.is_empty()) {
        text.push_str("\nError: ");
        text.push_str(error);
    }
    text.push_str(&format!("\nElapsed Time: {}s", metric(&result.execution_time)));
    text.push_str(&format!("\nMemory Usage: {} KB", metric(&result.max_memory)));
    TerminalOutcome::new(TerminalKind::Success, text)
}

/// Only the first case is shown: the IDE runs a single custom input.
fn render_case_report(report: &CaseReport) -> TerminalOutcome {
    let first = match (report.name.as_deref(), report.first_case.as_ref()) {
        (Some("test-case-status"), Some(first)) => first,
        _ => return TerminalOutcome::new(TerminalKind::CompileError, "Compile Error!"),
    };

    let mut text = first.output.clone().unwrap_or_default();
    text.push_str(&format!("\nElapsed Time: {}s", metric(&first.time)));
    text.push_str(&format!("\nMemory Usage: {} KB", metric(&first.memory)));
    TerminalOutcome::new(TerminalKind::Success, text)
}

/// Numbers are printed as the judge sent them.
fn metric(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

static SGR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid SGR regex"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid newline regex"));

/// Clean a raw compiler log for display: drop colour codes, line-clear codes and
/// carriage returns, then squeeze blank lines.
pub fn strip_ansi(log: &str) -> String {
    let without_color = SGR.replace_all(log, "");
    let cleaned = without_color.replace("\x1b[K", "").replace('\r', "");
    BLANK_RUNS.replace_all(&cleaned, "\n").into_owned()
}
