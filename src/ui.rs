// src/ui.rs
use std::sync::Mutex;

/// Where a run's output and the submit affordance live.
pub trait UiSink: Send + Sync {
    /// Replace the output surface with `text`.
    fn render(&self, text: &str);

    fn set_submit_enabled(&self, enabled: bool);
}

/// Prints rendered text to stdout. Used by the CLI.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl UiSink for TerminalSink {
    fn render(&self, text: &str) {
        println!("{}", text);
    }

    fn set_submit_enabled(&self, enabled: bool) {
        log::debug!("Submit {}", if enabled { "enabled" } else { "disabled" });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Render(String),
    SubmitEnabled(bool),
}

/// Records every call in order.
#[derive(Debug, Default)]
pub struct BufferSink {
    events: Mutex<Vec<UiEvent>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// What the output surface currently shows.
    pub fn output(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            UiEvent::Render(text) => Some(text),
            UiEvent::SubmitEnabled(_) => None,
        })
    }

    pub fn submit_toggles(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::SubmitEnabled(enabled) => Some(enabled),
                UiEvent::Render(_) => None,
            })
            .collect()
    }

    fn push(&self, event: UiEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl UiSink for BufferSink {
    fn render(&self, text: &str) {
        self.push(UiEvent::Render(text.to_string()));
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.push(UiEvent::SubmitEnabled(enabled));
    }
}
