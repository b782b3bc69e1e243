//! UI/backend events and error modeling for desktop GUI controller.

use shared::domain::{CounterEvent, CounterSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Ready(CounterSnapshot),
    Counter(CounterEvent),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Command,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Startup failures leave no worker behind, so every command is dead.
    pub fn is_fatal(&self) -> bool {
        self.context == UiErrorContext::BackendStartup
    }
}
