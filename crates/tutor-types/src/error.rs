use thiserror::Error;

use crate::session::TutorMode;
use crate::AgentId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TutorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("No active tutor selected")]
    NoActiveTarget,

    #[error("Operation not allowed in {mode} mode")]
    ModeMismatch { mode: TutorMode },

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("A pulse submission is already in flight")]
    PulseInFlight,

    #[error("Pulse cooldown active, {remaining_ms}ms remaining")]
    PulseCooldown { remaining_ms: u64 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for TutorError {
    fn from(e: serde_json::Error) -> Self {
        TutorError::Serialization(e.to_string())
    }
}
