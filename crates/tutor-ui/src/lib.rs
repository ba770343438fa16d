//! View-state projection for the tutor chat.
//!
//! The host page renders from `ViewState`; nothing here talks to the
//! backend or mutates the orchestrator.

pub mod state;
pub mod thread;
