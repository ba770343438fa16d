//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `tutor-core` (pure Rust).
//! Implementations live in `tutor-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use tutor_types::{
    AgentId, Result,
    pulse::{PulseContextType, PulseHistory, PulseSubmission},
    session::{
        Agent, Conversation, ConversationDetail, SendMessageRequest, SendMessageResponse,
        Session, SessionBundle, TutorMode,
    },
};

// ─── Backend Port ────────────────────────────────────────────

/// The tutor backend. One method per remote operation.
#[async_trait(?Send)]
pub trait TutorApiPort {
    /// Session record plus the agents and conversations available to it
    async fn get_session_bundle(&self) -> Result<SessionBundle>;

    async fn set_mode(&self, mode: TutorMode) -> Result<Session>;

    async fn set_active_agent(&self, agent_id: AgentId) -> Result<Session>;

    /// Conversation previews for the sidebar
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    /// Conversation with an agent, including its full message list
    async fn get_conversation(&self, agent_id: AgentId) -> Result<ConversationDetail>;

    async fn clear_conversation(&self, agent_id: AgentId) -> Result<()>;

    /// Send one user turn. The backend creates the conversation lazily.
    async fn send_message(
        &self,
        agent_id: AgentId,
        req: SendMessageRequest,
    ) -> Result<SendMessageResponse>;

    async fn list_agents(&self) -> Result<Vec<Agent>>;

    async fn log_pulse(&self, submission: PulseSubmission) -> Result<()>;

    async fn pulse_history(
        &self,
        context: PulseContextType,
        agent_id: Option<AgentId>,
        limit: u32,
    ) -> Result<PulseHistory>;
}

// ─── Timer Port ──────────────────────────────────────────────

/// Cooperative timer. Dropping the returned future cancels the wait.
#[async_trait(?Send)]
pub trait SleepPort {
    async fn sleep(&self, ms: u64);
}

// ─── Randomness Port ─────────────────────────────────────────

pub trait RandomSource {
    /// Uniform sample in `[0, 1)`
    fn next_unit(&self) -> f64;
}
