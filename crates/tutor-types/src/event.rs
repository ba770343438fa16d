use serde::{Deserialize, Serialize};

use crate::message::RoutingInfo;
use crate::pulse::EmotionTag;
use crate::session::TutorMode;
use crate::{AgentId, MessageId};

/// Which agent or team the learner is currently talking to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActiveTarget {
    /// A single agent picked in manual mode
    Agent { agent_id: AgentId },
    /// The agent team. Team turns use the entry agent's conversation thread.
    Team { mode: TutorMode, entry_agent_id: AgentId },
}

impl ActiveTarget {
    /// Agent id whose conversation thread carries this target's messages
    pub fn conversation_agent_id(&self) -> AgentId {
        match self {
            ActiveTarget::Agent { agent_id } => *agent_id,
            ActiveTarget::Team { entry_agent_id, .. } => *entry_agent_id,
        }
    }
}

/// Events emitted by the tutor orchestration layer.
/// The view layer drains these for reactive updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TutorEvent {
    /// Session bundle fetched and mode/target resolved
    SessionLoaded { mode: TutorMode, agent_count: usize },

    /// Interaction mode changed locally
    ModeChanged { mode: TutorMode },

    /// The active agent or team target changed (None when nothing is selected)
    ActiveTargetChanged { target: Option<ActiveTarget> },

    /// Conversation history for an agent replaced the local thread
    HistoryLoaded { agent_id: AgentId, message_count: usize },

    /// A user turn was inserted optimistically and is awaiting the backend
    SendStarted { agent_id: AgentId, local_id: MessageId },

    /// The backend confirmed a turn
    MessageSent {
        agent_id: AgentId,
        assistant_message_id: MessageId,
        routing: Option<RoutingInfo>,
        contribution_count: usize,
    },

    /// A send failed and the optimistic entry was rolled back
    SendFailed { agent_id: AgentId, message: String },

    /// Typing indicator for the next collaborative contribution
    RevealTyping { message_id: MessageId, agent_display_name: String },

    /// Number of visible contributions of a message changed
    RevealProgress { message_id: MessageId, revealed: usize, total: usize },

    /// All contributions of a message are visible
    RevealComplete { message_id: MessageId },

    /// A reveal was torn down before finishing
    RevealCancelled { message_id: MessageId },

    /// Thread for an agent was cleared
    ConversationCleared { agent_id: AgentId },

    /// A pulse was logged; `refresh_counter` is the new history generation
    PulseLogged { emotion: EmotionTag, refresh_counter: u64 },

    /// Pulse cooldown remaining
    PulseCooldown { remaining_ms: u64 },

    /// Pulse button can be used again
    PulseReady,

    /// A surfaced, user-actionable error
    Error { message: String },
}
