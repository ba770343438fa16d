use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{CollaborationStyle, CollaborativeInfo, Message, RoutingInfo};
use crate::{AgentId, ConversationId, SessionId};

/// Interaction mode of a tutor session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorMode {
    /// The learner picks a single agent
    #[default]
    Manual,
    /// The backend routes each turn to the best-fitting agent
    Router,
    /// Several agents answer each turn together
    Collaborative,
    /// The backend picks a random agent per turn
    Random,
}

impl TutorMode {
    pub fn all() -> &'static [TutorMode] {
        &[
            TutorMode::Manual,
            TutorMode::Router,
            TutorMode::Collaborative,
            TutorMode::Random,
        ]
    }

    /// Modes where the learner talks to the team rather than one agent.
    pub fn is_team(&self) -> bool {
        !matches!(self, TutorMode::Manual)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TutorMode::Manual => "manual",
            TutorMode::Router => "router",
            TutorMode::Collaborative => "collaborative",
            TutorMode::Random => "random",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TutorMode::Manual => "Manual",
            TutorMode::Router => "Auto-route",
            TutorMode::Collaborative => "Team",
            TutorMode::Random => "Random",
        }
    }
}

impl fmt::Display for TutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user tutor session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub user_id: i64,
    pub mode: TutorMode,
    #[serde(default)]
    pub active_agent_id: Option<AgentId>,
}

/// A configured tutor persona. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub welcome_message: Option<String>,
    #[serde(default)]
    pub personality: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

/// Sidebar summary of the thread between the session and one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub session_id: SessionId,
    pub agent_id: AgentId,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub last_message_preview: Option<String>,
}

/// A conversation with its full message list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Everything the client needs to bootstrap the tutor view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBundle {
    pub session: Session,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// Course-level override of the session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePolicy {
    #[serde(default)]
    pub forced_mode: Option<TutorMode>,
}

/// Team settings resent with every collaborative turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborativeSettings {
    pub style: CollaborationStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_ids: Option<Vec<AgentId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_agents: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_length: Option<u32>,
}

/// Body of a send-message call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborative_settings: Option<CollaborativeSettings>,
}

/// Backend reply to a send-message call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub assistant_message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_info: Option<RoutingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborative_info: Option<CollaborativeInfo>,
}
