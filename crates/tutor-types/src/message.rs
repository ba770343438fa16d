use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{AgentId, ConversationId, MessageId};

/// Author of a message in a tutor conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message as persisted by the backend.
///
/// Routing and synthesis data travel as flat optional columns; the
/// structured forms (`RoutingInfo`, `CollaborativeInfo`) are derived on
/// the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_confidence: Option<f64>,
    /// Raw JSON synthesis blob; see `tutor_core::metadata` for its shapes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesized_from: Option<String>,
}

impl Message {
    pub fn user(
        id: MessageId,
        conversation_id: ConversationId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::bare(id, conversation_id, Role::User, text.into(), created_at)
    }

    pub fn assistant(
        id: MessageId,
        conversation_id: ConversationId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::bare(id, conversation_id, Role::Assistant, text.into(), created_at)
    }

    fn bare(
        id: MessageId,
        conversation_id: ConversationId,
        role: Role,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            role,
            content,
            created_at,
            response_time_ms: None,
            model_used: None,
            tokens_used: None,
            routing_reason: None,
            routing_confidence: None,
            synthesized_from: None,
        }
    }

    /// Age of the message at `now`, in milliseconds. Clock skew that puts
    /// `created_at` in the future yields zero.
    pub fn age_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.created_at).num_milliseconds().max(0) as u64
    }
}

/// Lightweight agent reference used inside routing data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRef {
    pub id: AgentId,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingAlternative {
    pub agent: AgentRef,
    pub score: f64,
}

/// Why the router picked an agent for a turn. Only present in router mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingInfo {
    pub selected_agent: AgentRef,
    pub confidence: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<RoutingAlternative>,
}

/// How the agents of a collaborative turn were combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationStyle {
    #[default]
    Parallel,
    Sequential,
    Debate,
    Random,
}

impl CollaborationStyle {
    pub fn all() -> &'static [CollaborationStyle] {
        &[
            CollaborationStyle::Parallel,
            CollaborationStyle::Sequential,
            CollaborationStyle::Debate,
            CollaborationStyle::Random,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            CollaborationStyle::Parallel => "Parallel",
            CollaborationStyle::Sequential => "Sequential",
            CollaborationStyle::Debate => "Debate",
            CollaborationStyle::Random => "Random",
        }
    }
}

/// One agent's part of a collaborative turn.
///
/// Every field is defaulted, and null counts as missing, so older records
/// still decode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContribution {
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_id: AgentId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contribution: String,
    #[serde(default, deserialize_with = "rounded_millis")]
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timings were written as floats by some producers.
fn rounded_millis<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
    if ms.is_finite() && ms > 0.0 {
        Ok(ms.round() as u64)
    } else {
        Ok(0)
    }
}

impl AgentContribution {
    /// Label shown next to the typing indicator
    pub fn display_label(&self) -> &str {
        if self.agent_display_name.is_empty() {
            &self.agent_name
        } else {
            &self.agent_display_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborativeInfo {
    pub style: CollaborationStyle,
    pub agent_contributions: Vec<AgentContribution>,
}
