use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AgentId;

/// Mood signal a learner can send during a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Productive,
    Stimulated,
    Frustrated,
    Learning,
    Enjoying,
    Bored,
    Quitting,
}

impl EmotionTag {
    pub fn label(&self) -> &str {
        match self {
            EmotionTag::Productive => "Productive",
            EmotionTag::Stimulated => "Stimulated",
            EmotionTag::Frustrated => "Frustrated",
            EmotionTag::Learning => "Learning",
            EmotionTag::Enjoying => "Enjoying",
            EmotionTag::Bored => "Bored",
            EmotionTag::Quitting => "Ready to quit",
        }
    }
}

/// Where in the platform a pulse was given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseContextType {
    TutorConversation,
    Course,
    Module,
}

impl PulseContextType {
    /// Wire name, as used in query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            PulseContextType::TutorConversation => "tutor_conversation",
            PulseContextType::Course => "course",
            PulseContextType::Module => "module",
        }
    }
}

/// What a pulse refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseContext {
    pub context: PulseContextType,
    pub context_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
}

impl PulseContext {
    pub fn conversation(conversation_id: i64, agent_id: Option<AgentId>) -> Self {
        Self {
            context: PulseContextType::TutorConversation,
            context_id: conversation_id,
            agent_id,
        }
    }
}

/// Body of a log-pulse call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseSubmission {
    pub emotion: EmotionTag,
    #[serde(flatten)]
    pub context: PulseContext,
}

/// A logged pulse. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalPulse {
    pub id: i64,
    pub emotion: EmotionTag,
    pub context: PulseContextType,
    pub context_id: i64,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseHistory {
    #[serde(default)]
    pub pulses: Vec<EmotionalPulse>,
    #[serde(default)]
    pub total: u32,
}
