//! Per-message view of the open thread.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tutor_core::store::{ConversationStore, ThreadEntry};
use tutor_types::{
    MessageId,
    message::{AgentContribution, CollaborationStyle, Role, RoutingInfo},
};

use crate::state::ViewState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Still waiting for the backend to confirm
    pub pending: bool,
    pub routing: Option<RoutingInfo>,
    pub collaboration: Option<CollaborationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationView {
    pub style: CollaborationStyle,
    pub total: usize,
    /// Only the contributions revealed so far
    pub contributions: Vec<AgentContribution>,
    pub typing: Option<String>,
}

impl MessageView {
    pub fn project(entry: &ThreadEntry, view: &ViewState) -> Self {
        let id = entry.id();
        let collaboration = entry.collaborative.as_ref().map(|info| {
            let total = info.agent_contributions.len();
            let visible = view.visible_contributions(id, total);
            let animating = view.reveals.get(&id).is_some_and(|r| !r.complete);
            CollaborationView {
                style: info.style,
                total,
                contributions: info.agent_contributions[..visible].to_vec(),
                typing: if animating { view.typing.clone() } else { None },
            }
        });
        Self {
            id,
            role: entry.message.role,
            content: entry.message.content.clone(),
            created_at: entry.message.created_at,
            pending: entry.optimistic || ConversationStore::is_local_id(id),
            routing: entry.routing.clone(),
            collaboration,
        }
    }
}

pub fn project_thread(entries: &[ThreadEntry], view: &ViewState) -> Vec<MessageView> {
    entries.iter().map(|e| MessageView::project(e, view)).collect()
}
