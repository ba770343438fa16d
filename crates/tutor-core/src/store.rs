//! Per-agent conversation threads held on the client.
//!
//! Threads are keyed by agent id so a reply that lands after the learner
//! switched away still reconciles into the thread it was sent to.
//! Optimistic entries use negative ids; backend ids are always positive.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tutor_types::{
    AgentId, MessageId,
    message::{CollaborativeInfo, Message, RoutingInfo},
    session::Conversation,
};

use crate::metadata;

/// A message plus the structured data derived from it on the client
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadEntry {
    pub message: Message,
    pub routing: Option<RoutingInfo>,
    pub collaborative: Option<CollaborativeInfo>,
    /// True until the backend confirms (or rejects) the turn
    pub optimistic: bool,
}

impl ThreadEntry {
    pub fn confirmed(message: Message) -> Self {
        Self {
            message,
            routing: None,
            collaborative: None,
            optimistic: false,
        }
    }

    /// Entry for a stored message, decoding its synthesis blob if present.
    pub fn from_history(message: Message) -> Self {
        let collaborative = metadata::decode_message(&message);
        Self {
            message,
            routing: None,
            collaborative,
            optimistic: false,
        }
    }

    pub fn id(&self) -> MessageId {
        self.message.id
    }
}

pub struct ConversationStore {
    threads: HashMap<AgentId, Vec<ThreadEntry>>,
    previews: Vec<Conversation>,
    displayed: Option<AgentId>,
    next_local_id: MessageId,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            threads: HashMap::new(),
            previews: Vec::new(),
            displayed: None,
            next_local_id: -1,
        }
    }

    pub fn is_local_id(id: MessageId) -> bool {
        id < 0
    }

    /// Agent whose thread the view currently shows
    pub fn displayed(&self) -> Option<AgentId> {
        self.displayed
    }

    pub fn set_displayed(&mut self, agent_id: Option<AgentId>) {
        self.displayed = agent_id;
    }

    pub fn messages(&self, agent_id: AgentId) -> &[ThreadEntry] {
        self.threads.get(&agent_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn displayed_messages(&self) -> &[ThreadEntry] {
        match self.displayed {
            Some(agent_id) => self.messages(agent_id),
            None => &[],
        }
    }

    pub fn previews(&self) -> &[Conversation] {
        &self.previews
    }

    pub fn preview_for(&self, agent_id: AgentId) -> Option<&Conversation> {
        self.previews.iter().find(|c| c.agent_id == agent_id)
    }

    pub fn set_previews(&mut self, previews: Vec<Conversation>) {
        self.previews = previews;
    }

    // ─── Mutation (dispatcher and history load only) ─────────

    /// Append a provisional user message and return its local id.
    pub(crate) fn insert_optimistic(
        &mut self,
        agent_id: AgentId,
        text: &str,
        now: DateTime<Utc>,
    ) -> MessageId {
        let local_id = self.next_local_id;
        self.next_local_id -= 1;

        let conversation_id = self.preview_for(agent_id).map(|c| c.id).unwrap_or(0);
        let entry = ThreadEntry {
            message: Message::user(local_id, conversation_id, text, now),
            routing: None,
            collaborative: None,
            optimistic: true,
        };
        self.threads.entry(agent_id).or_default().push(entry);
        local_id
    }

    /// Append the confirmed pair for a turn. Ids already present (a history
    /// reload raced the reply) are not duplicated.
    pub(crate) fn confirm(&mut self, agent_id: AgentId, user: ThreadEntry, assistant: ThreadEntry) {
        let thread = self.threads.entry(agent_id).or_default();
        for entry in [user, assistant] {
            if !thread.iter().any(|e| e.id() == entry.id()) {
                thread.push(entry);
            }
        }
    }

    /// Remove a provisional entry. Returns whether it was still present.
    pub(crate) fn remove_optimistic(&mut self, agent_id: AgentId, local_id: MessageId) -> bool {
        let Some(thread) = self.threads.get_mut(&agent_id) else {
            return false;
        };
        let before = thread.len();
        thread.retain(|e| !(e.optimistic && e.id() == local_id));
        thread.len() != before
    }

    /// Replace a thread with server history, keeping provisional entries
    /// that are still awaiting their reply after the confirmed messages.
    pub(crate) fn load_history(&mut self, agent_id: AgentId, mut history: Vec<Message>) -> usize {
        history.sort_by_key(|m| m.created_at);
        let pending: Vec<ThreadEntry> = self
            .messages(agent_id)
            .iter()
            .filter(|e| e.optimistic)
            .cloned()
            .collect();

        let mut thread: Vec<ThreadEntry> =
            history.into_iter().map(ThreadEntry::from_history).collect();
        let confirmed = thread.len();
        thread.extend(pending);
        self.threads.insert(agent_id, thread);
        confirmed
    }

    pub(crate) fn clear(&mut self, agent_id: AgentId) {
        self.threads.remove(&agent_id);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
