//! Message dispatcher — sends one user turn with an optimistic local echo.
//!
//! The provisional entry is owned by an `OptimisticEntry` guard that removes
//! it on drop, so it disappears on success, on failure, and when the send
//! future itself is dropped mid-flight. Reconciliation is keyed by the agent
//! id captured at dispatch time, never by whatever thread is displayed when
//! the reply lands.

use std::cell::{Cell, RefCell};

use chrono::{DateTime, Utc};
use tutor_types::{
    AgentId, MessageId, Result, TutorError,
    event::TutorEvent,
    session::{CollaborativeSettings, SendMessageRequest, SendMessageResponse, TutorMode},
};

use crate::event_bus::EventBus;
use crate::metadata;
use crate::ports::TutorApiPort;
use crate::store::{ConversationStore, ThreadEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub agent_id: AgentId,
    pub text: String,
    /// Mode the turn is sent in; decides which derived data is attached
    pub mode: TutorMode,
    pub settings: Option<CollaborativeSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub agent_id: AgentId,
    pub local_id: MessageId,
    pub user: ThreadEntry,
    pub assistant: ThreadEntry,
}

struct OptimisticEntry<'a> {
    store: &'a RefCell<ConversationStore>,
    agent_id: AgentId,
    local_id: MessageId,
}

impl<'a> OptimisticEntry<'a> {
    fn insert(
        store: &'a RefCell<ConversationStore>,
        agent_id: AgentId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let local_id = store.borrow_mut().insert_optimistic(agent_id, text, now);
        Self { store, agent_id, local_id }
    }
}

impl Drop for OptimisticEntry<'_> {
    fn drop(&mut self) {
        self.store
            .borrow_mut()
            .remove_optimistic(self.agent_id, self.local_id);
    }
}

/// Counts a send as in flight until dropped.
struct InFlight<'a>(&'a Cell<usize>);

impl<'a> InFlight<'a> {
    fn enter(count: &'a Cell<usize>) -> Self {
        count.set(count.get() + 1);
        Self(count)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

pub struct MessageDispatcher {
    bus: EventBus,
    in_flight: Cell<usize>,
}

impl MessageDispatcher {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            in_flight: Cell::new(0),
        }
    }

    /// Number of sends awaiting the backend. The view disables its send
    /// action while this is non-zero; the dispatcher itself does not queue.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub async fn send(
        &self,
        store: &RefCell<ConversationStore>,
        api: &dyn TutorApiPort,
        req: DispatchRequest,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome> {
        let text = req.text.trim();
        if text.is_empty() {
            return Err(TutorError::EmptyMessage);
        }
        let agent_id = req.agent_id;

        let pending = OptimisticEntry::insert(store, agent_id, text, now);
        let local_id = pending.local_id;
        self.bus.emit(TutorEvent::SendStarted { agent_id, local_id });

        let body = SendMessageRequest {
            message: text.to_string(),
            collaborative_settings: req
                .settings
                .filter(|_| req.mode == TutorMode::Collaborative),
        };

        let flight = InFlight::enter(&self.in_flight);
        let result = api.send_message(agent_id, body).await;
        drop(flight);

        match result {
            Ok(resp) => {
                let (user, assistant) = confirmed_entries(resp, req.mode);
                store
                    .borrow_mut()
                    .confirm(agent_id, user.clone(), assistant.clone());
                drop(pending);

                self.bus.emit(TutorEvent::MessageSent {
                    agent_id,
                    assistant_message_id: assistant.id(),
                    routing: assistant.routing.clone(),
                    contribution_count: assistant
                        .collaborative
                        .as_ref()
                        .map_or(0, |c| c.agent_contributions.len()),
                });
                Ok(DispatchOutcome { agent_id, local_id, user, assistant })
            }
            Err(e) => {
                drop(pending);
                log::error!("Send to agent {} failed: {}", agent_id, e);
                self.bus.emit(TutorEvent::SendFailed {
                    agent_id,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

/// Attach routing data only to router turns and collaborative data only
/// to collaborative turns. An explicit `collaborativeInfo` wins over the
/// blob on the assistant message.
fn confirmed_entries(resp: SendMessageResponse, mode: TutorMode) -> (ThreadEntry, ThreadEntry) {
    let user = ThreadEntry::confirmed(resp.user_message);

    let routing = resp.routing_info.filter(|_| mode == TutorMode::Router);
    let collaborative = if mode == TutorMode::Collaborative {
        resp.collaborative_info
            .filter(|info| !info.agent_contributions.is_empty())
            .or_else(|| metadata::decode_message(&resp.assistant_message))
    } else {
        None
    };
    let assistant = ThreadEntry {
        message: resp.assistant_message,
        routing,
        collaborative,
        optimistic: false,
    };
    (user, assistant)
}
