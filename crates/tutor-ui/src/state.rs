//! UI-level state that drives rendering.
//! This is a read-only projection of the orchestrator state,
//! updated by draining the EventBus.

use std::collections::BTreeMap;

use serde::Serialize;
use tutor_core::reveal::{RevealJob, RevealMode};
use tutor_types::{
    AgentId, MessageId,
    event::{ActiveTarget, TutorEvent},
    pulse::EmotionTag,
    session::TutorMode,
};

/// State visible to the chat view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub mode: TutorMode,
    pub target: Option<ActiveTarget>,
    /// Agent whose thread is on screen
    pub open_agent: Option<AgentId>,
    /// Sends awaiting the backend
    pub pending_sends: usize,
    /// Reveals seen since the last thread switch, by assistant message id
    pub reveals: BTreeMap<MessageId, RevealView>,
    /// Display name behind the typing indicator
    pub typing: Option<String>,
    pub pulse: PulseView,
    /// Pulse history views refetch when this moves
    pub history_refresh: u64,
    pub last_error: Option<String>,
    /// Status line text
    pub status_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealView {
    pub visible: usize,
    pub total: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseView {
    pub enabled: bool,
    pub remaining_ms: u64,
    pub last_emotion: Option<EmotionTag>,
}

impl Default for PulseView {
    fn default() -> Self {
        Self {
            enabled: true,
            remaining_ms: 0,
            last_emotion: None,
        }
    }
}

impl PulseView {
    /// Caption for the pulse control, counting down whole seconds
    pub fn label(&self) -> String {
        if self.enabled {
            "How are you feeling?".to_string()
        } else {
            format!("Available in {}s", self.remaining_ms.div_ceil(1000))
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            mode: TutorMode::default(),
            target: None,
            open_agent: None,
            pending_sends: 0,
            reveals: BTreeMap::new(),
            typing: None,
            pulse: PulseView::default(),
            history_refresh: 0,
            last_error: None,
            status_text: "Ready".to_string(),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.pending_sends > 0
    }

    /// Contributions to draw for a collaborative message. Messages without
    /// a tracked reveal are shown in full.
    pub fn visible_contributions(&self, message_id: MessageId, total: usize) -> usize {
        self.reveals
            .get(&message_id)
            .map_or(total, |r| r.visible.min(total))
    }

    /// Track a reveal before its first event arrives so an animated
    /// message does not flash in full.
    pub fn begin_reveal(&mut self, job: &RevealJob) {
        let settled = job.mode == RevealMode::Immediate;
        self.reveals.insert(
            job.message_id,
            RevealView {
                visible: if settled { job.total } else { 0 },
                total: job.total,
                complete: settled,
            },
        );
    }

    /// Process events from the EventBus and update view state
    pub fn process_events(&mut self, events: Vec<TutorEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: TutorEvent) {
        match event {
            TutorEvent::SessionLoaded { mode, agent_count } => {
                self.mode = mode;
                self.status_text = match agent_count {
                    0 => "No tutors available".to_string(),
                    1 => "1 tutor available".to_string(),
                    n => format!("{} tutors available", n),
                };
            }
            TutorEvent::ModeChanged { mode } => {
                self.mode = mode;
                self.status_text = format!("{} mode", mode.label());
            }
            TutorEvent::ActiveTargetChanged { target } => {
                self.target = target;
            }
            TutorEvent::HistoryLoaded { agent_id, .. } => {
                if self.open_agent != Some(agent_id) {
                    log::debug!("View switched to agent {}", agent_id);
                    self.reveals.clear();
                    self.typing = None;
                }
                self.open_agent = Some(agent_id);
            }
            TutorEvent::SendStarted { .. } => {
                self.pending_sends += 1;
                self.last_error = None;
                self.status_text = "Sending...".to_string();
            }
            TutorEvent::MessageSent {
                routing,
                contribution_count,
                ..
            } => {
                self.pending_sends = self.pending_sends.saturating_sub(1);
                self.status_text = if let Some(routing) = routing {
                    format!(
                        "Routed to {} ({:.0}% match)",
                        routing.selected_agent.display_name,
                        routing.confidence * 100.0
                    )
                } else if contribution_count > 0 {
                    format!("{} tutors answered", contribution_count)
                } else {
                    "Ready".to_string()
                };
            }
            TutorEvent::SendFailed { message, .. } => {
                self.pending_sends = self.pending_sends.saturating_sub(1);
                self.status_text = "Message not sent".to_string();
                self.last_error = Some(message);
            }
            TutorEvent::RevealTyping {
                message_id,
                agent_display_name,
            } => {
                self.reveals.entry(message_id).or_insert(RevealView {
                    visible: 0,
                    total: 0,
                    complete: false,
                });
                self.typing = Some(agent_display_name);
            }
            TutorEvent::RevealProgress {
                message_id,
                revealed,
                total,
            } => {
                let view = self.reveals.entry(message_id).or_insert(RevealView {
                    visible: 0,
                    total,
                    complete: false,
                });
                view.visible = revealed;
                view.total = total;
            }
            TutorEvent::RevealComplete { message_id } => {
                if let Some(view) = self.reveals.get_mut(&message_id) {
                    view.visible = view.total;
                    view.complete = true;
                }
                self.typing = None;
            }
            TutorEvent::RevealCancelled { message_id } => {
                self.reveals.remove(&message_id);
                self.typing = None;
            }
            TutorEvent::ConversationCleared { agent_id } => {
                if self.open_agent == Some(agent_id) {
                    self.reveals.clear();
                    self.typing = None;
                }
                self.status_text = "Conversation cleared".to_string();
            }
            TutorEvent::PulseLogged {
                emotion,
                refresh_counter,
            } => {
                self.pulse.last_emotion = Some(emotion);
                self.history_refresh = refresh_counter;
                self.status_text = format!("Feeling logged: {}", emotion.label());
            }
            TutorEvent::PulseCooldown { remaining_ms } => {
                self.pulse.enabled = false;
                self.pulse.remaining_ms = remaining_ms;
            }
            TutorEvent::PulseReady => {
                self.pulse.enabled = true;
                self.pulse.remaining_ms = 0;
            }
            TutorEvent::Error { message } => {
                self.status_text = format!("Error: {}", message);
                self.last_error = Some(message);
            }
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}
