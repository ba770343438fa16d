//! Tutor orchestrator — composes the session controller, conversation
//! store, dispatcher, reveal coordinator and pulse tracker behind one
//! handle.
//!
//! Reveal jobs are returned to the caller rather than spawned here, since
//! spawning is platform specific. Run them with [`TutorOrchestrator::run_reveal`].

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use tutor_types::{
    AgentId, Result, TutorError,
    config::TutorConfig,
    event::TutorEvent,
    pulse::{EmotionTag, PulseContext, PulseHistory},
    session::{CollaborativeSettings, CoursePolicy, TutorMode},
};

use crate::dispatcher::{DispatchRequest, MessageDispatcher};
use crate::event_bus::EventBus;
use crate::ports::{RandomSource, SleepPort, TutorApiPort};
use crate::pulse::EmotionalPulseTracker;
use crate::reveal::{self, RevealCoordinator, RevealJob, RevealMode, RevealState};
use crate::session::{SessionController, SessionState};
use crate::store::{ConversationStore, ThreadEntry};

pub struct TutorOrchestrator {
    api: Rc<dyn TutorApiPort>,
    rng: Rc<dyn RandomSource>,
    config: TutorConfig,
    bus: EventBus,
    session: SessionController,
    store: RefCell<ConversationStore>,
    dispatcher: MessageDispatcher,
    reveals: RevealCoordinator,
    pulse: EmotionalPulseTracker,
}

impl TutorOrchestrator {
    pub fn new(
        api: Rc<dyn TutorApiPort>,
        rng: Rc<dyn RandomSource>,
        config: TutorConfig,
        bus: EventBus,
    ) -> Self {
        Self {
            session: SessionController::new(bus.clone()),
            dispatcher: MessageDispatcher::new(bus.clone()),
            reveals: RevealCoordinator::new(bus.clone()),
            pulse: EmotionalPulseTracker::new(config.pulse, bus.clone()),
            store: RefCell::new(ConversationStore::new()),
            api,
            rng,
            config,
            bus,
        }
    }

    // ─── Accessors ───────────────────────────────────────────

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn store(&self) -> Ref<'_, ConversationStore> {
        self.store.borrow()
    }

    /// Messages of the thread currently on screen
    pub fn messages(&self) -> Vec<ThreadEntry> {
        self.store.borrow().displayed_messages().to_vec()
    }

    pub fn reveals(&self) -> &RevealCoordinator {
        &self.reveals
    }

    pub fn pulse(&self) -> &EmotionalPulseTracker {
        &self.pulse
    }

    pub fn is_sending(&self) -> bool {
        self.dispatcher.in_flight() > 0
    }

    /// Greeting of the agent on screen while its thread is still empty
    pub fn welcome_message(&self) -> Option<String> {
        let store = self.store.borrow();
        let agent_id = store.displayed()?;
        if !store.messages(agent_id).is_empty() {
            return None;
        }
        self.session
            .state()
            .agent(agent_id)
            .and_then(|a| a.welcome_message.clone())
    }

    // ─── Session ─────────────────────────────────────────────

    /// Bootstrap: fetch the session, apply the course policy and an optional
    /// deep-linked agent, then load the active thread.
    pub async fn load(
        &self,
        policy: Option<CoursePolicy>,
        deep_link: Option<AgentId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RevealJob>> {
        if let Some(agent_id) = deep_link {
            self.session.request_agent(agent_id);
        }
        let bundle = self.session.load(self.api.as_ref(), policy).await?;
        self.store.borrow_mut().set_previews(bundle.conversations);
        self.sync_thread(now).await
    }

    pub async fn set_mode(&self, mode: TutorMode, now: DateTime<Utc>) -> Result<Vec<RevealJob>> {
        self.reveals.cancel_all();
        let persisted = self.session.change_mode(self.api.as_ref(), mode).await;
        let jobs = self.sync_thread(now).await?;
        persisted.map(|_| jobs)
    }

    pub async fn select_agent(
        &self,
        agent_id: AgentId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RevealJob>> {
        let mode = self.session.mode();
        if mode != TutorMode::Manual {
            return Err(TutorError::ModeMismatch { mode });
        }
        self.reveals.cancel_all();
        let persisted = self.session.select_agent(self.api.as_ref(), agent_id).await;
        let jobs = self.sync_thread(now).await?;
        persisted.map(|_| jobs)
    }

    pub async fn refresh_agents(&self) -> Result<()> {
        self.session.refresh_agents(self.api.as_ref()).await
    }

    /// Point the store at the active target's thread, loading it if it
    /// changed. Switching threads cancels running reveals.
    async fn sync_thread(&self, now: DateTime<Utc>) -> Result<Vec<RevealJob>> {
        let wanted = self.session.target().map(|t| t.conversation_agent_id());
        let current = self.store.borrow().displayed();
        match wanted {
            Some(agent_id) if current != Some(agent_id) => self.open_thread(agent_id, now).await,
            Some(_) => Ok(Vec::new()),
            None => {
                if current.is_some() {
                    self.reveals.cancel_all();
                }
                self.store.borrow_mut().set_displayed(None);
                Ok(Vec::new())
            }
        }
    }

    // ─── Conversations ───────────────────────────────────────

    /// Show an agent's thread and replace it with server history.
    pub async fn open_thread(&self, agent_id: AgentId, now: DateTime<Utc>) -> Result<Vec<RevealJob>> {
        let previous = self.store.borrow().displayed();
        if previous != Some(agent_id) {
            self.reveals.cancel_all();
        }
        self.store.borrow_mut().set_displayed(Some(agent_id));

        let detail = self.api.get_conversation(agent_id).await?;
        let count = self.store.borrow_mut().load_history(agent_id, detail.messages);
        log::info!("Loaded {} messages for agent {}", count, agent_id);

        // The learner may have moved on while history was in flight.
        if self.store.borrow().displayed() != Some(agent_id) {
            log::debug!("Thread {} no longer displayed, skipping view update", agent_id);
            return Ok(Vec::new());
        }
        self.bus.emit(TutorEvent::HistoryLoaded {
            agent_id,
            message_count: count,
        });
        let entries = self.store.borrow().messages(agent_id).to_vec();
        Ok(entries
            .iter()
            .filter_map(|entry| self.reveal_job(agent_id, entry, now))
            .collect())
    }

    pub async fn refresh_conversations(&self) -> Result<()> {
        let previews = self.api.list_conversations().await?;
        self.store.borrow_mut().set_previews(previews);
        Ok(())
    }

    pub async fn clear_conversation(&self, agent_id: AgentId) -> Result<()> {
        self.reveals.cancel_agent(agent_id);
        self.api.clear_conversation(agent_id).await?;
        self.store.borrow_mut().clear(agent_id);
        self.bus.emit(TutorEvent::ConversationCleared { agent_id });
        if let Err(e) = self.refresh_conversations().await {
            log::warn!("Failed to refresh conversation previews: {}", e);
        }
        Ok(())
    }

    // ─── Messages ────────────────────────────────────────────

    /// Send a turn to the active target. Returns the reveal job for a
    /// collaborative reply.
    pub async fn send(
        &self,
        text: &str,
        settings: Option<CollaborativeSettings>,
        now: DateTime<Utc>,
    ) -> Result<Option<RevealJob>> {
        let target = self.session.target().ok_or(TutorError::NoActiveTarget)?;
        let agent_id = target.conversation_agent_id();
        let req = DispatchRequest {
            agent_id,
            text: text.to_string(),
            mode: self.session.mode(),
            settings,
        };

        let outcome = match self
            .dispatcher
            .send(&self.store, self.api.as_ref(), req, now)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if e != TutorError::EmptyMessage {
                    self.bus.emit(TutorEvent::Error {
                        message: format!("Message not sent: {}", e),
                    });
                }
                return Err(e);
            }
        };

        // Previews are refetched so counts only ever reflect confirmed messages.
        if let Err(e) = self.refresh_conversations().await {
            log::warn!("Failed to refresh conversation previews: {}", e);
        }

        if self.store.borrow().displayed() != Some(outcome.agent_id) {
            return Ok(None);
        }
        Ok(self.reveal_job(outcome.agent_id, &outcome.assistant, now))
    }

    // ─── Reveal ──────────────────────────────────────────────

    fn reveal_job(&self, agent_id: AgentId, entry: &ThreadEntry, now: DateTime<Utc>) -> Option<RevealJob> {
        let info = entry.collaborative.as_ref()?;
        let mode = RevealMode::for_message(&entry.message, now, &self.config.reveal);
        let job = RevealJob::new(
            entry.id(),
            agent_id,
            &info.agent_contributions,
            mode,
            &self.config.reveal,
            self.rng.as_ref(),
        );
        self.reveals.register(&job);
        Some(job)
    }

    pub async fn run_reveal(&self, job: RevealJob, sleeper: &dyn SleepPort) -> RevealState {
        reveal::run_reveal(job, sleeper, &self.bus, &self.reveals).await
    }

    // ─── Emotional pulse ─────────────────────────────────────

    /// Log a pulse against the conversation on screen.
    pub async fn submit_pulse(&self, emotion: EmotionTag) -> Result<u64> {
        let context = self.pulse_context()?;
        self.pulse.submit(self.api.as_ref(), emotion, context).await
    }

    pub async fn pulse_history(&self) -> Result<PulseHistory> {
        let context = self.pulse_context()?;
        self.pulse
            .history(self.api.as_ref(), context.context, context.agent_id)
            .await
    }

    fn pulse_context(&self) -> Result<PulseContext> {
        let target = self.session.target().ok_or(TutorError::NoActiveTarget)?;
        let agent_id = target.conversation_agent_id();
        let conversation_id = self
            .store
            .borrow()
            .preview_for(agent_id)
            .map(|c| c.id)
            .unwrap_or(0);
        let pulse_agent = match self.session.mode() {
            TutorMode::Manual => Some(agent_id),
            _ => None,
        };
        Ok(PulseContext::conversation(conversation_id, pulse_agent))
    }
}
