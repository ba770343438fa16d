//! Session controller — which agent (or team) the learner is talking to.
//!
//! `SessionState::apply` is the pure transition function; the controller
//! wraps it with persistence calls. Local state is always updated before
//! the backend write, so a failed write never reverts what the learner
//! picked.

use std::cell::RefCell;
use std::rc::Rc;

use tutor_types::{
    AgentId, Result, TutorError,
    event::{ActiveTarget, TutorEvent},
    session::{Agent, CoursePolicy, Session, SessionBundle, TutorMode},
};

use crate::event_bus::EventBus;
use crate::ports::TutorApiPort;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    /// Last session record seen from the backend
    pub session: Option<Session>,
    pub agents: Vec<Agent>,
    pub mode: TutorMode,
    /// Agent asked for explicitly, e.g. through a deep link
    pub requested_agent: Option<AgentId>,
    /// Agent picked in manual mode
    pub selected_agent: Option<AgentId>,
    pub target: Option<ActiveTarget>,
    /// One-shot flag: the course policy was reconciled for this session load
    pub policy_applied: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loaded { session: Session, agents: Vec<Agent> },
    PolicyApplied { forced_mode: TutorMode },
    ModeSelected(TutorMode),
    AgentSelected(AgentId),
    AgentRequested(AgentId),
    AgentsRefreshed(Vec<Agent>),
    /// Backend echo of a write; only the stored record changes
    SessionConfirmed(Session),
}

impl SessionState {
    pub fn apply(&self, event: SessionEvent) -> SessionState {
        let mut next = self.clone();
        match event {
            SessionEvent::Loaded { session, agents } => {
                let same_session = self.session.as_ref().is_some_and(|s| s.id == session.id);
                if !same_session {
                    next.policy_applied = false;
                    next.selected_agent = None;
                }
                // A forced mode stays in effect across reloads of the same session.
                if !(same_session && self.policy_applied) {
                    next.mode = session.mode;
                }
                next.agents = agents;
                next.session = Some(session);
            }
            SessionEvent::PolicyApplied { forced_mode } => {
                next.mode = forced_mode;
                next.policy_applied = true;
                if let Some(session) = next.session.as_mut() {
                    session.mode = forced_mode;
                }
            }
            SessionEvent::ModeSelected(mode) => {
                next.mode = mode;
            }
            SessionEvent::AgentSelected(agent_id) => {
                if next.mode == TutorMode::Manual {
                    next.selected_agent = Some(agent_id);
                }
            }
            SessionEvent::AgentRequested(agent_id) => {
                next.requested_agent = Some(agent_id);
                if next.mode == TutorMode::Manual {
                    next.selected_agent = Some(agent_id);
                }
            }
            SessionEvent::AgentsRefreshed(agents) => {
                next.agents = agents;
            }
            SessionEvent::SessionConfirmed(session) => {
                next.session = Some(session);
                return next;
            }
        }
        next.target = resolve_target(
            next.mode,
            &next.agents,
            next.selected_agent.or(next.requested_agent),
            next.session.as_ref().and_then(|s| s.active_agent_id),
        );
        if let Some(ActiveTarget::Agent { agent_id }) = next.target {
            next.selected_agent = Some(agent_id);
        }
        next
    }

    pub fn agent(&self, agent_id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == agent_id)
    }
}

/// The selection rule. Total over every mode.
///
/// Manual mode prefers the explicitly requested agent, then the agent the
/// session last used, and otherwise selects nothing. Team modes always
/// enter through the first agent in the list.
pub fn resolve_target(
    mode: TutorMode,
    agents: &[Agent],
    requested: Option<AgentId>,
    stored: Option<AgentId>,
) -> Option<ActiveTarget> {
    let known = |id: &AgentId| agents.iter().any(|a| a.id == *id);
    match mode {
        TutorMode::Manual => requested
            .filter(known)
            .or(stored.filter(known))
            .map(|agent_id| ActiveTarget::Agent { agent_id }),
        TutorMode::Router | TutorMode::Collaborative | TutorMode::Random => agents
            .first()
            .map(|a| ActiveTarget::Team { mode, entry_agent_id: a.id }),
    }
}

/// Shared session controller — clone-cheap via Rc.
#[derive(Clone)]
pub struct SessionController {
    state: Rc<RefCell<SessionState>>,
    bus: EventBus,
}

impl SessionController {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: Rc::new(RefCell::new(SessionState::default())),
            bus,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn mode(&self) -> TutorMode {
        self.state.borrow().mode
    }

    pub fn target(&self) -> Option<ActiveTarget> {
        self.state.borrow().target
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.state.borrow().agents.clone()
    }

    fn transition(&self, event: SessionEvent) -> (SessionState, SessionState) {
        let mut state = self.state.borrow_mut();
        let prev = state.clone();
        *state = state.apply(event);
        (prev, state.clone())
    }

    fn publish_changes(&self, prev: &SessionState, next: &SessionState) {
        if prev.mode != next.mode {
            log::info!("Tutor mode: {} -> {}", prev.mode, next.mode);
            self.bus.emit(TutorEvent::ModeChanged { mode: next.mode });
        }
        if prev.target != next.target {
            self.bus.emit(TutorEvent::ActiveTargetChanged { target: next.target });
        }
    }

    /// Remember an agent asked for out of band (deep link).
    pub fn request_agent(&self, agent_id: AgentId) {
        let (prev, next) = self.transition(SessionEvent::AgentRequested(agent_id));
        self.publish_changes(&prev, &next);
    }

    /// Fetch the session bundle and reconcile the course policy.
    ///
    /// The policy is forced at most once per session load; a failed
    /// corrective write is logged and otherwise ignored.
    pub async fn load(
        &self,
        api: &dyn TutorApiPort,
        policy: Option<CoursePolicy>,
    ) -> Result<SessionBundle> {
        let bundle = api.get_session_bundle().await?;
        let (prev, next) = self.transition(SessionEvent::Loaded {
            session: bundle.session.clone(),
            agents: bundle.agents.clone(),
        });
        log::info!(
            "Tutor session {} loaded: mode={}, {} agents",
            bundle.session.id,
            next.mode,
            next.agents.len()
        );
        self.bus.emit(TutorEvent::SessionLoaded {
            mode: next.mode,
            agent_count: next.agents.len(),
        });

        let forced = policy
            .and_then(|p| p.forced_mode)
            .filter(|_| !next.policy_applied);
        let next = match forced {
            Some(forced_mode) => self.transition(SessionEvent::PolicyApplied { forced_mode }).1,
            None => next,
        };
        self.publish_changes(&prev, &next);

        if let Some(forced_mode) = forced.filter(|m| *m != bundle.session.mode) {
            log::info!(
                "Course policy forces {} mode (stored: {})",
                forced_mode,
                bundle.session.mode
            );
            match api.set_mode(forced_mode).await {
                Ok(session) => {
                    self.transition(SessionEvent::SessionConfirmed(session));
                }
                Err(e) => log::warn!("Failed to persist course mode override: {}", e),
            }
        }

        Ok(bundle)
    }

    /// Switch mode. Local state changes first; persistence errors are
    /// returned but not rolled back.
    pub async fn change_mode(&self, api: &dyn TutorApiPort, mode: TutorMode) -> Result<()> {
        let (prev, next) = self.transition(SessionEvent::ModeSelected(mode));
        self.publish_changes(&prev, &next);

        match api.set_mode(mode).await {
            Ok(session) => {
                self.transition(SessionEvent::SessionConfirmed(session));
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to persist mode {}: {}", mode, e);
                self.bus.emit(TutorEvent::Error {
                    message: format!("Could not save mode: {}", e),
                });
                Err(e)
            }
        }
    }

    /// Pick an agent. Only valid in manual mode.
    pub async fn select_agent(&self, api: &dyn TutorApiPort, agent_id: AgentId) -> Result<()> {
        {
            let state = self.state.borrow();
            if state.mode != TutorMode::Manual {
                return Err(TutorError::ModeMismatch { mode: state.mode });
            }
            if state.agent(agent_id).is_none() {
                return Err(TutorError::UnknownAgent(agent_id));
            }
        }

        let (prev, next) = self.transition(SessionEvent::AgentSelected(agent_id));
        self.publish_changes(&prev, &next);
        log::info!("Active tutor agent: {}", agent_id);

        match api.set_active_agent(agent_id).await {
            Ok(session) => {
                self.transition(SessionEvent::SessionConfirmed(session));
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to persist active agent {}: {}", agent_id, e);
                self.bus.emit(TutorEvent::Error {
                    message: format!("Could not save agent choice: {}", e),
                });
                Err(e)
            }
        }
    }

    pub async fn refresh_agents(&self, api: &dyn TutorApiPort) -> Result<()> {
        let agents = api.list_agents().await?;
        let (prev, next) = self.transition(SessionEvent::AgentsRefreshed(agents));
        self.publish_changes(&prev, &next);
        Ok(())
    }
}
