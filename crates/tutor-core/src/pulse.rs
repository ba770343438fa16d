//! Emotional pulse tracker.
//!
//! ```text
//! Idle --submit--> Submitting --ok--> Cooldown(c) --tick--> ... --> Idle
//!                      \--err--> Idle
//! ```
//!
//! Submits outside `Idle` are rejected. The cooldown is driven by ticks so
//! a view can show the remaining time.

use std::cell::Cell;

use tutor_types::{
    AgentId, Result, TutorError,
    config::PulseConfig,
    event::TutorEvent,
    pulse::{EmotionTag, PulseContext, PulseContextType, PulseHistory, PulseSubmission},
};

use crate::event_bus::EventBus;
use crate::ports::{SleepPort, TutorApiPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Idle,
    Submitting,
    Cooldown { remaining_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseEvent {
    Submit,
    Succeeded { cooldown_ms: u64 },
    Failed,
    Tick { elapsed_ms: u64 },
}

impl PulseState {
    pub fn apply(self, event: PulseEvent) -> Result<PulseState> {
        match (self, event) {
            (PulseState::Idle, PulseEvent::Submit) => Ok(PulseState::Submitting),
            (PulseState::Submitting, PulseEvent::Submit) => Err(TutorError::PulseInFlight),
            (PulseState::Cooldown { remaining_ms }, PulseEvent::Submit) => {
                Err(TutorError::PulseCooldown { remaining_ms })
            }
            (PulseState::Submitting, PulseEvent::Succeeded { cooldown_ms }) => {
                Ok(cooldown_or_idle(cooldown_ms))
            }
            (PulseState::Submitting, PulseEvent::Failed) => Ok(PulseState::Idle),
            (PulseState::Cooldown { remaining_ms }, PulseEvent::Tick { elapsed_ms }) => {
                Ok(cooldown_or_idle(remaining_ms.saturating_sub(elapsed_ms)))
            }
            (state, _) => Ok(state),
        }
    }

    pub fn accepts_submit(&self) -> bool {
        matches!(self, PulseState::Idle)
    }
}

fn cooldown_or_idle(remaining_ms: u64) -> PulseState {
    if remaining_ms == 0 {
        PulseState::Idle
    } else {
        PulseState::Cooldown { remaining_ms }
    }
}

pub struct EmotionalPulseTracker {
    state: Cell<PulseState>,
    refresh_counter: Cell<u64>,
    config: PulseConfig,
    bus: EventBus,
}

impl EmotionalPulseTracker {
    pub fn new(config: PulseConfig, bus: EventBus) -> Self {
        Self {
            state: Cell::new(PulseState::Idle),
            refresh_counter: Cell::new(0),
            config,
            bus,
        }
    }

    pub fn state(&self) -> PulseState {
        self.state.get()
    }

    /// Bumped on every logged pulse; history views refetch when it moves.
    pub fn refresh_counter(&self) -> u64 {
        self.refresh_counter.get()
    }

    pub async fn submit(
        &self,
        api: &dyn TutorApiPort,
        emotion: EmotionTag,
        context: PulseContext,
    ) -> Result<u64> {
        let submitting = self.state.get().apply(PulseEvent::Submit)?;
        self.state.set(submitting);

        let submission = PulseSubmission { emotion, context };
        match api.log_pulse(submission).await {
            Ok(()) => {
                let next = self.state.get().apply(PulseEvent::Succeeded {
                    cooldown_ms: self.config.cooldown_ms,
                })?;
                self.state.set(next);
                let counter = self.refresh_counter.get() + 1;
                self.refresh_counter.set(counter);
                log::info!("Pulse logged: {}", emotion.label());
                self.bus.emit(TutorEvent::PulseLogged {
                    emotion,
                    refresh_counter: counter,
                });
                self.publish_state(next);
                Ok(counter)
            }
            Err(e) => {
                self.state.set(self.state.get().apply(PulseEvent::Failed)?);
                log::warn!("Pulse submission failed: {}", e);
                self.bus.emit(TutorEvent::Error {
                    message: format!("Could not record how you feel: {}", e),
                });
                Err(e)
            }
        }
    }

    /// Advance the cooldown clock.
    pub fn tick(&self, elapsed_ms: u64) -> PulseState {
        let prev = self.state.get();
        let next = prev.apply(PulseEvent::Tick { elapsed_ms }).unwrap_or(prev);
        self.state.set(next);
        if next != prev {
            self.publish_state(next);
        }
        next
    }

    /// Tick every `tick_ms` until the tracker is idle again.
    pub async fn run_cooldown(&self, sleeper: &dyn SleepPort) {
        let tick_ms = self.config.tick_ms.max(1);
        while matches!(self.state.get(), PulseState::Cooldown { .. }) {
            sleeper.sleep(tick_ms).await;
            self.tick(tick_ms);
        }
    }

    pub async fn history(
        &self,
        api: &dyn TutorApiPort,
        context: PulseContextType,
        agent_id: Option<AgentId>,
    ) -> Result<PulseHistory> {
        api.pulse_history(context, agent_id, self.config.history_limit)
            .await
    }

    fn publish_state(&self, state: PulseState) {
        match state {
            PulseState::Cooldown { remaining_ms } => {
                self.bus.emit(TutorEvent::PulseCooldown { remaining_ms })
            }
            PulseState::Idle => self.bus.emit(TutorEvent::PulseReady),
            PulseState::Submitting => {}
        }
    }
}
