//! Collaborative reveal engine.
//!
//! Shows the contributions of a collaborative turn one at a time behind a
//! typing indicator, the way a group chat would unfold. The timing logic is
//! split in three parts:
//!
//! 1. `RevealState` — pure state machine (`state → event → state`)
//! 2. `RevealSchedule` — the precomputed list of delays
//! 3. `run_reveal` — walks the schedule on a `SleepPort`, checking a
//!    `CancellationToken` around every wait
//!
//! Messages older than `RevealTiming::immediate_after_ms` at mount are
//! settled history and are shown in one step.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use futures::future::AbortHandle;
use tutor_types::{
    AgentId, MessageId,
    config::RevealTiming,
    event::TutorEvent,
    message::{AgentContribution, Message},
};

use crate::event_bus::EventBus;
use crate::ports::{RandomSource, SleepPort};

// ─── State machine ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealMode {
    /// Show everything at once (history replay)
    Immediate,
    /// Stagger contributions behind a typing indicator
    Animated,
}

impl RevealMode {
    pub fn for_message(msg: &Message, now: DateTime<Utc>, timing: &RevealTiming) -> Self {
        if msg.age_ms(now) > timing.immediate_after_ms {
            RevealMode::Immediate
        } else {
            RevealMode::Animated
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealState {
    pub total: usize,
    pub revealed: usize,
    /// Display name shown next to the typing indicator
    pub typing: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    TypingStarted { label: String },
    DelayElapsed,
}

/// Observable effect of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealSignal {
    Progress(usize),
    Completed,
}

impl RevealState {
    pub fn new(total: usize, mode: RevealMode) -> Self {
        let settled = mode == RevealMode::Immediate || total == 0;
        Self {
            total,
            revealed: if settled { total } else { 0 },
            typing: None,
            completed: settled,
        }
    }

    pub fn apply(&self, event: RevealEvent) -> (RevealState, Option<RevealSignal>) {
        let mut next = self.clone();
        if self.completed {
            return (next, None);
        }
        match event {
            RevealEvent::TypingStarted { label } => {
                next.typing = Some(label);
                (next, None)
            }
            RevealEvent::DelayElapsed => {
                next.revealed += 1;
                if next.revealed >= next.total {
                    next.revealed = next.total;
                    next.typing = None;
                    next.completed = true;
                    (next, Some(RevealSignal::Completed))
                } else {
                    let revealed = next.revealed;
                    (next, Some(RevealSignal::Progress(revealed)))
                }
            }
        }
    }
}

// ─── Schedule ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealStep {
    pub delay_ms: u64,
    /// Index of the contribution that becomes visible after the delay
    pub reveal_index: usize,
    pub typing_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RevealSchedule {
    pub steps: Vec<RevealStep>,
}

impl RevealSchedule {
    pub fn build(
        contributions: &[AgentContribution],
        timing: &RevealTiming,
        rng: &dyn RandomSource,
    ) -> Self {
        let steps = contributions
            .iter()
            .enumerate()
            .map(|(index, c)| RevealStep {
                delay_ms: step_delay(index, timing, rng),
                reveal_index: index,
                typing_label: c.display_label().to_string(),
            })
            .collect();
        Self { steps }
    }

    pub fn total_delay_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.delay_ms).sum()
    }
}

/// Fixed delay for the first contribution, uniform in `[min, max)` after.
pub fn step_delay(index: usize, timing: &RevealTiming, rng: &dyn RandomSource) -> u64 {
    if index == 0 {
        return timing.first_delay_ms;
    }
    let span = timing.max_delay_ms.saturating_sub(timing.min_delay_ms);
    if span == 0 {
        return timing.min_delay_ms;
    }
    let offset = (rng.next_unit().clamp(0.0, 1.0) * span as f64) as u64;
    timing.min_delay_ms + offset.min(span - 1)
}

// ─── Cancellation ────────────────────────────────────────────

/// Shared flag checked by a running reveal around each wait
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Everything needed to play back one message's reveal
#[derive(Debug, Clone)]
pub struct RevealJob {
    pub message_id: MessageId,
    pub agent_id: AgentId,
    pub total: usize,
    pub mode: RevealMode,
    pub schedule: RevealSchedule,
    pub token: CancellationToken,
}

impl RevealJob {
    pub fn new(
        message_id: MessageId,
        agent_id: AgentId,
        contributions: &[AgentContribution],
        mode: RevealMode,
        timing: &RevealTiming,
        rng: &dyn RandomSource,
    ) -> Self {
        let schedule = match mode {
            RevealMode::Immediate => RevealSchedule::default(),
            RevealMode::Animated => RevealSchedule::build(contributions, timing, rng),
        };
        Self {
            message_id,
            agent_id,
            total: contributions.len(),
            mode,
            schedule,
            token: CancellationToken::new(),
        }
    }
}

struct LiveReveal {
    agent_id: AgentId,
    token: CancellationToken,
    abort: Option<AbortHandle>,
}

/// Tracks reveals in flight so switching threads can tear them down.
#[derive(Clone)]
pub struct RevealCoordinator {
    live: Rc<RefCell<HashMap<MessageId, LiveReveal>>>,
    bus: EventBus,
}

impl RevealCoordinator {
    pub fn new(bus: EventBus) -> Self {
        Self {
            live: Rc::new(RefCell::new(HashMap::new())),
            bus,
        }
    }

    /// Track a job. A job already running for the same message is cancelled.
    pub fn register(&self, job: &RevealJob) {
        let previous = self.live.borrow_mut().insert(
            job.message_id,
            LiveReveal {
                agent_id: job.agent_id,
                token: job.token.clone(),
                abort: None,
            },
        );
        if let Some(previous) = previous {
            cancel_live(previous);
        }
    }

    /// Attach the abort handle of the task driving a job
    pub fn attach_abort(&self, message_id: MessageId, handle: AbortHandle) {
        if let Some(live) = self.live.borrow_mut().get_mut(&message_id) {
            live.abort = Some(handle);
        }
    }

    pub fn is_live(&self, message_id: MessageId) -> bool {
        self.live.borrow().contains_key(&message_id)
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    fn finish(&self, message_id: MessageId, token: &CancellationToken) {
        let mut live = self.live.borrow_mut();
        // A re-registered job for the same message owns the slot now.
        if live
            .get(&message_id)
            .is_some_and(|l| Rc::ptr_eq(&l.token.cancelled, &token.cancelled))
        {
            live.remove(&message_id);
        }
    }

    pub fn cancel_all(&self) -> Vec<MessageId> {
        self.cancel_where(|_| true)
    }

    pub fn cancel_agent(&self, agent_id: AgentId) -> Vec<MessageId> {
        self.cancel_where(|live| live.agent_id == agent_id)
    }

    fn cancel_where(&self, pred: impl Fn(&LiveReveal) -> bool) -> Vec<MessageId> {
        let cancelled: Vec<(MessageId, LiveReveal)> = {
            let mut live = self.live.borrow_mut();
            let ids: Vec<MessageId> = live
                .iter()
                .filter(|(_, l)| pred(l))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| live.remove(&id).map(|l| (id, l)))
                .collect()
        };

        let mut ids = Vec::with_capacity(cancelled.len());
        for (message_id, live) in cancelled {
            cancel_live(live);
            log::debug!("Reveal for message {} cancelled", message_id);
            self.bus.emit(TutorEvent::RevealCancelled { message_id });
            ids.push(message_id);
        }
        ids.sort_unstable();
        ids
    }
}

fn cancel_live(live: LiveReveal) {
    live.token.cancel();
    if let Some(abort) = live.abort {
        abort.abort();
    }
}

// ─── Runner ──────────────────────────────────────────────────

/// Play a reveal job to completion or cancellation and return the final
/// state. After the token is cancelled nothing is emitted.
pub async fn run_reveal(
    job: RevealJob,
    sleeper: &dyn SleepPort,
    bus: &EventBus,
    coordinator: &RevealCoordinator,
) -> RevealState {
    let mut state = RevealState::new(job.total, job.mode);

    if state.completed {
        if !job.token.is_cancelled() {
            bus.emit(TutorEvent::RevealProgress {
                message_id: job.message_id,
                revealed: state.revealed,
                total: state.total,
            });
            bus.emit(TutorEvent::RevealComplete { message_id: job.message_id });
        }
        coordinator.finish(job.message_id, &job.token);
        return state;
    }

    for step in &job.schedule.steps {
        if job.token.is_cancelled() {
            return state;
        }
        let (next, _) = state.apply(RevealEvent::TypingStarted {
            label: step.typing_label.clone(),
        });
        state = next;
        bus.emit(TutorEvent::RevealTyping {
            message_id: job.message_id,
            agent_display_name: step.typing_label.clone(),
        });

        sleeper.sleep(step.delay_ms).await;
        if job.token.is_cancelled() {
            return state;
        }

        let (next, signal) = state.apply(RevealEvent::DelayElapsed);
        state = next;
        log::debug!(
            "Reveal {}: contribution {} of {} visible",
            job.message_id,
            step.reveal_index + 1,
            state.total
        );
        bus.emit(TutorEvent::RevealProgress {
            message_id: job.message_id,
            revealed: state.revealed,
            total: state.total,
        });
        if signal == Some(RevealSignal::Completed) {
            bus.emit(TutorEvent::RevealComplete { message_id: job.message_id });
            break;
        }
    }

    coordinator.finish(job.message_id, &job.token);
    state
}
