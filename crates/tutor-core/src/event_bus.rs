//! Simple event bus for decoupled communication between the orchestration
//! layer and the view.
//!
//! The bus is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Events are buffered and drained by the view on each update.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tutor_types::event::TutorEvent;

/// Shared event bus — clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<TutorEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn emit(&self, event: TutorEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    /// Drain all pending events. Called by the view layer.
    pub fn drain(&self) -> Vec<TutorEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
