//! Background tasks on the browser event loop.
//!
//! Reveal playback is wrapped in `futures::future::abortable` and its
//! abort handle handed to the `RevealCoordinator`, so switching threads
//! drops the pending timer instead of waiting it out.

use std::rc::Rc;

use futures::future::{abortable, Aborted};
use wasm_bindgen_futures::spawn_local;

use tutor_core::orchestrator::TutorOrchestrator;
use tutor_core::reveal::RevealJob;

use crate::timer::GlooSleeper;

pub fn spawn_reveal(orchestrator: Rc<TutorOrchestrator>, job: RevealJob) {
    let message_id = job.message_id;
    let runner = {
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run_reveal(job, &GlooSleeper).await }
    };
    let (task, handle) = abortable(runner);
    orchestrator.reveals().attach_abort(message_id, handle);

    spawn_local(async move {
        match task.await {
            Ok(state) => log::debug!(
                "Reveal task for message {} finished at {}/{}",
                message_id,
                state.revealed,
                state.total
            ),
            Err(Aborted) => log::debug!("Reveal task for message {} aborted", message_id),
        }
    });
}

pub fn spawn_reveals(orchestrator: &Rc<TutorOrchestrator>, jobs: Vec<RevealJob>) {
    for job in jobs {
        spawn_reveal(orchestrator.clone(), job);
    }
}

/// Tick the pulse cooldown down to idle.
pub fn spawn_cooldown(orchestrator: Rc<TutorOrchestrator>) {
    spawn_local(async move {
        orchestrator.pulse().run_cooldown(&GlooSleeper).await;
    });
}
