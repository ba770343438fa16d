//! Tutor App — WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It assembles the browser adapters, builds the orchestrator and hands it
//! to the host page as a `TutorClient`.

mod client;

pub use client::TutorClient;

use wasm_bindgen::prelude::*;

/// WASM entry point — runs when the module is instantiated
#[wasm_bindgen(start)]
pub fn main() {
    // Everything passes here; each client narrows with its configured level.
    wasm_logger::init(wasm_logger::Config::new(log::Level::Trace));
    log::info!("Tutor WASM starting...");
}
