pub mod ports;
pub mod event_bus;
pub mod metadata;
pub mod store;
pub mod reveal;
pub mod session;
pub mod dispatcher;
pub mod pulse;
pub mod orchestrator;
