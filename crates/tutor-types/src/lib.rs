pub mod message;
pub mod session;
pub mod pulse;
pub mod event;
pub mod config;
pub mod error;


pub use error::TutorError;
pub type Result<T> = std::result::Result<T, TutorError>;

/// Backend identifiers are plain integers.
pub type AgentId = i64;
pub type MessageId = i64;
pub type ConversationId = i64;
pub type SessionId = i64;
