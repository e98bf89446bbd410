//! Clint - turn orchestration for a clinical conversation assistant
//!
//! Each user message runs through a fixed pipeline on top of an external
//! inference engine: restate the message, update notes, optionally
//! regenerate diagnoses, stream a reply, and optionally cite sources.
//! [`pipeline::TurnPipeline`] sequences one turn; [`session::ChatSession`]
//! wraps it with the transcript and progress bookkeeping a UI needs.

pub mod config;
pub mod conversation;
pub mod engine;
pub mod pipeline;
pub mod session;
pub mod stage;
pub mod telemetry;

pub use config::{ClintConfig, ConfigError};
pub use conversation::ConversationState;
pub use engine::{Credentials, Engine, EngineError, IncrementStream, LoggingEngine};
pub use pipeline::{EventSink, StageFailure, TurnEvent, TurnOutcome, TurnPipeline};
pub use session::{ChatSession, SessionError};
pub use stage::Stage;
