//! Per-turn stage pipeline
//!
//! One user message drives a fixed sequence of engine calls:
//! `Notes → [Diagnosis → RefineDiagnosis] → Respond → [Cite]`.
//! Progress and partial output are reported as ordered [`TurnEvent`]s; the
//! updated conversation state is the return value.

mod branch;
mod collector;
mod error;
mod event;
mod sequencer;


pub use branch::NotesChange;
pub use collector::drain;
pub use error::{Operation, StageFailure, REMEDIATION_HINT};
pub use event::{EventLog, EventSink, TurnEvent};
pub use sequencer::{TurnOutcome, TurnPipeline, DEFAULT_RENDER_DEPTH};
