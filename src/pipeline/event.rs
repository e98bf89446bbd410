//! Events observed while a turn runs

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{broadcast, mpsc};

/// Observable side effects of a turn, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Progress indicator moved to a new stage
    Stage(Stage),
    /// Latest restated statement (full text so far)
    Statement(String),
    /// Notes changed; rendered markdown
    Notes(String),
    /// Diagnoses regenerated; rendered markdown
    Diagnoses(String),
    /// Latest reply text; replaces, never extends, what is displayed
    Response(String),
    /// A stage failed; user-facing message
    Error(String),
}

/// Receiver of turn events.
///
/// Called synchronously from the pipeline; implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TurnEvent);
}

impl<F> EventSink for F
where
    F: Fn(TurnEvent) + Send + Sync,
{
    fn emit(&self, event: TurnEvent) {
        self(event);
    }
}

impl EventSink for mpsc::UnboundedSender<TurnEvent> {
    fn emit(&self, event: TurnEvent) {
        // Receiver gone means nobody is watching
        let _ = self.send(event);
    }
}

impl EventSink for broadcast::Sender<TurnEvent> {
    fn emit(&self, event: TurnEvent) {
        let _ = self.send(event);
    }
}

/// Ordered in-memory record of every event emitted
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<TurnEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TurnEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the stage transitions, in order
    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TurnEvent::Stage(stage) => Some(stage),
                _ => None,
            })
            .collect()
    }

    /// Text of every `Response` event, in order
    pub fn responses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TurnEvent::Response(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TurnEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: TurnEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
