//! What the UI layer displays for a session

use super::alerts::{AlertLevel, Alerts};
use crate::conversation::{Role, TranscriptEntry};
use crate::pipeline::TurnEvent;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// Display state driven by turn events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub stage: Stage,
    pub history: Vec<TranscriptEntry>,
    pub statement: Option<String>,
    pub notes: Option<String>,
    pub diagnoses: Option<String>,
    pub alerts: Alerts,
}

impl SessionView {
    pub(super) fn apply(&mut self, event: &TurnEvent) {
        match event {
            TurnEvent::Stage(stage) => self.stage = *stage,
            TurnEvent::Statement(text) => self.statement = Some(text.clone()),
            TurnEvent::Notes(text) => self.notes = Some(text.clone()),
            TurnEvent::Diagnoses(text) => self.diagnoses = Some(text.clone()),
            TurnEvent::Response(text) => self.replace_reply(text),
            TurnEvent::Error(message) => {
                self.alerts.add(message.clone(), AlertLevel::Error);
            }
        }
    }

    /// Replace the trailing assistant placeholder with the latest reply
    fn replace_reply(&mut self, text: &str) {
        match self.history.last_mut() {
            Some(entry) if entry.role == Role::Assistant => entry.content = text.to_string(),
            _ => self.history.push(TranscriptEntry::assistant(text)),
        }
    }

    /// Entries worth rendering; empty placeholders are hidden
    pub fn visible_history(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.history.iter().filter(|m| !m.content.is_empty())
    }

    pub(super) fn clear_details(&mut self) {
        self.history.clear();
        self.statement = None;
        self.notes = None;
        self.diagnoses = None;
    }
}

/// Serializable copy of everything a session needs to resume
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: crate::conversation::ConversationState,
    #[serde(default)]
    pub history: Vec<TranscriptEntry>,
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub diagnoses: Option<String>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
