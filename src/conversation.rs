//! Conversation state carried between turns
//!
//! A `ConversationState` is a plain value: the pipeline clones it, threads the
//! clone through the engine, and hands back the result. The caller's copy is
//! never touched by a turn that fails.

mod diagnosis;
mod notes;
mod transcript;

pub use diagnosis::Diagnosis;
pub use notes::{ClinicalNotes, NoteSection};
pub use transcript::{Role, TranscriptEntry};

use serde::{Deserialize, Serialize};

/// Statement, notes, diagnoses and transcript for one conversation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    statement: Option<String>,
    #[serde(default)]
    notes: ClinicalNotes,
    #[serde(default)]
    diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    messages: Vec<TranscriptEntry>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest third-person restatement of the user's message
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn set_statement(&mut self, statement: impl Into<String>) {
        self.statement = Some(statement.into());
    }

    pub fn notes(&self) -> &ClinicalNotes {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut ClinicalNotes {
        &mut self.notes
    }

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.diagnoses
    }

    pub fn set_diagnoses(&mut self, diagnoses: Vec<Diagnosis>) {
        self.diagnoses = diagnoses;
    }

    pub fn messages(&self) -> &[TranscriptEntry] {
        &self.messages
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(TranscriptEntry::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(TranscriptEntry::assistant(content));
    }

    /// Render the notes as markdown with section headings at `depth`
    pub fn notes_markdown(&self, depth: usize) -> String {
        self.notes.to_markdown(depth)
    }

    /// Render the diagnoses as markdown with one heading per diagnosis at `depth`
    pub fn diagnoses_markdown(&self, depth: usize) -> String {
        diagnosis::to_markdown(&self.diagnoses, depth)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Markdown heading prefix for `depth`, clamped to the levels markdown supports
pub(crate) fn heading(depth: usize, title: &str) -> String {
    format!("{} {title}", "#".repeat(depth.clamp(1, 6)))
}
