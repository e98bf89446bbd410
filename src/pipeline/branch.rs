//! Transition guard for the diagnosis stages

/// Rendered notes before and after the notes stage.
///
/// Diagnosis stages run only when the notes gained information this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesChange {
    before: String,
    after: String,
}

impl NotesChange {
    pub fn new(before: String, after: String) -> Self {
        Self { before, after }
    }

    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    pub fn requires_diagnosis(&self) -> bool {
        self.changed()
    }

    /// The new rendering, only if it differs from the old one
    pub fn updated(&self) -> Option<&str> {
        self.changed().then_some(self.after.as_str())
    }
}
