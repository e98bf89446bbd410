//! Scripted engine for testing
//!
//! Enables pipeline and session tests without a real inference backend.

use super::{Credentials, Engine, EngineError, IncrementStream};
use crate::conversation::{ConversationState, Diagnosis};
use crate::pipeline::Operation;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Mutex;

/// A call received by [`MockEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    RewriteStatement { message: String },
    BuildNotes { statement: Option<String> },
    InitialDiagnosis,
    RefineDiagnosis,
    Respond { message: String, has_diagnosis: bool },
    Cite { response: String },
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            RecordedCall::RewriteStatement { .. } => Operation::RewriteStatement,
            RecordedCall::BuildNotes { .. } => Operation::BuildNotes,
            RecordedCall::InitialDiagnosis => Operation::InitialDiagnosis,
            RecordedCall::RefineDiagnosis => Operation::RefineDiagnosis,
            RecordedCall::Respond { .. } => Operation::Respond,
            RecordedCall::Cite { .. } => Operation::Cite,
        }
    }
}

/// Engine that replays a fixed script.
///
/// `build_notes` files the statement it receives under the `note_section`
/// title unless notes are frozen, so a turn changes the notes exactly when the
/// statement is new to that section.
#[derive(Debug)]
pub struct MockEngine {
    statement: Vec<String>,
    note_section: Option<String>,
    diagnoses: Vec<Diagnosis>,
    refined: Vec<Diagnosis>,
    response: Vec<String>,
    citations: Option<String>,
    failures: HashMap<Operation, EngineError>,
    stream_failures: HashMap<Operation, (usize, EngineError)>,
    /// Record of all calls made, in order
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            statement: Vec::new(),
            note_section: Some("Symptoms".to_string()),
            diagnoses: vec![Diagnosis::new("Angina")],
            refined: vec![Diagnosis::new("Angina").with_likelihood("high")],
            response: Vec::new(),
            citations: None,
            failures: HashMap::new(),
            stream_failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Increments yielded by `rewrite_statement`
    pub fn statement<I, S>(mut self, increments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement = increments.into_iter().map(Into::into).collect();
        self
    }

    /// Make `build_notes` return the state untouched
    pub fn freeze_notes(mut self) -> Self {
        self.note_section = None;
        self
    }

    pub fn refined(mut self, refined: Vec<Diagnosis>) -> Self {
        self.refined = refined;
        self
    }

    /// Increments yielded by `respond`
    pub fn response<I, S>(mut self, increments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response = increments.into_iter().map(Into::into).collect();
        self
    }

    pub fn citations(mut self, citations: impl Into<String>) -> Self {
        self.citations = Some(citations.into());
        self
    }

    /// Fail `operation` when it is called
    pub fn fail(mut self, operation: Operation, error: EngineError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Fail a streamed `operation` after `after` increments were yielded
    pub fn fail_stream(mut self, operation: Operation, after: usize, error: EngineError) -> Self {
        self.stream_failures.insert(operation, (after, error));
        self
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn recorded_operations(&self) -> Vec<Operation> {
        self.recorded_calls()
            .iter()
            .map(RecordedCall::operation)
            .collect()
    }

    fn record(&self, call: RecordedCall) -> Result<(), EngineError> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);
        match self.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn stream(&self, operation: Operation, increments: &[String]) -> IncrementStream {
        let mut items: Vec<Result<String, EngineError>> =
            increments.iter().cloned().map(Ok).collect();
        if let Some((after, error)) = self.stream_failures.get(&operation) {
            items.truncate(*after);
            items.push(Err(error.clone()));
        }
        stream::iter(items).boxed()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for MockEngine {
    type KnowledgeBase = ();

    async fn rewrite_statement(
        &self,
        message: &str,
        _credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError> {
        self.record(RecordedCall::RewriteStatement {
            message: message.to_string(),
        })?;
        Ok(self.stream(Operation::RewriteStatement, &self.statement))
    }

    async fn build_notes(
        &self,
        mut state: ConversationState,
        _credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        self.record(RecordedCall::BuildNotes {
            statement: state.statement().map(str::to_string),
        })?;
        let statement = state.statement().map(str::to_string);
        if let (Some(title), Some(statement)) = (&self.note_section, statement) {
            state.notes_mut().upsert(title, [statement]);
        }
        Ok(state)
    }

    async fn initial_diagnosis(
        &self,
        mut state: ConversationState,
        _knowledge_base: &(),
        _credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        self.record(RecordedCall::InitialDiagnosis)?;
        state.set_diagnoses(self.diagnoses.clone());
        Ok(state)
    }

    async fn refine_diagnosis(
        &self,
        mut state: ConversationState,
        _knowledge_base: &(),
        _credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        self.record(RecordedCall::RefineDiagnosis)?;
        state.set_diagnoses(self.refined.clone());
        Ok(state)
    }

    async fn respond(
        &self,
        _state: &ConversationState,
        message: &str,
        has_diagnosis: bool,
        _knowledge_base: &(),
        _credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError> {
        self.record(RecordedCall::Respond {
            message: message.to_string(),
            has_diagnosis,
        })?;
        Ok(self.stream(Operation::Respond, &self.response))
    }

    async fn cite(
        &self,
        response: &str,
        _knowledge_base: &(),
        _credentials: &Credentials,
    ) -> Result<Option<String>, EngineError> {
        self.record(RecordedCall::Cite {
            response: response.to_string(),
        })?;
        Ok(self.citations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoggingEngine;

    fn key() -> Credentials {
        Credentials::new("sk-test-key-0000")
    }

    #[tokio::test]
    async fn test_mock_streams_script() {
        let engine = MockEngine::new().statement(["Patient", "Patient reports cough."]);
        let items: Vec<_> = engine
            .rewrite_statement("I cough", &key())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            items,
            vec![
                Ok("Patient".to_string()),
                Ok("Patient reports cough.".to_string())
            ]
        );
        assert_eq!(engine.recorded_operations(), vec![Operation::RewriteStatement]);
    }

    #[tokio::test]
    async fn test_mock_stream_failure_after_increments() {
        let engine = MockEngine::new()
            .response(["a", "ab", "abc"])
            .fail_stream(Operation::Respond, 1, EngineError::network("reset"));
        let items: Vec<_> = engine
            .respond(&ConversationState::new(), "hi", false, &(), &key())
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("a".to_string()));
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_logging_engine_passes_streams_through() {
        let engine = LoggingEngine::new(
            MockEngine::new()
                .statement(["Patient", "Patient reports cough."])
                .response(["a", "ab", "abc"])
                .fail_stream(Operation::Respond, 2, EngineError::network("reset")),
        );

        let statement: Vec<_> = engine
            .rewrite_statement("I cough", &key())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            statement,
            vec![
                Ok("Patient".to_string()),
                Ok("Patient reports cough.".to_string())
            ]
        );

        let response: Vec<_> = engine
            .respond(&ConversationState::new(), "hi", false, &(), &key())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            response,
            vec![
                Ok("a".to_string()),
                Ok("ab".to_string()),
                Err(EngineError::network("reset"))
            ]
        );
    }

    #[tokio::test]
    async fn test_logging_engine_passes_through() {
        let engine = LoggingEngine::new(
            MockEngine::new().fail(Operation::Cite, EngineError::auth("bad key")),
        );

        let mut state = ConversationState::new();
        state.set_statement("Patient reports cough.");
        let state = engine.build_notes(state, &key()).await.unwrap();
        assert!(!state.notes().is_empty());

        let err = engine.cite("reply", &(), &key()).await.unwrap_err();
        assert_eq!(err, EngineError::auth("bad key"));

        let inner = engine.into_inner();
        assert_eq!(
            inner.recorded_operations(),
            vec![Operation::BuildNotes, Operation::Cite]
        );
    }
}
