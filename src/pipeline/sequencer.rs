//! Runs the fixed stage sequence for one user turn

use super::branch::NotesChange;
use super::collector::drain;
use super::error::{Operation, StageFailure};
use super::event::{EventSink, TurnEvent};
use crate::conversation::ConversationState;
use crate::engine::{Credentials, Engine, EngineError, IncrementStream};
use crate::stage::Stage;
use tracing::Instrument;

/// Heading depth used when rendering notes and diagnoses
pub const DEFAULT_RENDER_DEPTH: usize = 3;

/// Result of a completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The new canonical state
    pub state: ConversationState,
    /// Restated statement; `None` when the engine produced none and the turn
    /// was skipped
    pub statement: Option<String>,
    /// Reply as displayed, including any citations
    pub response: Option<String>,
    /// Whether the diagnosis stages ran
    pub diagnosed: bool,
}

impl TurnOutcome {
    fn skipped(state: ConversationState) -> Self {
        Self {
            state,
            statement: None,
            response: None,
            diagnosed: false,
        }
    }

    /// True when no statement was produced and nothing else ran
    pub fn is_noop(&self) -> bool {
        self.statement.is_none()
    }
}

/// Stage sequencer over an inference engine
pub struct TurnPipeline<E: Engine> {
    engine: E,
    render_depth: usize,
}

impl<E: Engine> TurnPipeline<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            render_depth: DEFAULT_RENDER_DEPTH,
        }
    }

    #[must_use]
    pub fn with_render_depth(mut self, depth: usize) -> Self {
        self.render_depth = depth;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn render_depth(&self) -> usize {
        self.render_depth
    }

    /// Run one turn for `message` against `state`.
    ///
    /// `state` is left untouched; the updated state is returned in the
    /// outcome. On failure an `Error` event is emitted once and the failure is
    /// returned without running any later stage. The stage indicator is not
    /// reset to `Ready`; that is the caller's job.
    pub async fn run_turn(
        &self,
        message: &str,
        state: &ConversationState,
        knowledge_base: &E::KnowledgeBase,
        credentials: &Credentials,
        sink: &dyn EventSink,
    ) -> Result<TurnOutcome, StageFailure> {
        let turn_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("turn", %turn_id);
        self.sequence(message, state, knowledge_base, credentials, sink)
            .instrument(span)
            .await
    }

    async fn sequence(
        &self,
        message: &str,
        state: &ConversationState,
        knowledge_base: &E::KnowledgeBase,
        credentials: &Credentials,
        sink: &dyn EventSink,
    ) -> Result<TurnOutcome, StageFailure> {
        let depth = self.render_depth;

        // Notes: restate the message, then derive notes from it
        enter(sink, Stage::Notes);
        let opened = self.engine.rewrite_statement(message, credentials).await;
        let Some(statement) = collect(
            sink,
            Stage::Notes,
            Operation::RewriteStatement,
            opened,
            TurnEvent::Statement,
        )
        .await?
        else {
            tracing::info!("No statement produced, skipping turn");
            return Ok(TurnOutcome::skipped(state.clone()));
        };

        let notes_before = state.notes_markdown(depth);
        let mut working = state.clone();
        working.set_statement(statement.clone());
        let working = self
            .engine
            .build_notes(working, credentials)
            .await
            .map_err(|e| fail(sink, Stage::Notes, Operation::BuildNotes, e))?;

        let notes = NotesChange::new(notes_before, working.notes_markdown(depth));
        if let Some(updated) = notes.updated() {
            sink.emit(TurnEvent::Notes(updated.to_string()));
        }

        // Diagnosis: only when the notes gained information
        let (mut working, has_diagnosis) = if notes.requires_diagnosis() {
            enter(sink, Stage::Diagnosis);
            let working = self
                .engine
                .initial_diagnosis(working, knowledge_base, credentials)
                .await
                .map_err(|e| fail(sink, Stage::Diagnosis, Operation::InitialDiagnosis, e))?;

            enter(sink, Stage::RefineDiagnosis);
            let working = self
                .engine
                .refine_diagnosis(working, knowledge_base, credentials)
                .await
                .map_err(|e| {
                    fail(sink, Stage::RefineDiagnosis, Operation::RefineDiagnosis, e)
                })?;

            sink.emit(TurnEvent::Diagnoses(working.diagnoses_markdown(depth)));
            (working, true)
        } else {
            tracing::info!("Notes unchanged, skipping diagnosis");
            (working, false)
        };

        // Respond
        enter(sink, Stage::Respond);
        let opened = self
            .engine
            .respond(&working, message, has_diagnosis, knowledge_base, credentials)
            .await;
        let response = collect(
            sink,
            Stage::Respond,
            Operation::Respond,
            opened,
            TurnEvent::Response,
        )
        .await?
        .filter(|r| !r.is_empty());

        // Transcript keeps the reply without citations
        working.add_user_message(message);
        if let Some(response) = &response {
            working.add_assistant_message(response.clone());
        }

        // Cite: only replies grounded in a fresh diagnosis
        let mut displayed = response.clone();
        if let (true, Some(response)) = (has_diagnosis, response.as_deref()) {
            enter(sink, Stage::Cite);
            let citations = self
                .engine
                .cite(response, knowledge_base, credentials)
                .await
                .map_err(|e| fail(sink, Stage::Cite, Operation::Cite, e))?;
            if let Some(citations) = citations {
                let combined = format!("{response}\n\n{citations}");
                sink.emit(TurnEvent::Response(combined.clone()));
                displayed = Some(combined);
            }
        }

        tracing::info!(
            diagnosed = has_diagnosis,
            responded = displayed.is_some(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            state: working,
            statement: Some(statement),
            response: displayed,
            diagnosed: has_diagnosis,
        })
    }
}

fn enter(sink: &dyn EventSink, stage: Stage) {
    tracing::info!(%stage, "Entering stage");
    sink.emit(TurnEvent::Stage(stage));
}

/// Report a failure once and turn it into a `StageFailure`
fn fail(
    sink: &dyn EventSink,
    stage: Stage,
    operation: Operation,
    source: EngineError,
) -> StageFailure {
    let failure = StageFailure::new(stage, operation, source);
    tracing::error!(
        %stage,
        %operation,
        kind = ?failure.source.kind,
        error = %failure.source,
        "Turn stage failed"
    );
    sink.emit(TurnEvent::Error(failure.user_message()));
    failure
}

/// Drain an opened stream, republishing every increment through `wrap`
async fn collect(
    sink: &dyn EventSink,
    stage: Stage,
    operation: Operation,
    opened: Result<IncrementStream, EngineError>,
    wrap: fn(String) -> TurnEvent,
) -> Result<Option<String>, StageFailure> {
    let increments = opened.map_err(|e| fail(sink, stage, operation, e))?;
    drain(increments, |text| sink.emit(wrap(text.to_string())))
        .await
        .map_err(|e| fail(sink, stage, operation, e))
}
