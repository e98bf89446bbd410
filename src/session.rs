//! Caller-side chat session
//!
//! Owns the canonical conversation state and the display state, and takes
//! care of everything the pipeline leaves to its caller: provisional
//! transcript entries, rolling them back on failure, and returning the stage
//! indicator to `Ready` once a turn settles.

mod alerts;
mod view;

pub use alerts::{Alert, AlertLevel, Alerts};
pub use view::{SessionSnapshot, SessionView};

use crate::config::ClintConfig;
use crate::conversation::{ConversationState, TranscriptEntry};
use crate::engine::{Credentials, Engine};
use crate::pipeline::{EventSink, StageFailure, TurnEvent, TurnOutcome, TurnPipeline};
use crate::stage::Stage;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;

pub const MISSING_CREDENTIALS_ALERT: &str = "You must provide an API key";
pub const TERMS_ALERT: &str = "You must acknowledge the Terms of Use.";
pub const USAGE_WARNING: &str = "Every message you send makes several requests to the inference \
service using your API key, and each message is billed to that account.";
pub const PRIVACY_WARNING: &str = "The contents of each message are sent to the inference \
service and are subject to its privacy policy.";

const BROADCAST_CAPACITY: usize = 128;

/// Reasons a message was not sent
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Knowledge base is still loading")]
    KnowledgeBaseUnavailable,
    #[error("You must provide an API key")]
    MissingCredentials,
    #[error("You must acknowledge the Terms of Use.")]
    TermsNotAccepted,
    #[error(transparent)]
    Turn(#[from] StageFailure),
}

/// A conversation with its display state
pub struct ChatSession<E: Engine> {
    pipeline: TurnPipeline<E>,
    state: ConversationState,
    knowledge_base: Option<E::KnowledgeBase>,
    credentials: Option<Credentials>,
    terms_accepted: bool,
    view: Mutex<SessionView>,
    broadcast_tx: broadcast::Sender<TurnEvent>,
}

/// Applies events to the view and forwards them to subscribers
struct SessionSink<'a> {
    view: &'a Mutex<SessionView>,
    broadcast_tx: &'a broadcast::Sender<TurnEvent>,
}

impl EventSink for SessionSink<'_> {
    fn emit(&self, event: TurnEvent) {
        lock(self.view).apply(&event);
        let _ = self.broadcast_tx.send(event);
    }
}

fn lock(view: &Mutex<SessionView>) -> MutexGuard<'_, SessionView> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E: Engine> ChatSession<E> {
    pub fn new(pipeline: TurnPipeline<E>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let mut view = SessionView::default();
        view.alerts.add(USAGE_WARNING, AlertLevel::Warning);
        view.alerts.add(PRIVACY_WARNING, AlertLevel::Warning);
        view.alerts.add(MISSING_CREDENTIALS_ALERT, AlertLevel::Error);
        view.alerts.add(TERMS_ALERT, AlertLevel::Error);

        Self {
            pipeline,
            state: ConversationState::new(),
            knowledge_base: None,
            credentials: None,
            terms_accepted: false,
            view: Mutex::new(view),
            broadcast_tx,
        }
    }

    /// Session with the configured render depth and API key
    pub fn from_config(engine: E, config: &ClintConfig) -> Self {
        let pipeline = TurnPipeline::new(engine).with_render_depth(config.render_depth);
        let mut session = Self::new(pipeline);
        session.set_credentials(config.credentials.clone());
        session
    }

    fn sink(&self) -> SessionSink<'_> {
        SessionSink {
            view: &self.view,
            broadcast_tx: &self.broadcast_tx,
        }
    }

    /// Make the knowledge base available; the session becomes ready
    pub fn attach_knowledge_base(&mut self, knowledge_base: E::KnowledgeBase) {
        self.knowledge_base = Some(knowledge_base);
        tracing::info!("Knowledge base attached");
        if lock(&self.view).stage == Stage::Loading {
            self.sink().emit(TurnEvent::Stage(Stage::Ready));
        }
    }

    /// Set or clear the API key. Blank keys count as missing.
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.credentials = credentials.filter(|c| !c.is_empty());
        if let Some(credentials) = &self.credentials {
            tracing::info!(key = %credentials, "API key set");
        }
        lock(&self.view).alerts.toggle(
            MISSING_CREDENTIALS_ALERT,
            AlertLevel::Error,
            self.credentials.is_none(),
        );
    }

    pub fn accept_terms(&mut self, accepted: bool) {
        self.terms_accepted = accepted;
        lock(&self.view)
            .alerts
            .toggle(TERMS_ALERT, AlertLevel::Error, !accepted);
    }

    /// Whether a message can be sent right now
    pub fn is_ready(&self) -> bool {
        self.knowledge_base.is_some()
            && self.credentials.is_some()
            && self.terms_accepted
            && lock(&self.view).stage == Stage::Ready
    }

    /// Run one turn for `message`.
    ///
    /// The user message and an empty assistant placeholder are shown
    /// immediately. On failure both are removed again and the canonical
    /// state is left as it was. Either way the stage returns to `Ready`.
    pub async fn send_message(&mut self, message: &str) -> Result<TurnOutcome, SessionError> {
        if message.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let knowledge_base = self
            .knowledge_base
            .as_ref()
            .ok_or(SessionError::KnowledgeBaseUnavailable)?;
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(SessionError::MissingCredentials)?;
        if !self.terms_accepted {
            return Err(SessionError::TermsNotAccepted);
        }

        let history_len = {
            let mut view = lock(&self.view);
            let len = view.history.len();
            view.history.push(TranscriptEntry::user(message));
            view.history.push(TranscriptEntry::assistant(""));
            len
        };

        let sink = self.sink();
        let result = self
            .pipeline
            .run_turn(message, &self.state, knowledge_base, credentials, &sink)
            .await;

        if result.is_err() {
            // Drop the user message and any partial reply
            lock(&self.view).history.truncate(history_len);
        }
        sink.emit(TurnEvent::Stage(Stage::Ready));

        let outcome = result?;
        self.state = outcome.state.clone();
        Ok(outcome)
    }

    /// The canonical conversation state
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Copy of the current display state
    pub fn view(&self) -> SessionView {
        lock(&self.view).clone()
    }

    pub fn stage(&self) -> Stage {
        lock(&self.view).stage
    }

    pub fn remove_alert(&self, id: &str) -> bool {
        lock(&self.view).alerts.remove(id)
    }

    /// Receive every event the session emits from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Forget the conversation; credentials, terms and alerts are kept
    pub fn clear(&mut self) {
        self.state = ConversationState::new();
        lock(&self.view).clear_details();
        tracing::info!("Session cleared");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let view = lock(&self.view);
        SessionSnapshot {
            state: self.state.clone(),
            history: view.history.clone(),
            statement: view.statement.clone(),
            notes: view.notes.clone(),
            diagnoses: view.diagnoses.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        let mut view = lock(&self.view);
        view.history = snapshot.history;
        view.statement = snapshot.statement;
        view.notes = snapshot.notes;
        view.diagnoses = snapshot.diagnoses;
        drop(view);
        self.state = snapshot.state;
    }
}
