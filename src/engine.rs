//! Inference engine capability interface
//!
//! The engine owns retrieval and text generation. The turn pipeline only
//! sequences these six calls; it never looks inside the knowledge base or the
//! credentials it forwards.

mod credentials;
mod error;

#[cfg(test)]
pub mod testing;

pub use credentials::Credentials;
pub use error::{EngineError, EngineErrorKind};

use crate::conversation::ConversationState;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Lazily produced increments of one streamed engine request.
///
/// Every item is the full text produced so far, not a delta: consumers
/// replace what they display with each new item. The stream ends when the
/// request is complete and cannot be restarted.
pub type IncrementStream = BoxStream<'static, Result<String, EngineError>>;

/// Operations the turn pipeline needs from the inference engine
#[async_trait]
pub trait Engine: Send + Sync {
    /// Document/embedding index used for diagnosis and citations
    type KnowledgeBase: Send + Sync;

    /// Restate a first-person user message as a third-person clinical statement
    async fn rewrite_statement(
        &self,
        message: &str,
        credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError>;

    /// Derive updated notes from the state's current statement
    async fn build_notes(
        &self,
        state: ConversationState,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError>;

    /// Produce candidate diagnoses from the notes
    async fn initial_diagnosis(
        &self,
        state: ConversationState,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError>;

    /// Re-score and narrow the candidate diagnoses
    async fn refine_diagnosis(
        &self,
        state: ConversationState,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError>;

    /// Generate the assistant's reply
    async fn respond(
        &self,
        state: &ConversationState,
        message: &str,
        has_diagnosis: bool,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError>;

    /// Source citations for a reply, if any apply
    async fn cite(
        &self,
        response: &str,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<Option<String>, EngineError>;
}

// ============================================================================
// Arc implementation for shared engines
// ============================================================================

#[async_trait]
impl<T: Engine + ?Sized> Engine for Arc<T> {
    type KnowledgeBase = T::KnowledgeBase;

    async fn rewrite_statement(
        &self,
        message: &str,
        credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError> {
        (**self).rewrite_statement(message, credentials).await
    }

    async fn build_notes(
        &self,
        state: ConversationState,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        (**self).build_notes(state, credentials).await
    }

    async fn initial_diagnosis(
        &self,
        state: ConversationState,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        (**self)
            .initial_diagnosis(state, knowledge_base, credentials)
            .await
    }

    async fn refine_diagnosis(
        &self,
        state: ConversationState,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        (**self)
            .refine_diagnosis(state, knowledge_base, credentials)
            .await
    }

    async fn respond(
        &self,
        state: &ConversationState,
        message: &str,
        has_diagnosis: bool,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError> {
        (**self)
            .respond(state, message, has_diagnosis, knowledge_base, credentials)
            .await
    }

    async fn cite(
        &self,
        response: &str,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<Option<String>, EngineError> {
        (**self).cite(response, knowledge_base, credentials).await
    }
}

// ============================================================================
// Logging wrapper
// ============================================================================

/// Logs duration and outcome of every engine call.
///
/// Streamed calls are logged when their stream ends, so the duration covers
/// generation as well as opening the stream. A stream dropped before it ends
/// is not logged.
pub struct LoggingEngine<E> {
    inner: E,
}

impl<E: Engine> LoggingEngine<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

fn log_outcome<T>(operation: &'static str, start: Instant, result: &Result<T, EngineError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::debug!(
                operation,
                duration_ms = %duration.as_millis(),
                "Engine call completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                operation,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                error = %e.message,
                "Engine call failed"
            );
        }
    }
}

fn log_opened(
    operation: &'static str,
    start: Instant,
    result: Result<IncrementStream, EngineError>,
) -> Result<IncrementStream, EngineError> {
    match result {
        Ok(increments) => Ok(timed(operation, start, increments)),
        Err(e) => {
            let failed = Err(e);
            log_outcome(operation, start, &failed);
            failed
        }
    }
}

/// Pass increments through and log once the stream ends or fails
fn timed(
    operation: &'static str,
    start: Instant,
    increments: IncrementStream,
) -> IncrementStream {
    stream::unfold(Some((increments, 0usize)), move |pending| async move {
        let (mut increments, count) = pending?;
        match increments.next().await {
            Some(Ok(text)) => Some((Ok(text), Some((increments, count + 1)))),
            Some(Err(e)) => {
                let failed = Err(e);
                log_outcome::<String>(operation, start, &failed);
                Some((failed, None))
            }
            None => {
                tracing::debug!(
                    operation,
                    increments = count,
                    duration_ms = %start.elapsed().as_millis(),
                    "Engine stream completed"
                );
                None
            }
        }
    })
    .boxed()
}

#[async_trait]
impl<E: Engine> Engine for LoggingEngine<E> {
    type KnowledgeBase = E::KnowledgeBase;

    async fn rewrite_statement(
        &self,
        message: &str,
        credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError> {
        let start = Instant::now();
        let result = self.inner.rewrite_statement(message, credentials).await;
        log_opened("rewrite_statement", start, result)
    }

    async fn build_notes(
        &self,
        state: ConversationState,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        let start = Instant::now();
        let result = self.inner.build_notes(state, credentials).await;
        log_outcome("build_notes", start, &result);
        result
    }

    async fn initial_diagnosis(
        &self,
        state: ConversationState,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        let start = Instant::now();
        let result = self
            .inner
            .initial_diagnosis(state, knowledge_base, credentials)
            .await;
        log_outcome("initial_diagnosis", start, &result);
        result
    }

    async fn refine_diagnosis(
        &self,
        state: ConversationState,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<ConversationState, EngineError> {
        let start = Instant::now();
        let result = self
            .inner
            .refine_diagnosis(state, knowledge_base, credentials)
            .await;
        log_outcome("refine_diagnosis", start, &result);
        result
    }

    async fn respond(
        &self,
        state: &ConversationState,
        message: &str,
        has_diagnosis: bool,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<IncrementStream, EngineError> {
        let start = Instant::now();
        let result = self
            .inner
            .respond(state, message, has_diagnosis, knowledge_base, credentials)
            .await;
        log_opened("respond", start, result)
    }

    async fn cite(
        &self,
        response: &str,
        knowledge_base: &Self::KnowledgeBase,
        credentials: &Credentials,
    ) -> Result<Option<String>, EngineError> {
        let start = Instant::now();
        let result = self.inner.cite(response, knowledge_base, credentials).await;
        log_outcome("cite", start, &result);
        result
    }
}
