//! Drains an engine increment stream

use crate::engine::EngineError;
use futures::{Stream, StreamExt};

/// Consume `increments` to exhaustion, reporting each one as it arrives.
///
/// Each increment is a full replacement value: the latest one wins and is
/// returned. Returns `None` when the stream ends without yielding anything.
/// The first error aborts the drain; increments already reported stay
/// reported.
pub async fn drain<S, F>(
    mut increments: S,
    mut on_increment: F,
) -> Result<Option<String>, EngineError>
where
    S: Stream<Item = Result<String, EngineError>> + Unpin,
    F: FnMut(&str),
{
    let mut latest = None;
    let mut count = 0usize;
    while let Some(increment) = increments.next().await {
        let value = latest.insert(increment?);
        on_increment(value);
        count += 1;
    }
    tracing::debug!(increments = count, "Stream drained");
    Ok(latest)
}
