use tokio::sync::mpsc;
use tracing::debug;

use super::{MatchSession, SessionOutcome};
use crate::error::Result;
use crate::models::TranscriptSegment;

/// Drive a session from a channel of segments
///
/// Consumes segments in arrival order until the producer closes the channel or
/// the session stops early. On early stop the receiver is dropped, which makes
/// the producer's next `send` fail so it can wind down.
pub async fn run_stream(
    mut session: MatchSession,
    mut segments: mpsc::Receiver<TranscriptSegment>,
) -> Result<SessionOutcome> {
    while let Some(segment) = segments.recv().await {
        if session.consume(&segment)?.is_stopped() {
            debug!(
                session = %session.id(),
                "Stream stopped early at segment {}",
                segment.sequence_position
            );
            break;
        }
    }
    Ok(session.finalize())
}
