use thiserror::Error;

/// Result type for matching-session operations
pub type Result<T> = std::result::Result<T, MatchError>;

/// Misuse of the matching-session state machine
///
/// Per-segment and per-candidate problems never surface here; they degrade to
/// zero-information input instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("session already terminated after {segments_consumed} segment(s)")]
    SessionTerminated { segments_consumed: usize },

    #[error("segment {got} arrived out of order (last consumed position was {last})")]
    OutOfOrderSegment { last: u64, got: u64 },
}
