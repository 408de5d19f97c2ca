pub mod error;
pub mod io;
pub mod matching;
pub mod models;
pub mod speaker;
pub mod text;

pub use error::MatchError;
pub use io::{load_corpus, load_segments, parse_corpus_json, parse_segments_json, MatchReport, RankReport};
pub use matching::{
    build_candidates, rank_candidates, rank_index, run_stream, CandidateCache, CandidateIndex,
    ConsumeOutcome, EngineConfig, MatchSession, RankConfig, SessionObserver, SessionOutcome,
    SessionProgress, StopReason, TracingObserver,
};
pub use models::{
    CandidateId, CandidateWindow, Chapter, Corpus, MatchResult, TranscriptSegment, Verse,
    WindowConfig,
};
pub use speaker::{top_predictions, ScoreTable, SpeakerClassifier, SpeakerPrediction};
pub use text::{normalize_arabic, similarity, ArabicNormalizer, Normalizer, PreambleConfig};
