use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::CandidateIndex;
use crate::error::{MatchError, Result};
use crate::models::{CandidateWindow, MatchResult, TranscriptSegment};
use crate::text::{PreambleCleaner, PreambleConfig, PreparedText, Scorer};

/// Per-verse score at which a single verse is considered recognized
pub const SCORE_HIGH: f64 = 0.60;
/// Per-verse score that, held by two adjacent verses, is considered recognized
pub const SCORE_MEDIUM: f64 = 0.35;

/// Configuration for the incremental match engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rule A threshold: one verse at or above this stops the session
    pub score_high: f64,
    /// Rule B threshold: two adjacent verses at or above this stop the session
    pub score_medium: f64,
    /// Apply the early-stop rules at all
    pub early_stop: bool,
    /// Preamble removal applied to the running transcript before scoring
    pub preamble: PreambleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            score_high: SCORE_HIGH,
            score_medium: SCORE_MEDIUM,
            early_stop: true,
            preamble: PreambleConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Config that scores every candidate on every segment
    pub fn exhaustive() -> Self {
        Self {
            early_stop: false,
            ..Default::default()
        }
    }
}

/// Why a session stopped before its segments ran out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StopReason {
    /// One verse of a candidate reached the high threshold
    HighConfidence {
        chapter_id: u32,
        verse_id: u32,
        score: f64,
    },
    /// Two adjacent verses of a candidate both reached the medium threshold
    SustainedMedium {
        chapter_id: u32,
        first_verse_id: u32,
        second_verse_id: u32,
        first_score: f64,
        second_score: f64,
    },
}

/// What a single `consume` call did
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// The running transcript is still blank; nothing was scored
    Skipped,
    /// All candidates were scored and no stop rule fired
    Continued,
    /// A stop rule fired; the session is terminated
    Stopped(StopReason),
}

impl ConsumeOutcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, ConsumeOutcome::Stopped(_))
    }
}

/// Snapshot handed to observers after every `consume`
#[derive(Debug, Clone)]
pub struct SessionProgress {
    pub session_id: Uuid,
    /// Position of the segment just consumed
    pub sequence_position: u64,
    pub segments_consumed: usize,
    pub outcome: ConsumeOutcome,
    pub best_score: f64,
    /// Length of the running transcript in characters
    pub transcript_chars: usize,
    pub terminated: bool,
}

/// Receives progress notifications from a matching session
pub trait SessionObserver: Send {
    fn on_progress(&mut self, progress: &SessionProgress);
}

/// Observer that reports progress as tracing debug events
#[derive(Debug, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_progress(&mut self, progress: &SessionProgress) {
        debug!(
            session = %progress.session_id,
            "Segment {} consumed: {:?}, best score {:.3}, transcript {} chars",
            progress.sequence_position,
            progress.outcome,
            progress.best_score,
            progress.transcript_chars
        );
    }
}

/// Final state of a matching session
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    /// Best candidate seen, `None` when nothing overlapped at all
    pub best_match: Option<MatchResult>,
    /// Whether an early-stop rule ended the session
    pub terminated: bool,
    pub stop_reason: Option<StopReason>,
    pub segments_consumed: usize,
    /// Normalized running transcript at the end of the session
    pub transcript: String,
}

/// Incremental matching session over a stream of transcript segments
///
/// Each segment is normalized and appended to the running transcript, which is
/// then scored against every candidate in index order. The best candidate is
/// replaced only on strict improvement, so ties keep the earliest candidate.
/// After scoring a candidate, its verses are scored individually and the
/// session terminates when:
/// 1. any verse reaches `score_high`, or
/// 2. two adjacent verses both reach `score_medium`.
pub struct MatchSession {
    id: Uuid,
    index: Arc<CandidateIndex>,
    config: EngineConfig,
    cleaner: PreambleCleaner,
    scorer: Scorer,
    running_transcript: String,
    best_match: Option<MatchResult>,
    best_score: f64,
    segments_consumed: usize,
    last_position: Option<u64>,
    terminated: bool,
    stop_reason: Option<StopReason>,
    /// Per-verse scores for the current segment, by verse slot
    verse_scores: Vec<Option<f64>>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl MatchSession {
    pub fn new(index: Arc<CandidateIndex>, config: EngineConfig) -> Self {
        let cleaner = PreambleCleaner::new(&config.preamble, index.normalizer());
        let verse_scores = vec![None; index.verse_slot_count()];
        let id = Uuid::new_v4();
        debug!(session = %id, "Starting match session over {} candidates", index.len());

        Self {
            id,
            index,
            config,
            cleaner,
            scorer: Scorer::new(),
            running_transcript: String::new(),
            best_match: None,
            best_score: 0.0,
            segments_consumed: 0,
            last_position: None,
            terminated: false,
            stop_reason: None,
            verse_scores,
            observers: Vec::new(),
        }
    }

    /// Register an observer notified after every `consume`
    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Consume the next segment
    ///
    /// Fails without touching state when the session is already terminated or
    /// the segment is not strictly after the previous one.
    pub fn consume(&mut self, segment: &TranscriptSegment) -> Result<ConsumeOutcome> {
        if self.terminated {
            return Err(MatchError::SessionTerminated {
                segments_consumed: self.segments_consumed,
            });
        }
        if let Some(last) = self.last_position {
            if segment.sequence_position <= last {
                return Err(MatchError::OutOfOrderSegment {
                    last,
                    got: segment.sequence_position,
                });
            }
        }

        self.last_position = Some(segment.sequence_position);
        self.segments_consumed += 1;
        self.running_transcript
            .push_str(&self.index.normalize(&segment.text));

        let scoring_text = self.cleaner.clean(&self.running_transcript);
        let outcome = if scoring_text.is_empty() {
            ConsumeOutcome::Skipped
        } else {
            self.score_all(&PreparedText::new(scoring_text))
        };

        if let ConsumeOutcome::Stopped(reason) = &outcome {
            info!(
                session = %self.id,
                "Early stop after {} segment(s): {:?}",
                self.segments_consumed, reason
            );
            self.terminated = true;
            self.stop_reason = Some(reason.clone());
        }

        self.notify(segment.sequence_position, &outcome);
        Ok(outcome)
    }

    /// Score the transcript against every candidate, stopping at the first rule hit
    fn score_all(&mut self, transcript: &PreparedText) -> ConsumeOutcome {
        let index = Arc::clone(&self.index);
        self.verse_scores.fill(None);

        for candidate in index.candidates() {
            let score = self.scorer.ratio(transcript, &candidate.text);
            if score > self.best_score {
                self.best_score = score;
                self.best_match = Some(MatchResult::from_candidate(candidate, score));
            }

            if !self.config.early_stop {
                continue;
            }
            if let Some(reason) = self.check_stop_rules(&index, transcript, candidate) {
                return ConsumeOutcome::Stopped(reason);
            }
        }

        ConsumeOutcome::Continued
    }

    fn check_stop_rules(
        &mut self,
        index: &CandidateIndex,
        transcript: &PreparedText,
        candidate: &CandidateWindow,
    ) -> Option<StopReason> {
        let mut scores = Vec::with_capacity(candidate.len());
        for slot in candidate.verse_slots.clone() {
            let score = match self.verse_scores[slot] {
                Some(score) => score,
                None => {
                    let score = self.scorer.ratio(transcript, index.verse_text(slot));
                    self.verse_scores[slot] = Some(score);
                    score
                }
            };
            scores.push(score);
        }

        if let Some(i) = scores.iter().position(|&s| s >= self.config.score_high) {
            return Some(StopReason::HighConfidence {
                chapter_id: candidate.chapter_id,
                verse_id: candidate.verses[i].id,
                score: scores[i],
            });
        }

        let medium = self.config.score_medium;
        scores
            .windows(2)
            .position(|pair| pair[0] >= medium && pair[1] >= medium)
            .map(|i| StopReason::SustainedMedium {
                chapter_id: candidate.chapter_id,
                first_verse_id: candidate.verses[i].id,
                second_verse_id: candidate.verses[i + 1].id,
                first_score: scores[i],
                second_score: scores[i + 1],
            })
    }

    fn notify(&mut self, sequence_position: u64, outcome: &ConsumeOutcome) {
        if self.observers.is_empty() {
            return;
        }
        let progress = SessionProgress {
            session_id: self.id,
            sequence_position,
            segments_consumed: self.segments_consumed,
            outcome: outcome.clone(),
            best_score: self.best_score,
            transcript_chars: self.running_transcript.chars().count(),
            terminated: self.terminated,
        };
        for observer in &mut self.observers {
            observer.on_progress(&progress);
        }
    }

    /// Consume segments in order until they run out or the session stops
    pub fn consume_all<'s, I>(&mut self, segments: I) -> Result<()>
    where
        I: IntoIterator<Item = &'s TranscriptSegment>,
    {
        for segment in segments {
            if self.consume(segment)?.is_stopped() {
                break;
            }
        }
        Ok(())
    }

    /// End the session and hand back its result
    pub fn finalize(self) -> SessionOutcome {
        info!(
            session = %self.id,
            "Session finished: {} segment(s), best score {:.3}, terminated={}",
            self.segments_consumed, self.best_score, self.terminated
        );
        SessionOutcome {
            session_id: self.id,
            best_match: self.best_match,
            terminated: self.terminated,
            stop_reason: self.stop_reason,
            segments_consumed: self.segments_consumed,
            transcript: self.running_transcript,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn best_match(&self) -> Option<&MatchResult> {
        self.best_match.as_ref()
    }

    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    pub fn segments_consumed(&self) -> usize {
        self.segments_consumed
    }

    /// Normalized concatenation of all segments consumed so far
    pub fn running_transcript(&self) -> &str {
        &self.running_transcript
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::{segments_from_texts, Chapter, Corpus, Verse, WindowConfig};

    fn scenario_index() -> Arc<CandidateIndex> {
        let corpus = Corpus::new(vec![Chapter::new(
            1,
            "Test",
            vec![Verse::new(1, "ا ل ح م د"), Verse::new(2, "ل ل ه")],
        )]);
        Arc::new(CandidateIndex::build(&corpus, &WindowConfig::new(vec![1, 2])))
    }

    fn ikhlas_index() -> Arc<CandidateIndex> {
        let corpus = Corpus::new(vec![Chapter::new(
            112,
            "Al-Ikhlas",
            vec![
                Verse::new(1, "قُلْ هُوَ اللَّهُ أَحَدٌ"),
                Verse::new(2, "اللَّهُ الصَّمَدُ"),
                Verse::new(3, "لَمْ يَلِدْ وَلَمْ يُولَدْ"),
                Verse::new(4, "وَلَمْ يَكُن لَّهُ كُفُوًا أَحَدٌ"),
            ],
        )]);
        Arc::new(CandidateIndex::build(&corpus, &WindowConfig::default()))
    }

    #[test]
    fn test_exact_verse_fires_high_confidence() {
        let mut session = MatchSession::new(scenario_index(), EngineConfig::default());
        let outcome = session
            .consume(&TranscriptSegment::new(0, "ا ل ح م د"))
            .unwrap();

        assert!(matches!(
            outcome,
            ConsumeOutcome::Stopped(StopReason::HighConfidence { verse_id: 1, .. })
        ));
        let result = session.finalize();
        assert!(result.terminated);
        let best = result.best_match.unwrap();
        assert_eq!((best.start_verse_id, best.end_verse_id), (1, 1));
        assert!((best.similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_consume_after_termination_is_rejected() {
        let mut session = MatchSession::new(scenario_index(), EngineConfig::default());
        session
            .consume(&TranscriptSegment::new(0, "ا ل ح م د"))
            .unwrap();
        let transcript_before = session.running_transcript().to_string();

        let err = session
            .consume(&TranscriptSegment::new(1, " ل ل ه"))
            .unwrap_err();
        assert_eq!(err, MatchError::SessionTerminated { segments_consumed: 1 });
        assert_eq!(session.running_transcript(), transcript_before);
        assert_eq!(session.segments_consumed(), 1);
    }

    #[test]
    fn test_out_of_order_segment_is_rejected() {
        let mut session = MatchSession::new(ikhlas_index(), EngineConfig::exhaustive());
        session.consume(&TranscriptSegment::new(3, "قل")).unwrap();

        let err = session.consume(&TranscriptSegment::new(3, " هو")).unwrap_err();
        assert_eq!(err, MatchError::OutOfOrderSegment { last: 3, got: 3 });
        assert_eq!(session.running_transcript(), "قل");
    }

    #[test]
    fn test_blank_segments_are_skipped() {
        let mut session = MatchSession::new(ikhlas_index(), EngineConfig::default());
        let outcome = session.consume(&TranscriptSegment::new(0, "   ")).unwrap();

        assert_eq!(outcome, ConsumeOutcome::Skipped);
        assert!(session.best_match().is_none());
        assert!(!session.is_terminated());
        assert_eq!(session.segments_consumed(), 1);
    }

    #[test]
    fn test_empty_index_never_matches() {
        let index = Arc::new(CandidateIndex::build(&Corpus::default(), &WindowConfig::default()));
        let mut session = MatchSession::new(index, EngineConfig::default());
        let segments = segments_from_texts(["قل هو الله احد", " الله الصمد"]);
        session.consume_all(&segments).unwrap();

        let result = session.finalize();
        assert!(result.best_match.is_none());
        assert!(!result.terminated);
        assert_eq!(result.segments_consumed, 2);
    }

    #[test]
    fn test_running_transcript_grows_monotonically() {
        let mut session = MatchSession::new(ikhlas_index(), EngineConfig::exhaustive());
        let segments = segments_from_texts(["قُلْ", " ", " هُوَ", "", " اللَّهُ"]);

        let mut last_len = 0;
        for segment in &segments {
            session.consume(segment).unwrap();
            let len = session.running_transcript().len();
            assert!(len >= last_len);
            last_len = len;
        }
        assert_eq!(session.running_transcript(), "قل  هو الله");
    }

    #[test]
    fn test_sustained_medium_fires_on_adjacent_verses() {
        // Neither verse reaches 0.9 alone, but both clear 0.3 together
        let config = EngineConfig {
            score_high: 0.9,
            score_medium: 0.3,
            ..Default::default()
        };
        let mut session = MatchSession::new(scenario_index(), config);
        let outcome = session
            .consume(&TranscriptSegment::new(0, "ا ل ح م د ل ل ه"))
            .unwrap();

        match outcome {
            ConsumeOutcome::Stopped(StopReason::SustainedMedium {
                first_verse_id,
                second_verse_id,
                ..
            }) => {
                assert_eq!((first_verse_id, second_verse_id), (1, 2));
            }
            other => panic!("expected sustained medium stop, got {other:?}"),
        }
        assert!(session.is_terminated());
    }

    #[test]
    fn test_early_stop_disabled_scores_everything() {
        let mut session = MatchSession::new(scenario_index(), EngineConfig::exhaustive());
        let outcome = session
            .consume(&TranscriptSegment::new(0, "ا ل ح م د ل ل ه"))
            .unwrap();

        assert_eq!(outcome, ConsumeOutcome::Continued);
        let best = session.best_match().unwrap();
        assert_eq!((best.start_verse_id, best.end_verse_id), (1, 2));
        assert!((best.similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_preamble_is_ignored_when_enabled() {
        let config = EngineConfig {
            preamble: PreambleConfig::enabled(),
            ..Default::default()
        };
        let mut session = MatchSession::new(ikhlas_index(), config);
        let outcome = session
            .consume(&TranscriptSegment::new(0, "بسم الله الرحمن الرحيم"))
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::Skipped);

        session
            .consume(&TranscriptSegment::new(1, " قل هو الله احد"))
            .unwrap();
        let best = session.best_match().unwrap();
        assert_eq!((best.chapter_id, best.start_verse_id, best.end_verse_id), (112, 1, 1));
        assert!((best.similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let corpus = Corpus::new(vec![
            Chapter::new(7, "First", vec![Verse::new(1, "قل هو الله احد")]),
            Chapter::new(3, "Second", vec![Verse::new(1, "قل هو الله احد")]),
        ]);
        let index = Arc::new(CandidateIndex::build(&corpus, &WindowConfig::new(vec![1])));
        let mut session = MatchSession::new(index, EngineConfig::exhaustive());
        session
            .consume(&TranscriptSegment::new(0, "قل هو الله احد"))
            .unwrap();

        let best = session.best_match().unwrap();
        assert_eq!(best.chapter_id, 7);
        assert!((best.similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sustained_medium_needs_adjacent_verses() {
        let corpus = Corpus::new(vec![Chapter::new(
            1,
            "Test",
            vec![Verse::new(1, "قل"), Verse::new(2, "من"), Verse::new(3, "هو")],
        )]);
        let index = Arc::new(CandidateIndex::build(&corpus, &WindowConfig::new(vec![3])));
        let config = EngineConfig {
            score_high: 0.9,
            score_medium: 0.3,
            ..Default::default()
        };
        let mut session = MatchSession::new(index, config);

        // Verses 1 and 3 score 2/3 each, verse 2 shares nothing
        let outcome = session
            .consume(&TranscriptSegment::new(0, "قلهو"))
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::Continued);
        assert!(!session.is_terminated());
    }

    struct Recorder(Arc<Mutex<Vec<(u64, bool)>>>);

    impl SessionObserver for Recorder {
        fn on_progress(&mut self, progress: &SessionProgress) {
            self.0
                .lock()
                .unwrap()
                .push((progress.sequence_position, progress.terminated));
        }
    }

    #[test]
    fn test_observer_notified_after_each_consume() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut session = MatchSession::new(ikhlas_index(), EngineConfig::default())
            .with_observer(Recorder(Arc::clone(&events)));

        let segments = segments_from_texts([" ", "قُلْ هُوَ اللَّهُ أَحَدٌ", " اللَّهُ الصَّمَدُ"]);
        session.consume_all(&segments).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(*events, vec![(0, false), (1, true)]);
    }
}
