use rayon::prelude::*;
use tracing::debug;

use super::CandidateIndex;
use crate::models::{Corpus, MatchResult, WindowConfig};
use crate::text::{PreambleCleaner, PreambleConfig, PreparedText, Scorer};

/// Default number of ranked matches returned
pub const DEFAULT_TOP_K: usize = 5;

/// Configuration for batch ranking
#[derive(Debug, Clone)]
pub struct RankConfig {
    /// Maximum number of matches returned
    pub top_k: usize,
    /// Preamble removal applied to the transcript before scoring
    pub preamble: PreambleConfig,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            preamble: PreambleConfig::default(),
        }
    }
}

/// Score a complete transcript against every candidate and keep the best `top_k`
///
/// Candidates are scored in parallel, but results are collected in candidate
/// order and stable-sorted, so ties always resolve to the earlier candidate.
/// Candidates with zero similarity are never reported.
pub fn rank_index(
    index: &CandidateIndex,
    full_transcript: &str,
    config: &RankConfig,
) -> Vec<MatchResult> {
    if config.top_k == 0 || index.is_empty() {
        return Vec::new();
    }

    let cleaner = PreambleCleaner::new(&config.preamble, index.normalizer());
    let text = cleaner.clean(&index.normalize(full_transcript));
    if text.is_empty() {
        debug!("Blank transcript, nothing to rank");
        return Vec::new();
    }
    let transcript = PreparedText::new(text);

    let scores: Vec<f64> = index
        .candidates()
        .par_iter()
        .map_init(Scorer::new, |scorer, candidate| {
            scorer.ratio(&transcript, &candidate.text)
        })
        .collect();

    let mut ranked: Vec<(usize, f64)> = scores
        .into_iter()
        .enumerate()
        .filter(|&(_, score)| score > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(config.top_k);

    debug!(
        "Ranked {} candidates, kept {}",
        index.len(),
        ranked.len()
    );

    let candidates = index.candidates();
    ranked
        .into_iter()
        .map(|(i, score)| MatchResult::from_candidate(&candidates[i], score))
        .collect()
}

/// Build an index for `corpus` and rank `full_transcript` against it
pub fn rank_candidates(
    full_transcript: &str,
    corpus: &Corpus,
    window_config: &WindowConfig,
    top_k: usize,
) -> Vec<MatchResult> {
    let index = CandidateIndex::build(corpus, window_config);
    let config = RankConfig {
        top_k,
        ..Default::default()
    };
    rank_index(&index, full_transcript, &config)
}
