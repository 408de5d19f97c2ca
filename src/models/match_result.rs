use serde::{Deserialize, Serialize};

use super::{CandidateId, CandidateWindow, Verse};

/// A scored candidate window, the output of a matching session or ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Candidate this result was produced from
    pub candidate: CandidateId,
    pub chapter_id: u32,
    pub chapter_name: String,
    pub start_verse_id: u32,
    pub end_verse_id: u32,
    pub verses: Vec<Verse>,
    /// Similarity ratio in [0, 1]
    pub similarity: f64,
}

impl MatchResult {
    /// Create a result from a candidate window and its score
    pub fn from_candidate(candidate: &CandidateWindow, similarity: f64) -> Self {
        Self {
            candidate: candidate.id,
            chapter_id: candidate.chapter_id,
            chapter_name: candidate.chapter_name.clone(),
            start_verse_id: candidate.start_verse_id,
            end_verse_id: candidate.end_verse_id,
            verses: candidate.verses.clone(),
            similarity,
        }
    }

    /// Verse texts joined by a single space
    pub fn text(&self) -> String {
        self.verses
            .iter()
            .map(|v| v.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }
}
