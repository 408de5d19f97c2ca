use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::Verse;
use crate::text::PreparedText;

/// Default window lengths, in verses
pub const DEFAULT_WINDOW_SIZES: [usize; 5] = [1, 2, 3, 4, 5];

/// Configuration for candidate window generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window lengths in verses, generated in this order for each chapter
    pub window_sizes: Vec<usize>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_sizes: DEFAULT_WINDOW_SIZES.to_vec(),
        }
    }
}

impl WindowConfig {
    pub fn new(window_sizes: Vec<usize>) -> Self {
        Self { window_sizes }
    }

    /// Window sizes actually used for generation
    ///
    /// Zero is dropped and repeated sizes keep only their first occurrence,
    /// so every generated window has a distinct verse range.
    pub fn effective_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.window_sizes.len());
        for &w in &self.window_sizes {
            if w > 0 && !sizes.contains(&w) {
                sizes.push(w);
            }
        }
        sizes
    }
}

/// Position of a candidate in the index arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub usize);

/// A contiguous span of verses treated as one comparison unit
#[derive(Debug, Clone)]
pub struct CandidateWindow {
    pub id: CandidateId,
    pub chapter_id: u32,
    pub chapter_name: String,
    pub start_verse_id: u32,
    pub end_verse_id: u32,
    /// The contiguous, in-order verse slice this window covers
    pub verses: Vec<Verse>,
    /// Slots of the covered verses in the index's prepared-verse arena
    pub verse_slots: Range<usize>,
    /// Normalized text of the verses joined by a single space
    pub text: PreparedText,
}

impl CandidateWindow {
    /// Number of verses in this window
    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn normalized_text(&self) -> &str {
        self.text.as_str()
    }

    /// Verse range key, unique within a chapter
    pub fn range(&self) -> (u32, u32) {
        (self.start_verse_id, self.end_verse_id)
    }
}
