use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single verse (aya) of canonical text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verse {
    /// Identifier, unique and ordered within its chapter
    pub id: u32,
    /// Literal verse text as found in the corpus
    pub text: String,
}

impl Verse {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// A named, ordered collection of verses (sourate)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub name: String,
    /// Verses in recitation order
    pub verses: Vec<Verse>,
}

impl Chapter {
    pub fn new(id: u32, name: impl Into<String>, verses: Vec<Verse>) -> Self {
        Self {
            id,
            name: name.into(),
            verses,
        }
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }
}

/// The static verse corpus, loaded once and never mutated
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    pub chapters: Vec<Chapter>,
}

impl Corpus {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Total number of verses across all chapters
    pub fn verse_count(&self) -> usize {
        self.chapters.iter().map(Chapter::verse_count).sum()
    }

    /// Get a chapter by its identifier
    pub fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    /// Content hash used as the corpus version for index caching
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
