use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::models::{CandidateId, CandidateWindow, Corpus, WindowConfig};
use crate::text::{ArabicNormalizer, Normalizer, PreparedText};

/// Precomputed arena of candidate windows for one corpus and window-size set
///
/// Built once per corpus load and never mutated afterwards, so it can be shared
/// across sessions and threads. Alongside the windows it keeps one prepared
/// text per corpus verse; windows refer to those slots for per-verse scoring.
pub struct CandidateIndex {
    corpus_version: u64,
    window_sizes: Vec<usize>,
    candidates: Vec<CandidateWindow>,
    verse_texts: Vec<PreparedText>,
    normalizer: Arc<dyn Normalizer>,
}

impl CandidateIndex {
    /// Build an index using the Arabic normalizer
    pub fn build(corpus: &Corpus, config: &WindowConfig) -> Self {
        Self::build_with(corpus, config, Arc::new(ArabicNormalizer))
    }

    /// Build an index with a custom normalizer
    ///
    /// Candidates are ordered by chapter, then window size (in configured
    /// order), then start offset. This order is the tie-break authority for
    /// every matching mode.
    pub fn build_with(
        corpus: &Corpus,
        config: &WindowConfig,
        normalizer: Arc<dyn Normalizer>,
    ) -> Self {
        let window_sizes = config.effective_sizes();
        let mut candidates = Vec::new();
        let mut verse_texts = Vec::with_capacity(corpus.verse_count());

        for chapter in &corpus.chapters {
            let first_slot = verse_texts.len();
            let normalized: Vec<String> = chapter
                .verses
                .iter()
                .map(|v| normalizer.normalize(&v.text))
                .collect();
            verse_texts.extend(normalized.iter().cloned().map(PreparedText::new));

            for &w in &window_sizes {
                if chapter.verses.len() < w {
                    debug!(
                        "Chapter {} has {} verses, skipping window size {}",
                        chapter.id,
                        chapter.verses.len(),
                        w
                    );
                    continue;
                }

                for start in 0..=(chapter.verses.len() - w) {
                    let verses = chapter.verses[start..start + w].to_vec();
                    let text = normalized[start..start + w].join(" ");
                    candidates.push(CandidateWindow {
                        id: CandidateId(candidates.len()),
                        chapter_id: chapter.id,
                        chapter_name: chapter.name.clone(),
                        start_verse_id: verses[0].id,
                        end_verse_id: verses[w - 1].id,
                        verses,
                        verse_slots: first_slot + start..first_slot + start + w,
                        text: PreparedText::new(text),
                    });
                }
            }
        }

        info!(
            "Indexed {} candidate windows over {} chapters (window sizes {:?})",
            candidates.len(),
            corpus.chapters.len(),
            window_sizes
        );

        Self {
            corpus_version: corpus.fingerprint(),
            window_sizes,
            candidates,
            verse_texts,
            normalizer,
        }
    }

    /// All candidates in deterministic order
    pub fn candidates(&self) -> &[CandidateWindow] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Prepared normalized text of a verse slot
    pub fn verse_text(&self, slot: usize) -> &PreparedText {
        &self.verse_texts[slot]
    }

    /// Number of verse slots (one per corpus verse)
    pub fn verse_slot_count(&self) -> usize {
        self.verse_texts.len()
    }

    /// Normalize text with the collaborator this index was built with
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    pub fn normalizer(&self) -> &dyn Normalizer {
        self.normalizer.as_ref()
    }

    pub fn corpus_version(&self) -> u64 {
        self.corpus_version
    }

    /// Effective window sizes used to build this index
    pub fn window_sizes(&self) -> &[usize] {
        &self.window_sizes
    }
}

impl fmt::Debug for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateIndex")
            .field("corpus_version", &self.corpus_version)
            .field("window_sizes", &self.window_sizes)
            .field("candidates", &self.candidates.len())
            .field("verse_slots", &self.verse_texts.len())
            .finish()
    }
}

/// Expand a corpus into its candidate windows
pub fn build_candidates(corpus: &Corpus, window_sizes: &[usize]) -> Vec<CandidateWindow> {
    CandidateIndex::build(corpus, &WindowConfig::new(window_sizes.to_vec())).candidates
}

/// Caches the candidate index for the most recent `(corpus, window sizes)` pair
pub struct CandidateCache {
    normalizer: Arc<dyn Normalizer>,
    entry: Option<(u64, Vec<usize>, Arc<CandidateIndex>)>,
    builds: usize,
}

impl Default for CandidateCache {
    fn default() -> Self {
        Self::new(Arc::new(ArabicNormalizer))
    }
}

impl CandidateCache {
    pub fn new(normalizer: Arc<dyn Normalizer>) -> Self {
        Self {
            normalizer,
            entry: None,
            builds: 0,
        }
    }

    /// Return the cached index, rebuilding only when the key changed
    pub fn get_or_build(&mut self, corpus: &Corpus, config: &WindowConfig) -> Arc<CandidateIndex> {
        let version = corpus.fingerprint();
        let sizes = config.effective_sizes();

        if let Some((cached_version, cached_sizes, index)) = &self.entry {
            if *cached_version == version && *cached_sizes == sizes {
                debug!("Candidate index cache hit (corpus version {:x})", version);
                return Arc::clone(index);
            }
        }

        let index = Arc::new(CandidateIndex::build_with(
            corpus,
            config,
            Arc::clone(&self.normalizer),
        ));
        self.builds += 1;
        self.entry = Some((version, sizes, Arc::clone(&index)));
        index
    }

    /// Number of times an index has been built
    pub fn builds(&self) -> usize {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::models::{Chapter, Verse};

    fn chapter(id: u32, n: u32) -> Chapter {
        let verses = (1..=n).map(|i| Verse::new(i, format!("آية {i}"))).collect();
        Chapter::new(id, format!("Chapter {id}"), verses)
    }

    #[test]
    fn test_window_completeness() {
        let corpus = Corpus::new(vec![chapter(1, 7)]);
        let candidates = build_candidates(&corpus, &[1, 2, 3]);

        assert_eq!(candidates.len(), 7 + 6 + 5);
        let ranges: HashSet<(u32, u32)> = candidates.iter().map(|c| c.range()).collect();
        assert_eq!(ranges.len(), candidates.len());
    }

    #[test]
    fn test_deterministic_order() {
        let corpus = Corpus::new(vec![chapter(1, 3), chapter(2, 2)]);
        let keys: Vec<(u32, usize, u32)> = build_candidates(&corpus, &[2, 1])
            .iter()
            .map(|c| (c.chapter_id, c.len(), c.start_verse_id))
            .collect();

        assert_eq!(
            keys,
            vec![
                (1, 2, 1),
                (1, 2, 2),
                (1, 1, 1),
                (1, 1, 2),
                (1, 1, 3),
                (2, 2, 1),
                (2, 1, 1),
                (2, 1, 2),
            ]
        );
    }

    #[test]
    fn test_windows_are_contiguous_slices() {
        let corpus = Corpus::new(vec![chapter(1, 5)]);
        let index = CandidateIndex::build(&corpus, &WindowConfig::default());

        for c in index.candidates() {
            let start = (c.start_verse_id - 1) as usize;
            assert_eq!(c.verses, corpus.chapters[0].verses[start..start + c.len()]);
            assert_eq!(c.verse_slots.len(), c.len());
            assert_eq!(index.candidates()[c.id.0].range(), c.range());
        }
    }

    #[test]
    fn test_normalized_text_joined_with_space() {
        let corpus = Corpus::new(vec![Chapter::new(
            1,
            "Test",
            vec![Verse::new(1, "قُلْ"), Verse::new(2, "أَحَدٌ")],
        )]);
        let candidates = build_candidates(&corpus, &[2]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].normalized_text(), "قل احد");
    }

    #[test]
    fn test_short_chapter_skipped() {
        let corpus = Corpus::new(vec![chapter(1, 2), chapter(2, 4)]);
        let candidates = build_candidates(&corpus, &[3]);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.chapter_id == 2));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(build_candidates(&Corpus::default(), &[1, 2]).is_empty());
        assert!(build_candidates(&Corpus::new(vec![chapter(1, 3)]), &[]).is_empty());
    }

    #[test]
    fn test_verse_slots_point_at_normalized_verses() {
        let corpus = Corpus::new(vec![chapter(1, 2), chapter(2, 3)]);
        let index = CandidateIndex::build(&corpus, &WindowConfig::new(vec![1]));

        assert_eq!(index.verse_slot_count(), 5);
        let last = index.candidates().last().unwrap();
        assert_eq!(last.chapter_id, 2);
        assert_eq!(last.verse_slots, 4..5);
        assert_eq!(index.verse_text(4).as_str(), "ايه 3");
    }

    #[test]
    fn test_cache_rebuilds_only_on_key_change() {
        let corpus = Corpus::new(vec![chapter(1, 4)]);
        let mut cache = CandidateCache::default();

        let a = cache.get_or_build(&corpus, &WindowConfig::default());
        let b = cache.get_or_build(&corpus, &WindowConfig::default());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.builds(), 1);

        let c = cache.get_or_build(&corpus, &WindowConfig::new(vec![1]));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.builds(), 2);

        let changed = Corpus::new(vec![chapter(1, 5)]);
        cache.get_or_build(&changed, &WindowConfig::new(vec![1]));
        assert_eq!(cache.builds(), 3);
    }
}
