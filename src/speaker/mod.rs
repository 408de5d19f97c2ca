use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Number of reciters reported by default
pub const DEFAULT_TOP_SPEAKERS: usize = 3;

/// One reciter hypothesis with its probability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerPrediction {
    pub name: String,
    pub probability: f64,
}

/// Classifies the reciter of a clip once its chapter is known
///
/// The acoustic model lives outside this crate; implementations wrap whatever
/// produces per-reciter probabilities for a chapter.
pub trait SpeakerClassifier {
    fn predict(&self, chapter_id: u32) -> Result<Vec<SpeakerPrediction>>;
}

/// Precomputed classifier output keyed by chapter id
///
/// JSON shape: `{ "112": { "reciter name": 0.82, ... }, ... }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    scores: BTreeMap<u32, BTreeMap<String, f64>>,
}

impl ScoreTable {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse speaker score table")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn insert(&mut self, chapter_id: u32, name: impl Into<String>, probability: f64) {
        self.scores
            .entry(chapter_id)
            .or_default()
            .insert(name.into(), probability);
    }

    /// Chapters with at least one reciter score
    pub fn chapters(&self) -> impl Iterator<Item = u32> + '_ {
        self.scores.keys().copied()
    }
}

impl SpeakerClassifier for ScoreTable {
    fn predict(&self, chapter_id: u32) -> Result<Vec<SpeakerPrediction>> {
        Ok(self
            .scores
            .get(&chapter_id)
            .map(|by_name| {
                by_name
                    .iter()
                    .map(|(name, &probability)| SpeakerPrediction {
                        name: name.clone(),
                        probability,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Sort predictions by probability (descending) and keep the best `k`
///
/// Equal probabilities keep their incoming order.
pub fn top_predictions(mut predictions: Vec<SpeakerPrediction>, k: usize) -> Vec<SpeakerPrediction> {
    predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    predictions.truncate(k);
    predictions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_table_from_json() {
        let json = r#"{"112": {"Sudais": 0.2, "Husary": 0.7, "Minshawi": 0.1}, "1": {"Husary": 1.0}}"#;
        let table = ScoreTable::from_json(json).unwrap();

        assert_eq!(table.chapters().collect::<Vec<_>>(), vec![1, 112]);
        let top = top_predictions(table.predict(112).unwrap(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Husary");
        assert_eq!(top[1].name, "Sudais");
    }

    #[test]
    fn test_unknown_chapter_is_empty() {
        let mut table = ScoreTable::default();
        table.insert(2, "Husary", 0.5);
        assert!(table.predict(3).unwrap().is_empty());
    }

    #[test]
    fn test_top_predictions_truncates() {
        let predictions = (0..5)
            .map(|i| SpeakerPrediction {
                name: format!("r{i}"),
                probability: i as f64 / 10.0,
            })
            .collect();
        let top = top_predictions(predictions, DEFAULT_TOP_SPEAKERS);
        let names: Vec<&str> = top.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["r4", "r3", "r2"]);
    }
}
