use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::matching::{SessionOutcome, StopReason};
use crate::models::MatchResult;
use crate::speaker::SpeakerPrediction;

/// Machine-readable result of an incremental session
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub session_id: Uuid,
    pub best_match: Option<MatchResult>,
    pub terminated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub segments_consumed: usize,
    /// Reciter hypotheses for the matched chapter
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub speakers: Vec<SpeakerPrediction>,
}

impl MatchReport {
    pub fn from_outcome(outcome: SessionOutcome, speakers: Vec<SpeakerPrediction>) -> Self {
        Self {
            session_id: outcome.session_id,
            best_match: outcome.best_match,
            terminated: outcome.terminated,
            stop_reason: outcome.stop_reason,
            segments_consumed: outcome.segments_consumed,
            speakers,
        }
    }

    /// Format for display
    pub fn format(&self) -> String {
        let mut output = String::new();

        match &self.best_match {
            Some(best) => {
                output.push_str("Best match:\n");
                output.push_str(&format_match(best));
            }
            None => {
                output.push_str("No verse detected.\n");
                return output;
            }
        }

        if let Some(reason) = &self.stop_reason {
            output.push_str(&format!(
                "Stopped early after {} segment(s): {}\n",
                self.segments_consumed,
                describe_stop(reason)
            ));
        }

        if !self.speakers.is_empty() {
            output.push_str("\nMost likely reciters:\n");
            for speaker in &self.speakers {
                output.push_str(&format!(
                    "  {:<30} : {:.1}%\n",
                    speaker.name,
                    speaker.probability * 100.0
                ));
            }
        }

        output
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

/// Machine-readable result of a batch ranking
#[derive(Debug, Clone, Serialize)]
pub struct RankReport {
    pub top_k: usize,
    pub matches: Vec<MatchResult>,
}

impl RankReport {
    pub fn format(&self) -> String {
        if self.matches.is_empty() {
            return "No verse detected.\n".to_string();
        }

        let mut output = String::new();
        for (rank, m) in self.matches.iter().enumerate() {
            output.push_str(&format!("#{}\n", rank + 1));
            output.push_str(&format_match(m));
            output.push('\n');
        }
        output
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }
}

fn format_match(m: &MatchResult) -> String {
    format!(
        "Chapter {} ({}) | Verses {} to {}\nText: {}\nScore: {:.2}%\n",
        m.chapter_id,
        m.chapter_name,
        m.start_verse_id,
        m.end_verse_id,
        m.text(),
        m.similarity * 100.0
    )
}

fn describe_stop(reason: &StopReason) -> String {
    match reason {
        StopReason::HighConfidence {
            verse_id, score, ..
        } => format!("verse {} scored {:.2}%", verse_id, score * 100.0),
        StopReason::SustainedMedium {
            first_verse_id,
            second_verse_id,
            ..
        } => format!(
            "verses {} and {} both above the medium threshold",
            first_verse_id, second_verse_id
        ),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    serde_json::to_writer_pretty(&mut file, value).context("Failed to write JSON")?;
    writeln!(file)?;
    Ok(())
}
