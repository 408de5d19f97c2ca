use serde::{Deserialize, Serialize};

/// One transcribed text segment, produced in temporal order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text as transcribed (not yet normalized)
    pub text: String,
    /// Position in the transcription stream, strictly increasing
    pub sequence_position: u64,
    /// Start time in seconds, when the transcriber reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// End time in seconds, when the transcriber reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(sequence_position: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sequence_position,
            start: None,
            end: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Build segments with positions assigned in order from plain texts
pub fn segments_from_texts<I, S>(texts: I) -> Vec<TranscriptSegment>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| TranscriptSegment::new(i as u64, text))
        .collect()
}
