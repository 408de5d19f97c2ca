use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{Corpus, TranscriptSegment};

/// Load a verse corpus from a JSON file
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_corpus_json(&content)
}

/// Parse a corpus: an array of chapters, each with ordered verses
pub fn parse_corpus_json(json: &str) -> Result<Corpus> {
    serde_json::from_str(json).context("Failed to parse corpus JSON")
}

/// A segment as emitted by the transcriber
#[derive(Debug, Clone, Deserialize)]
struct RawSegment {
    text: String,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

impl RawSegment {
    fn into_segment(self, position: u64) -> TranscriptSegment {
        TranscriptSegment {
            text: self.text,
            sequence_position: position,
            start: self.start,
            end: self.end,
        }
    }
}

/// Either a bare segment list or a full transcription document
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SegmentsFile {
    List(Vec<RawSegment>),
    Document { segments: Vec<RawSegment> },
}

/// Load transcript segments from a JSON file
pub fn load_segments(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_segments_json(&content)
}

/// Parse transcript segments; positions follow array order
pub fn parse_segments_json(json: &str) -> Result<Vec<TranscriptSegment>> {
    let file: SegmentsFile =
        serde_json::from_str(json).context("Failed to parse transcript segments JSON")?;
    let raw = match file {
        SegmentsFile::List(segments) => segments,
        SegmentsFile::Document { segments } => segments,
    };
    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.into_segment(i as u64))
        .collect())
}

/// Parse one JSON Lines record into a segment at the given position
///
/// Blank lines yield `None`.
pub fn parse_segment_line(line: &str, position: u64) -> Result<Option<TranscriptSegment>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let raw: RawSegment = serde_json::from_str(line)
        .with_context(|| format!("Failed to parse segment line {}", position))?;
    Ok(Some(raw.into_segment(position)))
}

/// Read JSON Lines segments from `reader` and send them down `segments`
///
/// Every line takes the next sequence position, including blank and malformed
/// ones. Lines that are not valid UTF-8 are decoded lossily, and lines that
/// fail to parse are skipped with a warning. Returns once the reader hits EOF
/// or the receiving session has gone away.
pub async fn read_segment_lines<R>(
    mut reader: R,
    segments: mpsc::Sender<TranscriptSegment>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut position = 0u64;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read transcript segments")?;
        if read == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        match parse_segment_line(&line, position) {
            Ok(Some(segment)) => {
                if segments.send(segment).await.is_err() {
                    debug!("Session closed, stopped reading at line {}", position);
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => warn!("Skipping segment: {:#}", err),
        }
        position += 1;
    }
    Ok(())
}
