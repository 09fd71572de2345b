//! Decoder for the upstream chunked line protocol.
//!
//! Each non-blank line is either `data: <json chunk>` or the terminator
//! `data: [DONE]`. Lines that are not data frames, and data frames whose
//! JSON does not parse, are skipped.

use serde::Deserialize;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text delta carried by a data frame (possibly empty).
    Delta(String),
    /// Terminal sentinel; nothing after it is consumed.
    Done,
    /// Blank, comment, or malformed line.
    Skip,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

pub fn decode_line(line: &str) -> Frame {
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:") else {
        return Frame::Skip;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    match serde_json::from_str::<Chunk>(payload) {
        Ok(chunk) => Frame::Delta(
            chunk
                .choices
                .into_iter()
                .filter_map(|c| c.delta.and_then(|d| d.content))
                .collect(),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed stream frame");
            Frame::Skip
        }
    }
}

/// Splits an arbitrarily chunked byte stream into lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and drain every completed line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
        }
        lines
    }

    /// The trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).trim_end().to_string())
    }
}
