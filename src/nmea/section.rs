// src/nmea/section.rs
//! Batch ingestion: one newline-delimited section in, the sentences that parsed out

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sentence::{parse_sentence, ParseError, SentenceRecord};

/// The two named ingestion streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// Heading, deviation and variation
    #[serde(rename = "HDV")]
    Hdv,
    /// Instrument data (wind, depth, water speed, temperature, ...)
    #[serde(rename = "INS")]
    Ins,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Hdv, Channel::Ins];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Hdv => "HDV",
            Channel::Ins => "INS",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentences that parsed from one batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChannelResult(Vec<SentenceRecord>);

impl ChannelResult {
    pub fn new(records: Vec<SentenceRecord>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[SentenceRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SentenceRecord> {
        self.0.iter()
    }
}

impl FromIterator<SentenceRecord> for ChannelResult {
    fn from_iter<I: IntoIterator<Item = SentenceRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ChannelResult {
    type Item = SentenceRecord;
    type IntoIter = std::vec::IntoIter<SentenceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A line that was dropped from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number within the batch
    pub line_number: usize,
    pub line: String,
    pub error: ParseError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub records: ChannelResult,
    pub rejected: Vec<RejectedLine>,
}

/// Parse every non-blank line of `batch`, dropping lines that fail.
pub fn ingest_section(batch: &str) -> ChannelResult {
    ingest_section_with_report(batch).records
}

/// Like [`ingest_section`] but also returns the rejected lines.
pub fn ingest_section_with_report(batch: &str) -> IngestReport {
    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for (index, line) in batch.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_sentence(line) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(line_number = index + 1, line = line.trim(), %error, "Dropping NMEA sentence");
                rejected.push(RejectedLine {
                    line_number: index + 1,
                    line: line.trim().to_string(),
                    error,
                });
            }
        }
    }

    debug!(
        accepted = records.len(),
        rejected = rejected.len(),
        "Parsed NMEA section"
    );

    IngestReport {
        records: ChannelResult(records),
        rejected,
    }
}
