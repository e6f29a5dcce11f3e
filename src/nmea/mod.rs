// src/nmea/mod.rs
//! NMEA 0183 sentence parsing and batch ingestion

pub mod decode;
pub mod section;
pub mod sentence;

pub use decode::{Decoded, HeadingReference, Measurement, SentenceKind};
pub use section::{
    ingest_section, ingest_section_with_report, Channel, ChannelResult, IngestReport, RejectedLine,
};
pub use sentence::{checksum, parse_sentence, ParseError, SentenceRecord};
