// src/lib.rs
//! NMEA Monitor Library
//!
//! Parses batches of NMEA 0183 sentences arriving on the HDV and INS
//! channels, validates Notecard position fixes, and keeps the latest merged
//! snapshot available to concurrent readers over HTTP.

pub mod config;
pub mod error;
pub mod location;
pub mod nmea;
pub mod server;
pub mod snapshot;

// Re-export main types for convenience
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use location::{LocationFix, LocationValidator, ValidationError};
pub use nmea::{ingest_section, parse_sentence, Channel, ChannelResult, ParseError, SentenceRecord};
pub use server::{App, RequestError, Server};
pub use snapshot::{Snapshot, SnapshotStore, Status};
