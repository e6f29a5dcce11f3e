// src/snapshot.rs
//! The latest aggregated telemetry state and its single owner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::location::LocationFix;
use crate::nmea::{Channel, ChannelResult};

pub const MESSAGE_INITIAL: &str = "No data received yet";
pub const MESSAGE_NMEA: &str = "NMEA data received and parsed";
pub const MESSAGE_LOCATION: &str = "Location data received";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub status: Status,
    pub message: String,
    #[serde(rename = "parsed_data")]
    pub channels: BTreeMap<Channel, ChannelResult>,
    pub location: Option<LocationFix>,
    #[serde(rename = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// State before anything has been ingested.
    pub fn initial() -> Self {
        Self {
            status: Status::Success,
            message: MESSAGE_INITIAL.to_string(),
            channels: BTreeMap::new(),
            location: None,
            updated_at: None,
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelResult> {
        self.channels.get(&channel)
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Owns the live [`Snapshot`].
///
/// Writers are serialized by `writer` for the whole read-modify-publish
/// cycle. The finished snapshot is published by swapping the `Arc` under a
/// short write lock, so readers only ever see complete snapshots.
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::initial())),
            writer: Mutex::new(()),
        }
    }

    /// The live snapshot. Later writes publish a new value and never touch
    /// the one returned here.
    pub fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Overwrite one channel's entry, keeping the other channel and the location.
    pub fn replace_channel(&self, channel: Channel, result: ChannelResult) -> Arc<Snapshot> {
        self.update(|previous| {
            let mut channels = previous.channels.clone();
            channels.insert(channel, result);
            Snapshot {
                status: Status::Success,
                message: MESSAGE_NMEA.to_string(),
                channels,
                location: previous.location.clone(),
                updated_at: previous.updated_at,
            }
        })
    }

    /// Replace the whole channel map with the channels of one request. The
    /// location is kept.
    pub fn replace_channels(&self, channels: BTreeMap<Channel, ChannelResult>) -> Arc<Snapshot> {
        self.update(|previous| Snapshot {
            status: Status::Success,
            message: MESSAGE_NMEA.to_string(),
            channels,
            location: previous.location.clone(),
            updated_at: previous.updated_at,
        })
    }

    pub fn merge_location(&self, fix: LocationFix) -> Arc<Snapshot> {
        self.update(|previous| Snapshot {
            status: Status::Success,
            message: MESSAGE_LOCATION.to_string(),
            channels: previous.channels.clone(),
            location: Some(fix),
            updated_at: previous.updated_at,
        })
    }

    fn update<F>(&self, build: F) -> Arc<Snapshot>
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.read();
        let mut next = build(&previous);
        next.updated_at = Some(next_timestamp(previous.updated_at));

        let next = Arc::new(next);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        next
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock time, clamped so it never goes behind the previous write.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    previous.map_or(now, |prev| prev.max(now))
}
