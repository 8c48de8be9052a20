//! Snapshot storage for the merged model listing.
//!
//! A [`Snapshot`] is the complete list of models found during one refresh,
//! together with the time it was taken. Snapshots are persisted through a
//! [`SnapshotStore`], which only knows how to read back the last snapshot and
//! replace it wholesale. Freshness is decided by the caller with
//! [`Snapshot::is_fresh_at`].
//!
//! On disk a snapshot is a JSON document:
//! ```text
//! { "timestamp": "2024-11-02T10:00:00Z", "models": [["gpt-4o", "openai", 0], ...] }
//! ```

mod file;
#[cfg(test)]
mod memory;

pub(crate) use file::JsonFileStore;
#[cfg(test)]
pub(crate) use memory::MemoryStore;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// How long a snapshot remains usable after it was taken.
pub(crate) const CACHE_VALIDITY_HOURS: i64 = 48;

pub(crate) fn cache_ttl() -> TimeDelta {
    TimeDelta::hours(CACHE_VALIDITY_HOURS)
}

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to access the model cache at \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("the model cache is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize the model cache: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// One model offered by one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawEntry", try_from = "RawEntry")]
pub(crate) struct ModelEntry {
    pub model_name: String,
    pub service_name: String,
    /// Position in the merged listing. `None` for entries which have not been
    /// ranked, such as those returned by a single-service query. Stored as
    /// `-1` on disk.
    pub index: Option<usize>,
}

impl ModelEntry {
    pub(crate) fn unranked(model_name: impl Into<String>, service_name: impl Into<String>) -> Self {
        ModelEntry {
            model_name: model_name.into(),
            service_name: service_name.into(),
            index: None,
        }
    }
}

/// The on-disk form of a [`ModelEntry`]: `[model, service, index]`.
#[derive(Serialize, Deserialize)]
struct RawEntry(String, String, i64);

impl From<ModelEntry> for RawEntry {
    fn from(value: ModelEntry) -> Self {
        let index = match value.index {
            Some(index) => index as i64,
            None => -1,
        };

        RawEntry(value.model_name, value.service_name, index)
    }
}

impl TryFrom<RawEntry> for ModelEntry {
    type Error = String;

    fn try_from(RawEntry(model_name, service_name, index): RawEntry) -> Result<Self, String> {
        let index = match index {
            -1 => None,
            i if i >= 0 => Some(i as usize),
            i => return Err(format!("invalid model index {}", i)),
        };

        Ok(ModelEntry {
            model_name,
            service_name,
            index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub models: Vec<ModelEntry>,
}

impl Snapshot {
    /// Builds a snapshot from merged entries, ranking them in the order given.
    pub(crate) fn ranked(timestamp: DateTime<Utc>, models: Vec<ModelEntry>) -> Snapshot {
        let models = models
            .into_iter()
            .enumerate()
            .map(|(i, entry)| ModelEntry {
                index: Some(i),
                ..entry
            })
            .collect();

        Snapshot { timestamp, models }
    }

    pub(crate) fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.timestamp
    }

    pub(crate) fn is_fresh_at(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        self.age_at(now) <= ttl
    }
}

/// Persistent storage for the last snapshot.
pub(crate) trait SnapshotStore: Send + Sync {
    /// Reads the last written snapshot, or `None` if nothing was written.
    fn read(&self) -> Result<Option<Snapshot>, Error>;

    /// Replaces the stored snapshot. Readers either observe the previous
    /// snapshot or this one, never a mix.
    fn write(&self, snapshot: &Snapshot) -> Result<(), Error>;

    /// Removes the stored snapshot, if any.
    fn clear(&self) -> Result<(), Error>;
}

mod timestamp {
    //! Timestamps are written as RFC 3339. Older caches hold naive ISO-8601
    //! local times, which are still accepted.

    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;

        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;

        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp \"{}\"", raw)))
    }
}
