//! Core data models used throughout Finishline.
//!
//! These types represent the race-result records, uniqueness keys, and
//! per-year aggregates that flow through the validation, load, dedup, and
//! aggregation pipeline.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Placeholder substituted for every absent or empty field.
///
/// Records never carry a native null across a serialization boundary: any
/// `None` becomes this string in CSV output and in store documents, so
/// downstream consumers see exactly one representation of "missing".
pub const SENTINEL: &str = "unknown";

/// One validated race participation event.
///
/// Produced by the validator from a single source row, persisted once into
/// the raw collection, and never mutated in place — redundant copies are
/// deleted by the duplicate resolver, not updated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub year: i64,
    pub race: String,
    pub name: String,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub overall: Option<i64>,
    /// Finish time as "HH:MM:SS", when recorded.
    pub finish_time: Option<String>,
    /// Elapsed seconds derived from `finish_time`; absent when the time
    /// string is missing or malformed.
    pub finish_seconds: Option<i64>,
    pub finish_place: Option<i64>,
}

impl RawRecord {
    /// The uniqueness key identifying this participation event.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name: self.name.clone(),
            year: self.year,
            finish_time: self.finish_time.clone(),
        }
    }

    /// Render as a store document with the fixed field set and no nulls.
    pub fn to_document(&self) -> Value {
        json!({
            "year": self.year,
            "race": self.race,
            "name": self.name,
            "gender": opt_str(&self.gender),
            "age": opt_int(self.age),
            "state": opt_str(&self.state),
            "country": opt_str(&self.country),
            "overall": opt_int(self.overall),
            "finish_time": opt_str(&self.finish_time),
            "finish_seconds": opt_int(self.finish_seconds),
            "finish": opt_int(self.finish_place),
        })
    }
}

/// Composite key identifying one real-world participation:
/// (runner name, year, finish-time string).
///
/// Equality and hashing are field-wise over exactly those three components —
/// an absent finish time is a distinct component value, not a wildcard.
/// Used only by the duplicate resolver; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub name: String,
    pub year: i64,
    pub finish_time: Option<String>,
}

impl RecordKey {
    /// Build a key from a projected store document (as returned by a scan).
    ///
    /// Missing or sentinel fields map to their absent forms so that a key
    /// built from a stored document equals the key of the record that
    /// produced it.
    pub fn from_document(doc: &Value) -> Self {
        let name = match doc.get("name").and_then(Value::as_str) {
            Some(s) if s != SENTINEL => s.to_string(),
            _ => SENTINEL.to_string(),
        };
        let year = doc.get("year").and_then(Value::as_i64).unwrap_or(0);
        let finish_time = doc
            .get("finish_time")
            .and_then(Value::as_str)
            .filter(|s| *s != SENTINEL)
            .map(str::to_string);
        Self {
            name,
            year,
            finish_time,
        }
    }

    /// Stable SHA-256 hex digest of the key components.
    ///
    /// Components are length-prefixed so distinct keys can never collapse to
    /// the same byte stream.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.name.len() as u64).to_le_bytes());
        hasher.update(self.name.as_bytes());
        hasher.update(self.year.to_le_bytes());
        let ft = self.finish_time.as_deref().unwrap_or("");
        hasher.update((ft.len() as u64).to_le_bytes());
        hasher.update(ft.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Summary statistics for one year of results.
///
/// Recomputed wholesale on every aggregation run; the aggregate collection
/// is replaced, never patched, so a year removed from the source cannot
/// survive a recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct YearAggregate {
    pub year: i64,
    /// Records for the year with a recorded finish time.
    pub finishers_count: u64,
    /// All records for the year.
    pub total_runners: u64,
    /// Minimum finish-seconds for the year; absent if no record has one.
    pub winning_time: Option<f64>,
    /// Mean finish-seconds among runners placed 100th or better; absent if
    /// no record qualifies.
    pub avg_100th_place_time: Option<f64>,
}

impl YearAggregate {
    /// Render as a store document with no nulls.
    pub fn to_document(&self) -> Value {
        json!({
            "year": self.year,
            "finishers_count": self.finishers_count,
            "total_runners": self.total_runners,
            "winning_time": opt_float(self.winning_time),
            "avg_100th_place_time": opt_float(self.avg_100th_place_time),
        })
    }
}

fn opt_str(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::String(s.clone()),
        None => Value::String(SENTINEL.to_string()),
    }
}

fn opt_int(v: Option<i64>) -> Value {
    match v {
        Some(n) => json!(n),
        None => Value::String(SENTINEL.to_string()),
    }
}

fn opt_float(v: Option<f64>) -> Value {
    match v {
        Some(n) => json!(n),
        None => Value::String(SENTINEL.to_string()),
    }
}
