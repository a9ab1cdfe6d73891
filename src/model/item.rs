// File: ./src/model/item.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Qualitative certainty of an extracted date/time, derived from which
/// parsing rule fired. Ordered so that `min` picks the weaker of two.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Lifecycle status of a detected commitment.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Leak,
    Covered,
    Expired,
    Discarded,
}

impl EventStatus {
    /// A discarded commitment never leaves that state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Discarded)
    }
}

/// Where a raw text record entered the system.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordOrigin {
    Paste,
    Share,
    Import,
    Manual,
    Notification,
}

/// Where a reference calendar entry came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CalendarOrigin {
    ImportedFile,
    ImportedService,
    Manual,
}

/// Result of running the date/time extractor over one text.
///
/// `start` always carries a concrete time-of-day; when `has_time` is false
/// it is normalized to midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDateTime {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub has_time: bool,
    pub confidence: Confidence,
    pub source_text: String,
}

/// An ingested text, kept verbatim for audit. Immutable once created; only
/// the retention purge removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub content: String,
    pub origin: RecordOrigin,
    pub created_at: NaiveDateTime,
}

impl RawRecord {
    pub fn new(content: &str, origin: RecordOrigin, created_at: NaiveDateTime) -> Self {
        Self {
            id: new_id(),
            content: content.to_string(),
            origin,
            created_at,
        }
    }
}

/// A detected commitment: a date-bearing obligation extracted from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialEvent {
    pub id: String,
    pub raw_record_id: String,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub has_time: bool,
    pub confidence: Confidence,
    /// Derived identity hash; never set independently of (start, has_time,
    /// keywords).
    pub fingerprint: String,
    pub keywords: Vec<String>,
    pub status: EventStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PotentialEvent {
    /// Calendar day the commitment falls on; deduplication key together
    /// with the fingerprint.
    pub fn start_day(&self) -> NaiveDate {
        self.start.date()
    }
}

/// A reference calendar entry the auditor matches commitments against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub external_id: Option<String>,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub is_all_day: bool,
    pub fingerprint: String,
    pub keywords: Vec<String>,
    pub origin: CalendarOrigin,
    pub imported_at: NaiveDateTime,
}

/// How a commitment was found to be covered by the calendar, if at all.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchType {
    ExactFingerprint,
    KeywordOverlap,
    None,
}

/// Outcome of matching one commitment against the reference calendar.
/// Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    pub match_type: MatchType,
    pub matched_event: Option<CalendarEvent>,
}

impl MatchResult {
    pub fn exact(event: CalendarEvent) -> Self {
        Self {
            matched: true,
            match_type: MatchType::ExactFingerprint,
            matched_event: Some(event),
        }
    }

    pub fn keyword_overlap(event: CalendarEvent) -> Self {
        Self {
            matched: true,
            match_type: MatchType::KeywordOverlap,
            matched_event: Some(event),
        }
    }

    pub fn none() -> Self {
        Self {
            matched: false,
            match_type: MatchType::None,
            matched_event: None,
        }
    }
}
