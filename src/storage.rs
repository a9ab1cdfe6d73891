// Manages local file storage for audit records.
//
// ⚠️ VERSION BUMP REQUIRED:
// Changes to RawRecord, PotentialEvent or CalendarEvent serialization
// require incrementing LOCAL_STORAGE_VERSION below to prevent data
// corruption.
use crate::config::Config;
use crate::model::{CalendarEvent, EventStatus, PotentialEvent, RawRecord};
use crate::paths::AppPaths;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const LOCAL_STORAGE_VERSION: u32 = 1;

pub const RAW_RECORDS_FILENAME: &str = "raw_records.json";
pub const POTENTIAL_EVENTS_FILENAME: &str = "potential_events.json";
pub const CALENDAR_EVENTS_FILENAME: &str = "calendar_events.json";

/// Storage collaborator consumed by the pipeline. The auditor receives an
/// implementation instead of reaching into a module-level handle, so tests
/// can substitute `MemoryStore`.
pub trait AuditStore {
    fn add_raw_record(&mut self, record: RawRecord) -> Result<String>;

    fn add_potential_event(&mut self, event: PotentialEvent) -> Result<String>;
    /// Bumps `updated_at` only; everything else on the record is immutable
    /// through this interface.
    fn touch_potential_event(&mut self, id: &str, at: NaiveDateTime) -> Result<()>;
    fn set_event_status(&mut self, id: &str, status: EventStatus, at: NaiveDateTime)
    -> Result<()>;
    fn get_potential_event(&self, id: &str) -> Result<Option<PotentialEvent>>;
    /// Deduplication query: an existing commitment with this fingerprint
    /// whose start falls on `day`.
    fn find_by_fingerprint_on_day(
        &self,
        fingerprint: &str,
        day: NaiveDate,
    ) -> Result<Option<PotentialEvent>>;
    fn all_potential_events(&self) -> Result<Vec<PotentialEvent>>;

    fn all_calendar_events(&self) -> Result<Vec<CalendarEvent>>;
    fn add_calendar_events(&mut self, events: Vec<CalendarEvent>) -> Result<usize>;
    fn clear_calendar(&mut self) -> Result<()>;

    fn config(&self) -> Result<Config>;

    /// Retention housekeeping: drops raw records and commitments created
    /// before `record_cutoff` and calendar entries imported before
    /// `calendar_cutoff`. Returns how many records were removed.
    fn purge_before(
        &mut self,
        record_cutoff: NaiveDateTime,
        calendar_cutoff: NaiveDateTime,
    ) -> Result<usize>;
}

/// Wrapper struct for versioned local storage files.
#[derive(Serialize, Deserialize)]
struct StoreFile<T> {
    #[serde(default)]
    version: u32,
    records: Vec<T>,
}

/// JSON-file store under the platform data directory. Each operation takes
/// an advisory `fs2` lock on the file it touches, so concurrent processes
/// serialize their read-modify-write sections.
pub struct LocalStore {
    config: Config,
}

impl LocalStore {
    pub fn open(config: Config) -> Self {
        Self { config }
    }

    fn file_path(filename: &str) -> Result<PathBuf> {
        Ok(AppPaths::get_data_dir()?.join(filename))
    }

    fn get_lock_path(file_path: &Path) -> PathBuf {
        file_path.with_extension("lock")
    }

    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    // Unlocked primitives; callers hold the file lock.
    fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(vec![]);
        }
        let json = fs::read_to_string(path)?;
        let data: StoreFile<T> = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt store file: {:?}", path))?;
        if data.version != LOCAL_STORAGE_VERSION {
            anyhow::bail!("Unsupported store version {} in {:?}", data.version, path);
        }
        Ok(data.records)
    }

    fn write_records<T: Serialize>(path: &Path, records: Vec<T>) -> Result<()> {
        let data = StoreFile {
            version: LOCAL_STORAGE_VERSION,
            records,
        };
        let json = serde_json::to_string_pretty(&data)?;
        Self::atomic_write(path, json)
    }

    fn load_all<T: DeserializeOwned>(filename: &str) -> Result<Vec<T>> {
        let path = Self::file_path(filename)?;
        Self::with_lock(&path, || Self::read_records(&path))
    }

    fn append<T: Serialize + DeserializeOwned>(filename: &str, record: T) -> Result<()> {
        let path = Self::file_path(filename)?;
        Self::with_lock(&path, || {
            let mut records: Vec<T> = Self::read_records(&path)?;
            records.push(record);
            Self::write_records(&path, records)
        })
    }

    /// Read-modify-write over the commitments file under a single lock.
    fn update_potential_events<F>(mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<PotentialEvent>) -> Result<()>,
    {
        let path = Self::file_path(POTENTIAL_EVENTS_FILENAME)?;
        Self::with_lock(&path, || {
            let mut records: Vec<PotentialEvent> = Self::read_records(&path)?;
            mutate(&mut records)?;
            Self::write_records(&path, records)
        })
    }
}

impl AuditStore for LocalStore {
    fn add_raw_record(&mut self, record: RawRecord) -> Result<String> {
        let id = record.id.clone();
        Self::append(RAW_RECORDS_FILENAME, record)?;
        Ok(id)
    }

    fn add_potential_event(&mut self, event: PotentialEvent) -> Result<String> {
        let id = event.id.clone();
        Self::append(POTENTIAL_EVENTS_FILENAME, event)?;
        Ok(id)
    }

    fn touch_potential_event(&mut self, id: &str, at: NaiveDateTime) -> Result<()> {
        Self::update_potential_events(|records| {
            let event = records
                .iter_mut()
                .find(|e| e.id == id)
                .with_context(|| format!("Unknown potential event: {}", id))?;
            event.updated_at = at;
            Ok(())
        })
    }

    fn set_event_status(
        &mut self,
        id: &str,
        status: EventStatus,
        at: NaiveDateTime,
    ) -> Result<()> {
        Self::update_potential_events(|records| {
            let event = records
                .iter_mut()
                .find(|e| e.id == id)
                .with_context(|| format!("Unknown potential event: {}", id))?;
            event.status = status;
            event.updated_at = at;
            Ok(())
        })
    }

    fn get_potential_event(&self, id: &str) -> Result<Option<PotentialEvent>> {
        let records: Vec<PotentialEvent> = Self::load_all(POTENTIAL_EVENTS_FILENAME)?;
        Ok(records.into_iter().find(|e| e.id == id))
    }

    fn find_by_fingerprint_on_day(
        &self,
        fingerprint: &str,
        day: NaiveDate,
    ) -> Result<Option<PotentialEvent>> {
        let records: Vec<PotentialEvent> = Self::load_all(POTENTIAL_EVENTS_FILENAME)?;
        Ok(records
            .into_iter()
            .find(|e| e.fingerprint == fingerprint && e.start_day() == day))
    }

    fn all_potential_events(&self) -> Result<Vec<PotentialEvent>> {
        Self::load_all(POTENTIAL_EVENTS_FILENAME)
    }

    fn all_calendar_events(&self) -> Result<Vec<CalendarEvent>> {
        let mut events: Vec<CalendarEvent> = Self::load_all(CALENDAR_EVENTS_FILENAME)?;
        // Stable matching depends on start order.
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    fn add_calendar_events(&mut self, events: Vec<CalendarEvent>) -> Result<usize> {
        let count = events.len();
        let path = Self::file_path(CALENDAR_EVENTS_FILENAME)?;
        Self::with_lock(&path, || {
            let mut records: Vec<CalendarEvent> = Self::read_records(&path)?;
            records.extend(events);
            Self::write_records(&path, records)
        })?;
        Ok(count)
    }

    fn clear_calendar(&mut self) -> Result<()> {
        let path = Self::file_path(CALENDAR_EVENTS_FILENAME)?;
        Self::with_lock(&path, || {
            Self::write_records::<CalendarEvent>(&path, Vec::new())
        })
    }

    fn config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }

    fn purge_before(
        &mut self,
        record_cutoff: NaiveDateTime,
        calendar_cutoff: NaiveDateTime,
    ) -> Result<usize> {
        let mut removed = 0;

        let raw_path = Self::file_path(RAW_RECORDS_FILENAME)?;
        Self::with_lock(&raw_path, || {
            let mut records: Vec<RawRecord> = Self::read_records(&raw_path)?;
            let before = records.len();
            records.retain(|r| r.created_at >= record_cutoff);
            removed += before - records.len();
            Self::write_records(&raw_path, records)
        })?;

        Self::update_potential_events(|records| {
            let before = records.len();
            records.retain(|e| e.created_at >= record_cutoff);
            removed += before - records.len();
            Ok(())
        })?;

        let cal_path = Self::file_path(CALENDAR_EVENTS_FILENAME)?;
        Self::with_lock(&cal_path, || {
            let mut records: Vec<CalendarEvent> = Self::read_records(&cal_path)?;
            let before = records.len();
            records.retain(|e| e.imported_at >= calendar_cutoff);
            removed += before - records.len();
            Self::write_records(&cal_path, records)
        })?;

        Ok(removed)
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub raw_records: Vec<RawRecord>,
    pub potential_events: Vec<PotentialEvent>,
    pub calendar_events: Vec<CalendarEvent>,
    pub config: Config,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

impl AuditStore for MemoryStore {
    fn add_raw_record(&mut self, record: RawRecord) -> Result<String> {
        let id = record.id.clone();
        self.raw_records.push(record);
        Ok(id)
    }

    fn add_potential_event(&mut self, event: PotentialEvent) -> Result<String> {
        let id = event.id.clone();
        self.potential_events.push(event);
        Ok(id)
    }

    fn touch_potential_event(&mut self, id: &str, at: NaiveDateTime) -> Result<()> {
        let event = self
            .potential_events
            .iter_mut()
            .find(|e| e.id == id)
            .with_context(|| format!("Unknown potential event: {}", id))?;
        event.updated_at = at;
        Ok(())
    }

    fn set_event_status(
        &mut self,
        id: &str,
        status: EventStatus,
        at: NaiveDateTime,
    ) -> Result<()> {
        let event = self
            .potential_events
            .iter_mut()
            .find(|e| e.id == id)
            .with_context(|| format!("Unknown potential event: {}", id))?;
        event.status = status;
        event.updated_at = at;
        Ok(())
    }

    fn get_potential_event(&self, id: &str) -> Result<Option<PotentialEvent>> {
        Ok(self.potential_events.iter().find(|e| e.id == id).cloned())
    }

    fn find_by_fingerprint_on_day(
        &self,
        fingerprint: &str,
        day: NaiveDate,
    ) -> Result<Option<PotentialEvent>> {
        Ok(self
            .potential_events
            .iter()
            .find(|e| e.fingerprint == fingerprint && e.start_day() == day)
            .cloned())
    }

    fn all_potential_events(&self) -> Result<Vec<PotentialEvent>> {
        Ok(self.potential_events.clone())
    }

    fn all_calendar_events(&self) -> Result<Vec<CalendarEvent>> {
        let mut events = self.calendar_events.clone();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    fn add_calendar_events(&mut self, events: Vec<CalendarEvent>) -> Result<usize> {
        let count = events.len();
        self.calendar_events.extend(events);
        Ok(count)
    }

    fn clear_calendar(&mut self) -> Result<()> {
        self.calendar_events.clear();
        Ok(())
    }

    fn config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }

    fn purge_before(
        &mut self,
        record_cutoff: NaiveDateTime,
        calendar_cutoff: NaiveDateTime,
    ) -> Result<usize> {
        let before = self.raw_records.len() + self.potential_events.len()
            + self.calendar_events.len();
        self.raw_records.retain(|r| r.created_at >= record_cutoff);
        self.potential_events.retain(|e| e.created_at >= record_cutoff);
        self.calendar_events.retain(|e| e.imported_at >= calendar_cutoff);
        let after = self.raw_records.len() + self.potential_events.len()
            + self.calendar_events.len();
        Ok(before - after)
    }
}
