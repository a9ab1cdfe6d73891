// File: src/controller.rs
//! Central pipeline controller.
//! This is the single source of truth for the ingest workflow: every text
//! entering the system goes through `Auditor::ingest`, and every status is
//! derived here. Callers (CLI, future surfaces) only ever see the storage
//! contract and this controller; nothing below calls back into them.
use crate::model::item::{EventStatus, PotentialEvent, RawRecord, RecordOrigin, new_id};
use crate::model::{CalendarOrigin, adapter, fingerprint, matcher, normalize, parser, status};
use crate::storage::AuditStore;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};

/// Imported calendar entries older than this are considered stale and
/// removed by the retention purge.
const CALENDAR_CACHE_HOURS: i64 = 24;

/// What one `ingest` call produced. Texts without temporal content succeed
/// with `NoDate`; failure is the `Err` arm of the surrounding `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Created { event_id: String },
    Duplicate { event_id: String },
    NoDate,
}

pub struct Auditor<S: AuditStore> {
    pub store: S,
}

impl<S: AuditStore> Auditor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Runs the full detection pipeline for one incoming text.
    ///
    /// The raw record is persisted unconditionally, even when no date is
    /// found, so every submission stays auditable. `now` is the reference
    /// instant for extraction and classification.
    pub fn ingest(
        &mut self,
        content: &str,
        origin: RecordOrigin,
        now: NaiveDateTime,
    ) -> Result<IngestOutcome> {
        let raw_id = self
            .store
            .add_raw_record(RawRecord::new(content, origin, now))?;

        let Some(parsed) = parser::extract(content, now) else {
            log::debug!("no temporal content; raw record {} kept for audit", raw_id);
            return Ok(IngestOutcome::NoDate);
        };

        // Keywords and fingerprint come from the unmodified content, so
        // identity never depends on the summary heuristics.
        let keywords = normalize::keywords(content);
        let digest = fingerprint::fingerprint(parsed.start, parsed.has_time, content);

        if let Some(existing) = self
            .store
            .find_by_fingerprint_on_day(&digest, parsed.start.date())?
        {
            self.store.touch_potential_event(&existing.id, now)?;
            return Ok(IngestOutcome::Duplicate {
                event_id: existing.id,
            });
        }

        let calendar = self.store.all_calendar_events()?;
        let window_hours = self.store.config()?.window_hours;

        let mut event = PotentialEvent {
            id: new_id(),
            raw_record_id: raw_id,
            summary: parser::derive_summary(content),
            start: parsed.start,
            end: parsed.end,
            has_time: parsed.has_time,
            confidence: parsed.confidence,
            fingerprint: digest,
            keywords,
            status: EventStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let match_result = matcher::match_against_calendar(&event, &calendar, window_hours);
        event.status = status::derive_status(now, &event, &match_result, window_hours);

        log::info!(
            "commitment detected: '{}' at {} [{}]",
            event.summary,
            event.start,
            event.status
        );
        let event_id = self.store.add_potential_event(event)?;
        Ok(IngestOutcome::Created { event_id })
    }

    /// Recomputes every commitment's status against the current calendar
    /// and detection window, writing back only the ones that changed.
    /// The first storage failure aborts the batch; remaining records keep
    /// their previous status rather than ending up half-applied.
    ///
    /// Discarded commitments are left alone: that state is terminal and a
    /// calendar change must not resurrect them.
    pub fn recalculate_statuses(&mut self, now: NaiveDateTime) -> Result<usize> {
        let calendar = self.store.all_calendar_events()?;
        let window_hours = self.store.config()?.window_hours;

        let mut changed = 0;
        for event in self.store.all_potential_events()? {
            if event.status.is_terminal() {
                continue;
            }
            let match_result = matcher::match_against_calendar(&event, &calendar, window_hours);
            let derived = status::derive_status(now, &event, &match_result, window_hours);
            if derived != event.status {
                self.store.set_event_status(&event.id, derived, now)?;
                changed += 1;
            }
        }
        if changed > 0 {
            log::info!("recalculated statuses: {} changed", changed);
        }
        Ok(changed)
    }

    /// Manual override (`cover`, `discard`, ...) validated against the
    /// legal transition graph. Illegal changes write nothing.
    pub fn set_status(
        &mut self,
        event_id: &str,
        requested: EventStatus,
        now: NaiveDateTime,
    ) -> Result<EventStatus> {
        let event = self
            .store
            .get_potential_event(event_id)?
            .with_context(|| format!("Unknown potential event: {}", event_id))?;
        if !status::can_transition(event.status, requested) {
            anyhow::bail!("Illegal status change {} -> {}", event.status, requested);
        }
        self.store.set_event_status(event_id, requested, now)?;
        Ok(requested)
    }

    /// Replaces the reference calendar with the events of an ICS document
    /// and recalculates all statuses against it.
    pub fn import_calendar(&mut self, raw_ics: &str, now: NaiveDateTime) -> Result<usize> {
        let events = adapter::events_from_ics(raw_ics, CalendarOrigin::ImportedFile, now)
            .map_err(|e| anyhow::anyhow!("Calendar import failed: {}", e))?;
        self.store.clear_calendar()?;
        let count = self.store.add_calendar_events(events)?;
        let changed = self.recalculate_statuses(now)?;
        log::info!(
            "imported {} calendar events, {} statuses updated",
            count,
            changed
        );
        Ok(count)
    }

    /// Retention housekeeping. Best-effort: callers are expected to log
    /// and swallow the error rather than block the pipeline on it.
    pub fn autopurge(&mut self, now: NaiveDateTime) -> Result<usize> {
        let retention_days = self.store.config()?.retention_days;
        let record_cutoff = now - Duration::days(retention_days as i64);
        let calendar_cutoff = now - Duration::hours(CALENDAR_CACHE_HOURS);
        self.store.purge_before(record_cutoff, calendar_cutoff)
    }
}
