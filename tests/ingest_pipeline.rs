// End-to-end pipeline behavior over the in-memory store: persistence,
// deduplication, matching, status lifecycle and housekeeping.
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use vigia::config::Config;
use vigia::controller::{Auditor, IngestOutcome};
use vigia::model::item::{
    CalendarEvent, CalendarOrigin, Confidence, EventStatus, PotentialEvent, RawRecord,
    RecordOrigin, new_id,
};
use vigia::model::{fingerprint, normalize};
use vigia::storage::{AuditStore, MemoryStore};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Monday, Jan 1 2024, 10:00.
fn mock_now() -> NaiveDateTime {
    at(2024, 1, 1, 10, 0)
}

fn calendar_event(summary: &str, start: NaiveDateTime, has_time: bool) -> CalendarEvent {
    CalendarEvent {
        id: new_id(),
        external_id: None,
        summary: summary.to_string(),
        start,
        end: None,
        is_all_day: !has_time,
        fingerprint: fingerprint::fingerprint(start, has_time, summary),
        keywords: normalize::keywords(summary),
        origin: CalendarOrigin::ImportedFile,
        imported_at: mock_now(),
    }
}

#[test]
fn test_ingest_creates_leak_with_empty_calendar() {
    let mut auditor = Auditor::new(MemoryStore::new());
    let outcome = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap();

    let IngestOutcome::Created { event_id } = outcome else {
        panic!("expected creation");
    };
    let event = auditor.store.get_potential_event(&event_id).unwrap().unwrap();
    assert_eq!(event.start, at(2024, 1, 2, 20, 0));
    assert!(event.has_time);
    assert_eq!(event.confidence, Confidence::High);
    assert_eq!(event.status, EventStatus::Leak);
    assert_eq!(auditor.store.raw_records.len(), 1);
    assert_eq!(event.raw_record_id, auditor.store.raw_records[0].id);
}

#[test]
fn test_summary_drops_temporal_tokens_but_fingerprint_uses_content() {
    let mut auditor = Auditor::new(MemoryStore::new());
    let outcome = auditor
        .ingest("mañana 19:00 dentista", RecordOrigin::Share, mock_now())
        .unwrap();
    let IngestOutcome::Created { event_id } = outcome else {
        panic!("expected creation");
    };
    let event = auditor.store.get_potential_event(&event_id).unwrap().unwrap();
    assert_eq!(event.summary, "dentista");
    assert_eq!(
        event.fingerprint,
        fingerprint::fingerprint(event.start, true, "mañana 19:00 dentista")
    );
}

#[test]
fn test_repeat_submission_same_day_updates_timestamp_only() {
    let mut auditor = Auditor::new(MemoryStore::new());
    let first = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap();
    let IngestOutcome::Created { event_id } = first else {
        panic!("expected creation");
    };

    let later = at(2024, 1, 1, 11, 0);
    let second = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, later)
        .unwrap();
    assert_eq!(
        second,
        IngestOutcome::Duplicate {
            event_id: event_id.clone()
        }
    );

    assert_eq!(auditor.store.potential_events.len(), 1);
    let event = auditor.store.get_potential_event(&event_id).unwrap().unwrap();
    assert_eq!(event.created_at, mock_now());
    assert_eq!(event.updated_at, later);
    // Both raw records are retained for audit.
    assert_eq!(auditor.store.raw_records.len(), 2);
}

#[test]
fn test_paraphrased_restatement_deduplicates() {
    let mut auditor = Auditor::new(MemoryStore::new());
    auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap();
    let outcome = auditor
        .ingest("cena 02/01 a las 20:00", RecordOrigin::Manual, mock_now())
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Duplicate { .. }));
    assert_eq!(auditor.store.potential_events.len(), 1);
}

#[test]
fn test_exact_fingerprint_coverage_at_ingest() {
    let mut store = MemoryStore::new();
    // Same canonical identity as the ingested text, 30 minutes earlier.
    let mut covering = calendar_event("cena 02/01 a las 20:00", at(2024, 1, 2, 20, 0), true);
    covering.fingerprint =
        fingerprint::fingerprint(at(2024, 1, 2, 20, 0), true, "02/01 a las 20:00 cena");
    covering.start = at(2024, 1, 2, 19, 30);
    store.calendar_events.push(covering);

    let mut auditor = Auditor::new(store);
    let outcome = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap();
    let IngestOutcome::Created { event_id } = outcome else {
        panic!("expected creation");
    };
    let event = auditor.store.get_potential_event(&event_id).unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Covered);
}

#[test]
fn test_keyword_overlap_coverage_at_ingest() {
    let mut store = MemoryStore::new();
    store
        .calendar_events
        .push(calendar_event("Cena familiar dominical", at(2024, 1, 2, 21, 0), true));

    let mut auditor = Auditor::new(store);
    // Date-only commitment on the same day sharing "cena" and "familiar"
    let outcome = auditor
        .ingest("02/01 cena familiar en casa", RecordOrigin::Paste, mock_now())
        .unwrap();
    let IngestOutcome::Created { event_id } = outcome else {
        panic!("expected creation");
    };
    let event = auditor.store.get_potential_event(&event_id).unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Covered);
}

#[test]
fn test_detection_window_setting_drives_leak() {
    // 34 hours out: a leak inside a 48h window, merely pending inside 24h.
    let mut narrow = Auditor::new(MemoryStore::with_config(Config {
        window_hours: 24,
        ..Config::default()
    }));
    let outcome = narrow
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap();
    let IngestOutcome::Created { event_id } = outcome else {
        panic!("expected creation");
    };
    let event = narrow.store.get_potential_event(&event_id).unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Pending);
}

#[test]
fn test_recalculate_after_calendar_change() {
    let mut auditor = Auditor::new(MemoryStore::new());
    let IngestOutcome::Created { event_id } = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap()
    else {
        panic!("expected creation");
    };
    assert_eq!(
        auditor.store.get_potential_event(&event_id).unwrap().unwrap().status,
        EventStatus::Leak
    );

    let mut covering = calendar_event("x", at(2024, 1, 2, 20, 0), true);
    covering.fingerprint =
        fingerprint::fingerprint(at(2024, 1, 2, 20, 0), true, "02/01 a las 20:00 cena");
    auditor.store.calendar_events.push(covering);

    let changed = auditor.recalculate_statuses(mock_now()).unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        auditor.store.get_potential_event(&event_id).unwrap().unwrap().status,
        EventStatus::Covered
    );

    // A second pass with nothing new writes nothing.
    assert_eq!(auditor.recalculate_statuses(mock_now()).unwrap(), 0);
}

#[test]
fn test_recalculation_never_resurrects_discarded() {
    let mut auditor = Auditor::new(MemoryStore::new());
    let IngestOutcome::Created { event_id } = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap()
    else {
        panic!("expected creation");
    };
    auditor
        .set_status(&event_id, EventStatus::Discarded, mock_now())
        .unwrap();

    auditor.recalculate_statuses(mock_now()).unwrap();
    assert_eq!(
        auditor.store.get_potential_event(&event_id).unwrap().unwrap().status,
        EventStatus::Discarded
    );
}

#[test]
fn test_manual_override_respects_transition_graph() {
    let mut auditor = Auditor::new(MemoryStore::new());
    let IngestOutcome::Created { event_id } = auditor
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap()
    else {
        panic!("expected creation");
    };

    // leak -> covered is legal
    auditor
        .set_status(&event_id, EventStatus::Covered, mock_now())
        .unwrap();
    // covered -> leak is not; the stored status must survive the attempt
    assert!(auditor
        .set_status(&event_id, EventStatus::Leak, mock_now())
        .is_err());
    assert_eq!(
        auditor.store.get_potential_event(&event_id).unwrap().unwrap().status,
        EventStatus::Covered
    );
    // discard is reachable from any non-terminal state, and is final
    auditor
        .set_status(&event_id, EventStatus::Discarded, mock_now())
        .unwrap();
    assert!(auditor
        .set_status(&event_id, EventStatus::Covered, mock_now())
        .is_err());
}

#[test]
fn test_autopurge_respects_retention() {
    let mut store = MemoryStore::new();
    store.raw_records.push(RawRecord::new(
        "viejo",
        RecordOrigin::Paste,
        at(2024, 1, 1, 9, 0),
    ));
    store.raw_records.push(RawRecord::new(
        "reciente",
        RecordOrigin::Paste,
        at(2024, 2, 20, 9, 0),
    ));
    store
        .calendar_events
        .push(calendar_event("rancio", at(2024, 3, 5, 10, 0), true));
    store.calendar_events[0].imported_at = at(2024, 2, 27, 9, 0);

    let mut auditor = Auditor::new(store);
    // Mar 1 with 30-day retention: Jan 1 is out, Feb 20 stays; the
    // calendar entry imported 3 days ago exceeds its 24h freshness.
    let removed = auditor.autopurge(at(2024, 3, 1, 9, 0)).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(auditor.store.raw_records.len(), 1);
    assert_eq!(auditor.store.raw_records[0].content, "reciente");
    assert!(auditor.store.calendar_events.is_empty());
}

// --- BATCH ABORT SEMANTICS ---

/// Store whose status writes start failing after a set number of calls;
/// everything else delegates to the in-memory store.
struct FlakyStore {
    inner: MemoryStore,
    writes_left: usize,
}

impl AuditStore for FlakyStore {
    fn add_raw_record(&mut self, record: RawRecord) -> Result<String> {
        self.inner.add_raw_record(record)
    }
    fn add_potential_event(&mut self, event: PotentialEvent) -> Result<String> {
        self.inner.add_potential_event(event)
    }
    fn touch_potential_event(&mut self, id: &str, at: NaiveDateTime) -> Result<()> {
        self.inner.touch_potential_event(id, at)
    }
    fn set_event_status(
        &mut self,
        id: &str,
        status: EventStatus,
        at: NaiveDateTime,
    ) -> Result<()> {
        if self.writes_left == 0 {
            anyhow::bail!("disk full");
        }
        self.writes_left -= 1;
        self.inner.set_event_status(id, status, at)
    }
    fn get_potential_event(&self, id: &str) -> Result<Option<PotentialEvent>> {
        self.inner.get_potential_event(id)
    }
    fn find_by_fingerprint_on_day(
        &self,
        fingerprint: &str,
        day: chrono::NaiveDate,
    ) -> Result<Option<PotentialEvent>> {
        self.inner.find_by_fingerprint_on_day(fingerprint, day)
    }
    fn all_potential_events(&self) -> Result<Vec<PotentialEvent>> {
        self.inner.all_potential_events()
    }
    fn all_calendar_events(&self) -> Result<Vec<CalendarEvent>> {
        self.inner.all_calendar_events()
    }
    fn add_calendar_events(&mut self, events: Vec<CalendarEvent>) -> Result<usize> {
        self.inner.add_calendar_events(events)
    }
    fn clear_calendar(&mut self) -> Result<()> {
        self.inner.clear_calendar()
    }
    fn config(&self) -> Result<Config> {
        self.inner.config()
    }
    fn purge_before(
        &mut self,
        record_cutoff: NaiveDateTime,
        calendar_cutoff: NaiveDateTime,
    ) -> Result<usize> {
        self.inner.purge_before(record_cutoff, calendar_cutoff)
    }
}

#[test]
fn test_recalculation_aborts_on_first_storage_failure() {
    let mut setup = Auditor::new(MemoryStore::new());
    // Two commitments that will both flip from leak to expired.
    setup
        .ingest("02/01 a las 20:00 cena", RecordOrigin::Paste, mock_now())
        .unwrap();
    setup
        .ingest("02/01 a las 21:00 teatro", RecordOrigin::Paste, mock_now())
        .unwrap();

    let mut auditor = Auditor::new(FlakyStore {
        inner: setup.store,
        writes_left: 1,
    });
    let result = auditor.recalculate_statuses(at(2024, 1, 3, 0, 0));
    assert!(result.is_err());

    // Exactly one record was rewritten before the abort; the other kept
    // its previous status instead of ending half-applied.
    let statuses: Vec<EventStatus> = auditor
        .store
        .all_potential_events()
        .unwrap()
        .iter()
        .map(|e| e.status)
        .collect();
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == EventStatus::Expired)
            .count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == EventStatus::Leak).count(),
        1
    );
}
