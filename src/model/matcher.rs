// Logic for deciding whether a detected commitment is already covered by
// the reference calendar.
//
// Two passes over the window-filtered candidates: exact fingerprint first,
// then same-day keyword overlap. First match wins in both passes; callers
// supply `calendar_events` sorted by start time for stable tie-breaking.
use crate::model::item::{CalendarEvent, MatchResult, PotentialEvent};
use chrono::Duration;

/// Shared-keyword count at or above which a same-day calendar entry counts
/// as covering the commitment. Fixed, not proportional to summary length.
const KEYWORD_OVERLAP_THRESHOLD: usize = 2;

/// Candidates for a timed commitment must start within this many hours of
/// it; date-only commitments use the configured detection window instead.
const TIMED_WINDOW_HOURS: i64 = 3;

pub fn match_against_calendar(
    potential: &PotentialEvent,
    calendar_events: &[CalendarEvent],
    window_hours: u32,
) -> MatchResult {
    let effective_window = if potential.has_time {
        Duration::hours(TIMED_WINDOW_HOURS)
    } else {
        Duration::hours(window_hours as i64)
    };

    let candidates: Vec<&CalendarEvent> = calendar_events
        .iter()
        .filter(|event| (event.start - potential.start).abs() <= effective_window)
        .collect();

    for event in &candidates {
        if event.fingerprint == potential.fingerprint {
            return MatchResult::exact((*event).clone());
        }
    }

    for event in &candidates {
        if event.start.date() == potential.start.date()
            && keyword_overlap(&potential.keywords, &event.keywords) >= KEYWORD_OVERLAP_THRESHOLD
        {
            return MatchResult::keyword_overlap((*event).clone());
        }
    }

    MatchResult::none()
}

/// Cardinality of the keyword-set intersection; order-independent.
fn keyword_overlap(a: &[String], b: &[String]) -> usize {
    b.iter().filter(|kw| a.contains(kw)).count()
}
