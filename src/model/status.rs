// Lifecycle classification for detected commitments.
use crate::model::item::{Confidence, EventStatus, MatchResult, PotentialEvent};
use chrono::{Duration, NaiveDateTime};

/// Derives the current status from scratch. Precedence: expired beats a
/// calendar match; a match beats the leak window.
///
/// A commitment inside the detection window stays `Pending` when its
/// extraction confidence is low, so vague phrasings never page the user.
pub fn derive_status(
    now: NaiveDateTime,
    potential: &PotentialEvent,
    match_result: &MatchResult,
    window_hours: u32,
) -> EventStatus {
    if potential.start <= now {
        return EventStatus::Expired;
    }
    if match_result.matched {
        return EventStatus::Covered;
    }
    if potential.start - now <= Duration::hours(window_hours as i64)
        && potential.confidence != Confidence::Low
    {
        return EventStatus::Leak;
    }
    EventStatus::Pending
}

/// Legal status transitions for manual overrides. `derive_status` is not
/// bound by this graph; it always recomputes from scratch.
pub fn can_transition(from: EventStatus, to: EventStatus) -> bool {
    use EventStatus::*;
    match from {
        Pending => matches!(to, Leak | Covered | Expired | Discarded),
        Leak => matches!(to, Covered | Expired | Discarded),
        Covered => matches!(to, Expired | Discarded),
        Expired => matches!(to, Discarded),
        Discarded => false,
    }
}
