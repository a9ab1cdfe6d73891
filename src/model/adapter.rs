// File: src/model/adapter.rs
//
// ICS conversion boundary. Imported entries are fingerprinted with the same
// normalizer and hasher as ingested text; any divergence there would
// silently degrade exact matching to keyword overlap.
use crate::model::fingerprint::fingerprint;
use crate::model::item::{CalendarEvent, CalendarOrigin, new_id};
use crate::model::normalize;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use icalendar::{Calendar, CalendarComponent, Component};

/// Parses an ICS document into calendar events. Entries missing a start or
/// a summary are skipped with a warning; partial calendar coverage is still
/// useful for matching, so one bad entry never fails the batch.
pub fn events_from_ics(
    raw_ics: &str,
    origin: CalendarOrigin,
    imported_at: NaiveDateTime,
) -> Result<Vec<CalendarEvent>, String> {
    let calendar: Calendar = raw_ics.parse().map_err(|e| format!("Parse: {}", e))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(entry) = component else {
            continue;
        };

        let Some(summary) = entry.get_summary() else {
            log::warn!("skipping VEVENT without SUMMARY");
            continue;
        };
        let Some(dtstart) = entry.properties().get("DTSTART") else {
            log::warn!("skipping VEVENT without DTSTART: {}", summary);
            continue;
        };

        let explicit_date_value = dtstart
            .params()
            .get("VALUE")
            .is_some_and(|p| p.value().eq_ignore_ascii_case("DATE"));
        let Some((start, value_is_date)) = parse_ics_datetime(dtstart.value()) else {
            log::warn!("skipping VEVENT with unreadable DTSTART: {}", summary);
            continue;
        };
        let is_all_day = explicit_date_value || value_is_date;

        let end = entry
            .properties()
            .get("DTEND")
            .and_then(|p| parse_ics_datetime(p.value()))
            .map(|(dt, _)| dt);

        events.push(CalendarEvent {
            id: new_id(),
            external_id: entry.get_uid().map(|s| s.to_string()),
            summary: summary.to_string(),
            start,
            end,
            is_all_day,
            fingerprint: fingerprint(start, !is_all_day, summary),
            keywords: normalize::keywords(summary),
            origin,
            imported_at,
        });
    }

    Ok(events)
}

/// Accepts DATE (`YYYYMMDD`) and DATE-TIME (`YYYYMMDDTHHMMSS[Z]`) values.
/// The trailing `Z` is dropped: the pipeline works in local wall-clock time.
fn parse_ics_datetime(value: &str) -> Option<(NaiveDateTime, bool)> {
    if value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(|d| (d.and_time(NaiveTime::MIN), true));
    }
    let trimmed = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| (dt, false))
}

/// Serializes the reference calendar back out. The `icalendar` crate owns
/// the escaping of reserved characters in text values.
pub fn events_to_ics(events: &[CalendarEvent]) -> String {
    let mut calendar = Calendar::new();
    for event in events {
        let mut entry = icalendar::Event::new();
        entry.summary(&event.summary);
        match &event.external_id {
            Some(uid) => entry.uid(uid),
            None => entry.uid(&event.id),
        };
        entry.add_property(
            "DTSTAMP",
            event.imported_at.format("%Y%m%dT%H%M%SZ").to_string(),
        );

        if event.is_all_day {
            let date_value = event.start.format("%Y%m%d").to_string();
            let mut prop = icalendar::Property::new("DTSTART", date_value.as_str());
            prop.add_parameter("VALUE", "DATE");
            entry.append_property(prop);
        } else {
            entry.add_property("DTSTART", event.start.format("%Y%m%dT%H%M%S").to_string());
        }
        if let Some(end) = event.end {
            entry.add_property("DTEND", end.format("%Y%m%dT%H%M%S").to_string());
        }

        calendar.push(entry);
    }
    calendar.to_string()
}
