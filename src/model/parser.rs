// File: src/model/parser.rs
//
// Deterministic Spanish date/time extraction.
//
// Both date and time recognition are fixed-priority cascades over two rule
// tables: the first rule whose pattern fires wins and later rules are never
// attempted. Each rule carries the confidence it grants; when a time rule
// fires on top of a date rule, the weaker of the two confidences is kept.
//
// The reference instant is always an explicit parameter. Nothing in this
// module reads the system clock.
use crate::model::item::{Confidence, ParsedDateTime};
use crate::model::normalize::fold;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

const SUMMARY_MAX_CHARS: usize = 100;

type DateFn = fn(&str, NaiveDateTime) -> Option<NaiveDate>;
type TimeFn = fn(&str) -> Option<NaiveTime>;

struct DateRule {
    name: &'static str,
    confidence: Confidence,
    apply: DateFn,
}

struct TimeRule {
    name: &'static str,
    confidence: Confidence,
    apply: TimeFn,
}

/// Date rules in priority order. Surface forms that match but build no
/// valid calendar date (day 32, month 13) do not fire; the cascade
/// continues past them.
static DATE_RULES: &[DateRule] = &[
    DateRule {
        name: "today",
        confidence: Confidence::High,
        apply: date_today,
    },
    DateRule {
        name: "tomorrow",
        confidence: Confidence::High,
        apply: date_tomorrow,
    },
    DateRule {
        name: "day_after_tomorrow",
        confidence: Confidence::High,
        apply: date_day_after_tomorrow,
    },
    DateRule {
        name: "weekday_name",
        confidence: Confidence::Medium,
        apply: date_weekday,
    },
    DateRule {
        name: "day_month_name",
        confidence: Confidence::High,
        apply: date_month_name,
    },
    DateRule {
        name: "numeric",
        confidence: Confidence::High,
        apply: date_numeric,
    },
    DateRule {
        name: "iso",
        confidence: Confidence::High,
        apply: date_iso,
    },
    DateRule {
        name: "bare_day_of_month",
        confidence: Confidence::Medium,
        apply: date_bare_day,
    },
    DateRule {
        name: "in_n_days",
        confidence: Confidence::High,
        apply: date_in_days,
    },
    DateRule {
        name: "next_week",
        confidence: Confidence::Low,
        apply: date_next_week,
    },
];

/// Time rules in priority order, tried against the whole text once a date
/// is established.
static TIME_RULES: &[TimeRule] = &[
    TimeRule {
        name: "clock_meridiem",
        confidence: Confidence::High,
        apply: time_meridiem,
    },
    TimeRule {
        name: "clock_hs_suffix",
        confidence: Confidence::High,
        apply: time_hs_suffix,
    },
    TimeRule {
        name: "horas",
        confidence: Confidence::High,
        apply: time_horas,
    },
    TimeRule {
        name: "a_las_clock",
        confidence: Confidence::High,
        apply: time_a_las_clock,
    },
    TimeRule {
        name: "bare_clock",
        confidence: Confidence::High,
        apply: time_bare_clock,
    },
    TimeRule {
        name: "a_las_hour",
        confidence: Confidence::Medium,
        apply: time_a_las_hour,
    },
    TimeRule {
        name: "period_of_day",
        confidence: Confidence::Low,
        apply: time_period_of_day,
    },
    TimeRule {
        name: "noon",
        confidence: Confidence::Medium,
        apply: time_noon,
    },
    TimeRule {
        name: "midnight",
        confidence: Confidence::Medium,
        apply: time_midnight,
    },
];

/// Extracts the first implied date (and optional time) from `text` relative
/// to `reference`. Returns `None` when the text carries no temporal content
/// at all; that is a normal outcome, not an error.
pub fn extract(text: &str, reference: NaiveDateTime) -> Option<ParsedDateTime> {
    let folded = fold(text);

    let mut date_hit = None;
    for rule in DATE_RULES {
        if let Some(date) = (rule.apply)(&folded, reference) {
            date_hit = Some((rule, date));
            break;
        }
    }
    let (date_rule, date) = date_hit?;
    log::trace!("date rule '{}' fired on {:?}", date_rule.name, text);

    let mut confidence = date_rule.confidence;
    let mut time = None;
    for rule in TIME_RULES {
        if let Some(t) = (rule.apply)(&folded) {
            log::trace!("time rule '{}' fired on {:?}", rule.name, text);
            confidence = confidence.min(rule.confidence);
            time = Some(t);
            break;
        }
    }

    let (start, has_time) = match time {
        Some(t) => (date.and_time(t), true),
        None => (date.and_time(NaiveTime::MIN), false),
    };

    Some(ParsedDateTime {
        start,
        end: None,
        has_time,
        confidence,
        source_text: text.to_string(),
    })
}

// --- DATE RULES ---

static RE_TODAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhoy\b").unwrap());
static RE_TOMORROW_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmanana\b").unwrap());
static RE_DAY_AFTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bpasado\s+manana\b").unwrap());
static RE_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(domingo|lunes|martes|miercoles|jueves|viernes|sabado)\b").unwrap()
});
static RE_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2})\s+(?:de\s+)?(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|octubre|noviembre|diciembre)(?:\s+(?:del?\s+)?(\d{2,4}))?\b",
    )
    .unwrap()
});
static RE_NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})(?:[/.\-](\d{2,4}))?\b").unwrap());
static RE_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static RE_BARE_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bel\s+(\d{1,2})\b").unwrap());
static RE_IN_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:dentro\s+de|en)\s+(\d+)\s+dias?\b").unwrap());
static RE_NEXT_WEEK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:la\s+)?proxima\s+semana|semana\s+que\s+viene)\b").unwrap()
});

fn date_today(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    RE_TODAY.is_match(text).then(|| reference.date())
}

/// "mañana" as a relative date, not as part of "pasado mañana" and not as
/// the morning idiom ("en/por/de la mañana").
fn date_tomorrow(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    for m in RE_TOMORROW_WORD.find_iter(text) {
        let prev = text[..m.start()]
            .trim_end()
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("");
        if prev == "pasado" || prev == "la" {
            continue;
        }
        return Some(reference.date() + Duration::days(1));
    }
    None
}

fn date_day_after_tomorrow(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    RE_DAY_AFTER
        .is_match(text)
        .then(|| reference.date() + Duration::days(2))
}

fn date_weekday(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    let caps = RE_WEEKDAY.captures(text)?;
    let target = weekday_from_name(caps.get(1)?.as_str())?;
    Some(next_weekday(reference.date(), target))
}

fn date_month_name(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    let caps = RE_MONTH_NAME.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_from_name(&caps[2])?;

    let year = caps.get(3).and_then(|m| {
        // A trailing clock time ("3 de marzo 10:30") is not a year.
        if text[m.end()..].starts_with(':') {
            None
        } else {
            m.as_str().parse::<i32>().ok().map(expand_two_digit_year)
        }
    });

    match year {
        Some(y) => NaiveDate::from_ymd_opt(y, month, day),
        None => {
            let candidate = NaiveDate::from_ymd_opt(reference.year(), month, day)?;
            Some(roll_forward_year(candidate, reference))
        }
    }
}

fn date_numeric(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    for caps in RE_NUMERIC_DATE.captures_iter(text) {
        // A separator right before the match means this is the tail of a
        // longer form ("2023-05-10"); leave it to the ISO rule.
        let start = caps.get(0)?.start();
        if text[..start].ends_with(['-', '/', '.']) {
            continue;
        }

        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .map(expand_two_digit_year);

        let date = match year {
            Some(y) => NaiveDate::from_ymd_opt(y, month, day),
            None => NaiveDate::from_ymd_opt(reference.year(), month, day)
                .map(|candidate| roll_forward_year(candidate, reference)),
        };
        if date.is_some() {
            return date;
        }
    }
    None
}

fn date_iso(text: &str, _reference: NaiveDateTime) -> Option<NaiveDate> {
    let caps = RE_ISO_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// "el 15": day-of-month in the reference month, advancing one month when
/// the day has already passed. The day clamps to the target month's length.
fn date_bare_day(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    let caps = RE_BARE_DAY.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let candidate = NaiveDate::from_ymd_opt(reference.year(), reference.month(), day)?;
    if candidate.and_time(NaiveTime::MIN) < reference {
        let (year, month) = if reference.month() == 12 {
            (reference.year() + 1, 1)
        } else {
            (reference.year(), reference.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, day.min(last_day_of_month(year, month)))
    } else {
        Some(candidate)
    }
}

fn date_in_days(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    let caps = RE_IN_DAYS.captures(text)?;
    let days: i64 = caps[1].parse().ok()?;
    reference.date().checked_add_signed(Duration::days(days))
}

fn date_next_week(text: &str, reference: NaiveDateTime) -> Option<NaiveDate> {
    RE_NEXT_WEEK
        .is_match(text)
        .then(|| reference.date() + Duration::days(7))
}

// --- TIME RULES ---

static RE_MERIDIEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap])\.?\s*m\b").unwrap()
});
static RE_HS_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\s*(?:hs|hrs)\b").unwrap());
static RE_HORAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*horas\b").unwrap());
static RE_A_LAS_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\ba\s+las?\s+(\d{1,2}):(\d{2})\b").unwrap());
static RE_BARE_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?::(\d{2}))?\b").unwrap());
static RE_A_LAS_HOUR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\ba\s+las?\s+(\d{1,2})\b").unwrap());
static RE_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:en|por)\s+la\s+(manana|tarde|noche)\b").unwrap());
static RE_NOON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmediodia\b").unwrap());
static RE_MIDNIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmedianoche\b").unwrap());
static RE_PM_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bp\.?\s*m\b").unwrap());
static RE_EVENING_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:tarde|noche)\b").unwrap());

fn time_meridiem(text: &str) -> Option<NaiveTime> {
    let caps = RE_MERIDIEM.captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    if !(1..=12).contains(&hour) {
        return None;
    }
    let is_pm = &caps[4] == "p";
    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour24, minute, second)
}

fn time_hs_suffix(text: &str) -> Option<NaiveTime> {
    let caps = RE_HS_SUFFIX.captures(text)?;
    let second = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, second)
}

fn time_horas(text: &str) -> Option<NaiveTime> {
    let caps = RE_HORAS.captures(text)?;
    let minute = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, minute, 0)
}

fn time_a_las_clock(text: &str) -> Option<NaiveTime> {
    let caps = RE_A_LAS_CLOCK.captures(text)?;
    let hour = infer_pm(caps[1].parse().ok()?, text);
    NaiveTime::from_hms_opt(hour, caps[2].parse().ok()?, 0)
}

fn time_bare_clock(text: &str) -> Option<NaiveTime> {
    let caps = RE_BARE_CLOCK.captures(text)?;
    let second = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, second)
}

fn time_a_las_hour(text: &str) -> Option<NaiveTime> {
    let caps = RE_A_LAS_HOUR.captures(text)?;
    let hour = infer_pm(caps[1].parse().ok()?, text);
    NaiveTime::from_hms_opt(hour, 0, 0)
}

fn time_period_of_day(text: &str) -> Option<NaiveTime> {
    let caps = RE_PERIOD.captures(text)?;
    let hour = match &caps[1] {
        "manana" => 9,
        "tarde" => 15,
        _ => 20,
    };
    NaiveTime::from_hms_opt(hour, 0, 0)
}

fn time_noon(text: &str) -> Option<NaiveTime> {
    if RE_NOON.is_match(text) {
        NaiveTime::from_hms_opt(12, 0, 0)
    } else {
        None
    }
}

fn time_midnight(text: &str) -> Option<NaiveTime> {
    RE_MIDNIGHT.is_match(text).then_some(NaiveTime::MIN)
}

/// P.m. disambiguation for "a la(s) N" phrasings: an explicit p.m. marker
/// always wins; without one, a small hour with afternoon/evening context
/// words is read as p.m. The target date is deliberately not consulted.
fn infer_pm(hour: u32, text: &str) -> u32 {
    if RE_PM_MARKER.is_match(text) {
        if hour < 12 {
            return hour + 12;
        }
    } else if (1..=6).contains(&hour) && RE_EVENING_CONTEXT.is_match(text) {
        return hour + 12;
    }
    hour
}

// --- SHARED DATE HELPERS ---

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "lunes" => Some(Weekday::Mon),
        "martes" => Some(Weekday::Tue),
        "miercoles" => Some(Weekday::Wed),
        "jueves" => Some(Weekday::Thu),
        "viernes" => Some(Weekday::Fri),
        "sabado" => Some(Weekday::Sat),
        "domingo" => Some(Weekday::Sun),
        _ => None,
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "enero",
        "febrero",
        "marzo",
        "abril",
        "mayo",
        "junio",
        "julio",
        "agosto",
        "septiembre",
        "octubre",
        "noviembre",
        "diciembre",
    ];
    MONTHS.iter().position(|m| *m == name).map(|i| i as u32 + 1)
}

/// Next occurrence of `target` strictly after `from`; a reference already on
/// the target weekday lands a full week out, never "today".
fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let mut d = from + Duration::days(1);
    while d.weekday() != target {
        d += Duration::days(1);
    }
    d
}

/// Year-less dates that have already passed roll forward one year. The
/// comparison ignores time-of-day: a date naming the reference day itself
/// stays put (and will classify as expired), it does not roll.
fn roll_forward_year(candidate: NaiveDate, reference: NaiveDateTime) -> NaiveDate {
    if candidate < reference.date() {
        NaiveDate::from_ymd_opt(candidate.year() + 1, candidate.month(), candidate.day())
            .unwrap_or(candidate)
    } else {
        candidate
    }
}

fn expand_two_digit_year(year: i32) -> i32 {
    if year >= 100 {
        year
    } else if year < 50 {
        2000 + year
    } else {
        1900 + year
    }
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

// --- DISPLAY SUMMARY ---

static RE_SUMMARY_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").unwrap());
static RE_SUMMARY_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}[/\-]\d{1,2}\b").unwrap());
static RE_SUMMARY_DATE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:hoy|pasado\s+ma[ñn]ana|ma[ñn]ana|lunes|martes|mi[ée]rcoles|jueves|viernes|s[áa]bado|domingo)\b",
    )
    .unwrap()
});

/// Human-facing summary: the content with recognized date/time surface
/// forms removed. Presentation only; the fingerprint never sees this.
pub fn derive_summary(content: &str) -> String {
    let stripped = RE_SUMMARY_TIME.replace_all(content, "");
    let stripped = RE_SUMMARY_DATE.replace_all(&stripped, "");
    let stripped = RE_SUMMARY_DATE_WORDS.replace_all(&stripped, "");
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        content.trim().chars().take(SUMMARY_MAX_CHARS).collect()
    } else {
        cleaned.chars().take(SUMMARY_MAX_CHARS).collect()
    }
}
