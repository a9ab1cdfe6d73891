// Semantic fingerprinting: the identity hash used for deduplication and
// exact calendar matching.
use crate::model::normalize;
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

/// Sentinel standing in for the clock component of date-only commitments,
/// so "cena el viernes" and "cena el viernes 21:00" fingerprint apart.
pub const NO_TIME: &str = "no-time";

/// Canonical identity of a commitment: ISO date, `HH:MM` or the no-time
/// sentinel, and the keyword set of `text` sorted lexicographically.
/// Sorting makes the result independent of word order, so paraphrased
/// restatements of the same commitment fingerprint identically.
pub fn fingerprint(start: NaiveDateTime, has_time: bool, text: &str) -> String {
    let mut keywords = normalize::keywords(text);
    keywords.sort_unstable();

    let time_part = if has_time {
        start.format("%H:%M").to_string()
    } else {
        NO_TIME.to_string()
    };
    let payload = format!(
        "{}|{}|{}",
        start.format("%Y-%m-%d"),
        time_part,
        keywords.join("|")
    );

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_fingerprint_is_idempotent() {
        let start = at(2024, 1, 2, 19, 0);
        let a = fingerprint(start, true, "mañana 19:00 dentista");
        let b = fingerprint(start, true, "mañana 19:00 dentista");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_word_order() {
        let start = at(2024, 1, 2, 19, 0);
        assert_eq!(
            fingerprint(start, true, "dentista revisión molar"),
            fingerprint(start, true, "molar revisión dentista")
        );
    }

    #[test]
    fn test_time_presence_changes_fingerprint() {
        let timed = at(2024, 1, 2, 19, 0);
        let midnight = at(2024, 1, 2, 0, 0);
        assert_ne!(
            fingerprint(timed, true, "cena familiar"),
            fingerprint(midnight, false, "cena familiar")
        );
    }
}
