use crate::model::DateRecord;
use chrono::{Datelike, NaiveDate};

/// The documented fallback date substituted whenever a stream row's date
/// string can't be parsed, so a single malformed row never stalls the
/// pipeline.
pub const FALLBACK_DATE: &str = "2017-01-01";

/// Parses a free-form date string into a canonical [`DateRecord`].
///
/// Accepts ISO `YYYY-MM-DD` and the common `M/D/YYYY` retail-export form;
/// anything else (or an out-of-range date) falls back to [`FALLBACK_DATE`].
/// `full_date` is always the dimension's natural key.
pub fn derive(raw: &str) -> DateRecord {
    let parsed = parse_naive(raw).unwrap_or_else(|| parse_naive(FALLBACK_DATE).unwrap());
    from_naive(parsed)
}

fn parse_naive(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(raw, "%-m/%-d/%Y").ok()
}

fn from_naive(date: NaiveDate) -> DateRecord {
    let month = date.month();
    DateRecord {
        full_date: date.format("%Y-%m-%d").to_string(),
        day: date.day(),
        month,
        month_name: month_name(month).to_string(),
        quarter: ((month as u8 - 1) / 3) + 1,
        year: date.year(),
        week: date.iso_week().week(),
        weekday: date.format("%A").to_string(),
        season: season_for(month).to_string(),
    }
}

fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];
    NAMES[(month as usize - 1).min(11)]
}

fn season_for(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Winter",
        3 | 4 | 5 => "Spring",
        6 | 7 | 8 => "Summer",
        9 | 10 | 11 => "Fall",
        _ => "Winter",
    }
}
