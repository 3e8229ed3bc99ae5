use super::domain::Deal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

/// Calendar date of a CRM timestamp in the offset it was encoded with.
///
/// Accepts RFC 3339 (`Z` or explicit offset, optional fraction), naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` and bare `YYYY-MM-DD`. Anything else is `None`.
pub fn encoded_date(timestamp: &str) -> Option<NaiveDate> {
    let trimmed = timestamp.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// True iff `timestamp` parses and falls on `target_day`.
pub fn matches(timestamp: Option<&str>, target_day: NaiveDate) -> bool {
    timestamp
        .and_then(encoded_date)
        .is_some_and(|date| date == target_day)
}

/// True iff `timestamp` parses and falls on or before `as_of`.
pub fn entered_by(timestamp: Option<&str>, as_of: NaiveDate) -> bool {
    timestamp
        .and_then(encoded_date)
        .is_some_and(|date| date <= as_of)
}

/// Days within `[from, to]` on which at least one deal entered a stage.
pub fn active_dates(deals: &[Deal], from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    deals
        .iter()
        .flat_map(|deal| deal.entered.values())
        .filter_map(|timestamp| encoded_date(timestamp))
        .filter(|date| *date >= from && *date <= to)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
