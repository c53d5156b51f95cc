use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use log::debug;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Korea Standard Time, the canonical timezone for every day bucket.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// Today's canonical `YYYY-MM-DD` day string in KST.
pub fn today_kst() -> String {
    Utc::now().with_timezone(&kst()).format(DAY_FORMAT).to_string()
}

/// Timestamp for `update_time` fields and log-friendly reporting.
pub fn now_kst_timestamp() -> String {
    Utc::now()
        .with_timezone(&kst())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Normalize a feed-supplied date string into a KST calendar day.
///
/// Formats are tried in a fixed order; the first match wins. Values carrying
/// an offset (RFC 2822 `GMT`, ISO `Z`/`+00:00`) are converted into KST, so a
/// UTC timestamp gains exactly nine hours. Naive formats are taken as
/// already-local. Returns `None` when nothing matches — callers must drop
/// such items rather than bucket them under today, which would misdate them
/// and resurface them as apparent duplicates on the next run.
pub fn parse_rss_date(date_str: &str, source: &str) -> Option<String> {
    let raw = date_str.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&kst()).format(DAY_FORMAT).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&kst()).format(DAY_FORMAT).to_string());
    }
    // ISO with a colon-less offset, e.g. 2025-06-03T04:00:00+0000
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&kst()).format(DAY_FORMAT).to_string());
    }
    for fmt in ["%d %b %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.format(DAY_FORMAT).to_string());
        }
    }

    debug!("unparseable pubDate from {source}: {raw:?}");
    None
}
