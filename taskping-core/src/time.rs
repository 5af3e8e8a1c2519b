//! Time utilities: source date parsing and timezone-aware day windows.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a date value as the task source emits it, returning UTC.
///
/// The source uses two shapes: date-only ("2026-03-02") and datetime
/// ("2026-03-02T14:00:00.000-06:00"). Date-only carries no instant to alert
/// on, so it comes back as `Ok(None)` and the caller drops the record.
pub fn parse_source_datetime(raw: &str) -> Result<Option<DateTime<Utc>>> {
    if !raw.contains('T') {
        return Ok(None);
    }
    let dt = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("invalid datetime '{raw}': {e}"))?;
    Ok(Some(dt.with_timezone(&Utc)))
}

/// UTC bounds of `date` as lived in `tz`: [local midnight, local 23:59:59].
///
/// Used to build the "today" filter so the tracked day matches the
/// operator's wall clock, not the server's.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = tz
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("valid midnight"))
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("no valid midnight for {date} in {tz}"))?;
    let end = tz
        .from_local_datetime(&date.and_hms_opt(23, 59, 59).expect("valid end of day"))
        .latest()
        .ok_or_else(|| anyhow::anyhow!("no valid end of day for {date} in {tz}"))?;
    Ok((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}
