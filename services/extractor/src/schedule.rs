//! Which timestamps are due on each polling cycle.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};

/// Hours between consecutive atmosphere slots.
pub const ATMOSPHERE_STEP_HOURS: i64 = 3;

/// Most recent 3-hour-aligned slot at or before `now`, then `count - 1`
/// earlier slots, newest first.
pub fn atmosphere_slots(now: DateTime<Utc>, count: u32) -> Vec<DateTime<Utc>> {
    let hour = now.hour() - now.hour() % ATMOSPHERE_STEP_HOURS as u32;
    let aligned = start_of_day(now) + Duration::hours(i64::from(hour));

    (0..i64::from(count))
        .map(|i| aligned - Duration::hours(i * ATMOSPHERE_STEP_HOURS))
        .collect()
}

/// UTC midnight of `now` and the `days - 1` preceding midnights, newest first.
pub fn daily_slots(now: DateTime<Utc>, days: u32) -> Vec<DateTime<Utc>> {
    let today = start_of_day(now);
    (0..i64::from(days)).map(|i| today - Duration::days(i)).collect()
}

/// UTC midnight of the day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&ts.date_naive().and_time(chrono::NaiveTime::MIN))
}

/// Parse a manual reprocessing timestamp: `YYYY-MM-DD` or `YYYY-MM-DDTHH`.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let (date, hour) = match s.split_once('T') {
        Some((date, hour)) => (date, Some(hour)),
        None => (s, None),
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date {s:?}: {e}"))?;
    let hour = match hour {
        Some(h) => h
            .parse::<u32>()
            .map_err(|e| format!("invalid hour in {s:?}: {e}"))?,
        None => 0,
    };

    date.and_hms_opt(hour, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("hour out of range in {s:?}"))
}
