use chrono::{DateTime, Local, TimeZone, Utc};
use now::DateTimeNow;

/// Start of the current local day. "Today" runs from local midnight to now,
/// unlike the weekly window which slides back from the current instant.
pub fn local_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    day_start_in(now, &Local)
}

/// Start of the day containing `now` in an arbitrary timezone.
pub fn day_start_in<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    now.with_timezone(tz).beginning_of_day().to_utc()
}
