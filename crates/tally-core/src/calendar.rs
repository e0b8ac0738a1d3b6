//! Day, week, and month boundaries in the reference timezone.
//!
//! All boundary math treats the reference timezone as a fixed UTC offset, so
//! every local midnight maps to exactly one instant (fixed offsets have no
//! DST gaps or folds). Weeks run Sunday through Saturday.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

/// Converts a local midnight in the reference offset to a UTC instant.
fn local_midnight_to_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    let naive_utc = midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(naive_utc, Utc)
}

/// The UTC window covering one calendar day in the reference offset.
///
/// The window is inclusive of its start and exclusive of its end (the next
/// day's midnight).
pub fn day_window(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight_to_utc(date, offset);
    let end = local_midnight_to_utc(date + Duration::days(1), offset);
    (start, end)
}

/// Returns the Sunday on or before `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    let days_in = date.weekday().num_days_from_sunday();
    date - Duration::days(i64::from(days_in))
}

/// Whether `date` is a valid week start (a Sunday).
#[must_use]
pub fn is_week_start(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

/// The last day of the week beginning at `week_start` (the following
/// Saturday).
pub fn week_end(week_start: NaiveDate) -> NaiveDate {
    week_start + Duration::days(6)
}

/// The seven days of the week beginning at `week_start`, in order.
pub fn week_days(week_start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..7i64).map(move |i| week_start + Duration::days(i))
}

/// Start of the most recent fully completed week relative to `today`.
pub fn previous_week_start(today: NaiveDate) -> NaiveDate {
    week_start_for(today) - Duration::days(7)
}

/// Today's date in the reference offset.
pub fn today_in(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// First and last day of a calendar month, or `None` for an invalid
/// year/month combination.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first - Duration::days(1)))
}
