//! Fixed instants for tests
//!
//! Tests express timestamps as whole days after a fixed epoch so that
//! staleness arithmetic reads directly off the fixture.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Reference epoch for [`day`] (2020-01-01T00:00:00Z)
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `n` whole days after [`epoch`]
///
/// ```
/// use iam_janitor_test_utils::time::{day, epoch};
///
/// assert_eq!(day(0), epoch());
/// assert_eq!((day(10) - day(3)).num_days(), 7);
/// ```
pub fn day(n: i64) -> DateTime<Utc> {
    epoch() + Duration::days(n)
}
