//! Timestamp helpers shared by every backend
//!
//! All timestamps are kept at millisecond precision so a record reads back
//! identically from memory, SQLite (integer millis) and PostgreSQL.

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Current time truncated to milliseconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Next `updated_at` value after `previous`
///
/// Returns `max(now, previous + 1ms)`, so successive mutations always
/// produce strictly increasing timestamps even within one millisecond.
pub fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    std::cmp::max(now(), previous + Duration::milliseconds(1))
}

/// Decode a stored millisecond timestamp
pub fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_now_has_millisecond_precision() {
        let t = now();
        assert_eq!(t.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_advance_from_future_timestamp_adds_one_milli() {
        let future = now() + Duration::hours(1);
        assert_eq!(advance(future), future + Duration::milliseconds(1));
    }

    #[test]
    fn test_millis_round_trip() {
        let t = now();
        assert_eq!(from_millis(t.timestamp_millis()), Some(t));
    }

    proptest! {
        #[test]
        fn prop_advance_is_strictly_increasing(offset_ms in -1_000_000i64..1_000_000i64) {
            let previous = now() + Duration::milliseconds(offset_ms);
            prop_assert!(advance(previous) > previous);
        }
    }
}
