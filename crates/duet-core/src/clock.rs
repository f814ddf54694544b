//! Wall-clock helpers.
//!
//! Domain timestamps are milliseconds since the Unix epoch. Remote rows and
//! export documents use RFC 3339 strings.

use chrono::Utc;

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Returns a timestamp strictly greater than `previous`, preferring `now`.
///
/// Used for `updated_at` bumps: two mutations within the same millisecond
/// must still be ordered.
pub fn bump_after(previous: i64, now: i64) -> i64 {
    now.max(previous.saturating_add(1))
}

/// Returns a timestamp no earlier than `previous`, preferring `now`.
///
/// Used for message timestamps, which must be non-decreasing even if the
/// wall clock steps backwards.
pub fn not_before(previous: i64, now: i64) -> i64 {
    now.max(previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_after_is_strictly_greater() {
        assert_eq!(bump_after(100, 50), 101);
        assert_eq!(bump_after(100, 100), 101);
        assert_eq!(bump_after(100, 200), 200);
    }

    #[test]
    fn test_not_before_is_monotonic() {
        assert_eq!(not_before(100, 50), 100);
        assert_eq!(not_before(100, 150), 150);
    }
}
