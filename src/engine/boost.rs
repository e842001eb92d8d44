use crate::config::BOOST_WINDOW_DAYS;
use crate::types::BoostWindow;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Remaining days of the boost window for a pair created at
/// `pair_created_at_ms`, or `None` once the window has passed.
///
/// The timestamp comes straight from the feed: values that overflow yield
/// `None`, and a creation time in the future counts as a full window.
pub fn boost_window(pair_created_at_ms: Option<i64>, now_ms: i64) -> Option<BoostWindow> {
    let created = pair_created_at_ms?;
    let window_ms = BOOST_WINDOW_DAYS * DAY_MS;
    let age_ms = now_ms.checked_sub(created)?.max(0);
    if age_ms >= window_ms {
        return None;
    }

    let remaining_ms = window_ms - age_ms;
    // ceil division; 0 < remaining_ms <= window_ms here
    let remaining_days = (remaining_ms + DAY_MS - 1) / DAY_MS;
    Some(BoostWindow {
        remaining_days: remaining_days.min(BOOST_WINDOW_DAYS) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn fresh_pair_has_full_window() {
        let w = boost_window(Some(NOW), NOW).unwrap();
        assert_eq!(w.remaining_days, 30);
    }

    #[test]
    fn partial_days_round_up() {
        let created = NOW - (29 * DAY_MS + 1);
        assert_eq!(boost_window(Some(created), NOW).unwrap().remaining_days, 1);

        let created = NOW - (10 * DAY_MS + DAY_MS / 2);
        assert_eq!(boost_window(Some(created), NOW).unwrap().remaining_days, 20);
    }

    #[test]
    fn expired_or_unknown_has_no_window() {
        assert!(boost_window(Some(NOW - 30 * DAY_MS), NOW).is_none());
        assert!(boost_window(Some(NOW - 400 * DAY_MS), NOW).is_none());
        assert!(boost_window(None, NOW).is_none());
    }

    #[test]
    fn extreme_timestamps_do_not_panic() {
        assert!(boost_window(Some(i64::MIN), NOW).is_none());
        assert!(boost_window(Some(i64::MAX), -NOW).is_none());
        assert_eq!(boost_window(Some(i64::MAX), NOW).unwrap().remaining_days, 30);
    }

    #[test]
    fn future_creation_is_capped_at_full_window() {
        let created = NOW + 100 * DAY_MS;
        assert_eq!(boost_window(Some(created), NOW).unwrap().remaining_days, 30);
    }
}
