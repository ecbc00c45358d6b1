/*!
 * Resolver Tests
 * Arithmetic of limits and additive components
 */

use proptest::prelude::*;
use std::time::{Duration, SystemTime};
use timebox::{resolve, ConfigError, TimeSpec};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn prop_components_sum(
        seconds in 0.0f64..10_000.0,
        minutes in 0.0f64..1_000.0,
        hours in 0.0f64..100.0,
    ) {
        let total = resolve(None, Some(seconds), Some(minutes), Some(hours)).unwrap();
        prop_assert!(close(total, seconds + minutes * 60.0 + hours * 3600.0));
    }

    #[test]
    fn prop_numeric_and_duration_limits_agree(millis in 0u64..10_000_000, extra in 0.0f64..100.0) {
        let as_seconds = resolve(Some(TimeSpec::from(millis as f64 / 1000.0)), Some(extra), None, None).unwrap();
        let as_duration = resolve(Some(Duration::from_millis(millis).into()), Some(extra), None, None).unwrap();
        prop_assert!(close(as_seconds, as_duration));
    }

    #[test]
    fn prop_negative_totals_rejected(seconds in -10_000.0f64..-0.001) {
        let rejected = matches!(
            resolve(None, Some(seconds), None, None),
            Err(ConfigError::InvalidLimit(_))
        );
        prop_assert!(rejected);
    }
}

#[test]
fn test_deadline_reduced_at_resolution() {
    let deadline = SystemTime::now() + Duration::from_secs(10);
    let total = resolve(Some(deadline.into()), Some(5.0), None, None).unwrap();
    assert!(total > 14.9 && total <= 15.0, "got {total}");
}

#[test]
fn test_nothing_means_no_timeout() {
    assert_eq!(resolve(None, None, None, None).unwrap(), 0.0);
}
