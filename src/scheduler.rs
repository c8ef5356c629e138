use chrono::{DateTime, Duration, Utc};

// How much a single attempt moves the mastery level, up or down.
pub const MASTERY_STEP: f64 = 0.1;

const MASTERY_MIN: f64 = 0.0;
const MASTERY_MAX: f64 = 1.0;

// Seconds per day, used to turn a fractional day offset into a Duration.
const DAY_SECS: f64 = 86_400.0;

// Apply one attempt outcome to a mastery level, clamped to [0.0, 1.0].
pub fn step(current_level: f64, success: bool) -> f64 {
    let next = if success {
        current_level + MASTERY_STEP
    } else {
        current_level - MASTERY_STEP
    };
    next.clamp(MASTERY_MIN, MASTERY_MAX)
}

// Days until the next review for a given mastery level.
//
// Exponential growth: 1 day at level 0.0, ~e^2 (7.39) days at level 1.0,
// so well-known problems come back exponentially less often.
pub fn review_offset_days(level: f64) -> f64 {
    (level * 2.0).exp()
}

// Next review timestamp for a mastery level, relative to `now`.
pub fn next_review_at(now: DateTime<Utc>, level: f64) -> DateTime<Utc> {
    let offset_secs = (review_offset_days(level) * DAY_SECS).round() as i64;
    now + Duration::seconds(offset_secs)
}

// Update a mastery level from an attempt outcome and schedule the next review.
//
// Pure arithmetic; persisting the result is the caller's job.
pub fn update_mastery(current_level: f64, success: bool) -> (f64, DateTime<Utc>) {
    let new_level = step(current_level, success);
    (new_level, next_review_at(Utc::now(), new_level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPSILON: f64 = 1e-9;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    mod step_tests {
        use super::*;

        #[test]
        fn success_increases_by_step() {
            assert!((step(0.5, true) - 0.6).abs() < EPSILON);
        }

        #[test]
        fn failure_decreases_by_step() {
            assert!((step(0.5, false) - 0.4).abs() < EPSILON);
        }

        #[test]
        fn first_success_from_zero() {
            assert!((step(0.0, true) - 0.1).abs() < EPSILON);
        }

        #[test]
        fn success_clamps_at_one() {
            assert_eq!(step(1.0, true), 1.0);
            assert_eq!(step(0.95, true), 1.0);
        }

        #[test]
        fn failure_clamps_at_zero() {
            assert_eq!(step(0.0, false), 0.0);
            assert_eq!(step(0.05, false), 0.0);
        }

        #[test]
        fn ten_successes_saturate_at_one() {
            let mut level = 0.0;
            for _ in 0..10 {
                level = step(level, true);
                assert!(level <= 1.0);
            }
            assert!((level - 1.0).abs() < EPSILON);

            // Further successes stay pinned.
            assert_eq!(step(level, true), 1.0);
        }

        #[test]
        fn ten_failures_saturate_at_zero() {
            let mut level = 1.0;
            for _ in 0..10 {
                level = step(level, false);
                assert!(level >= 0.0);
            }
            assert!(level.abs() < EPSILON);

            assert_eq!(step(level, false), 0.0);
        }
    }

    mod interval_tests {
        use super::*;

        #[test]
        fn offset_at_zero_is_one_day() {
            assert!((review_offset_days(0.0) - 1.0).abs() < EPSILON);
        }

        #[test]
        fn offset_at_one_is_e_squared() {
            let expected = std::f64::consts::E.powi(2);
            assert!((review_offset_days(1.0) - expected).abs() < 1e-6);
        }

        #[test]
        fn offset_grows_exponentially_not_linearly() {
            // exp(2 * 0.5) = e, while linear interpolation between the
            // endpoints would give (1 + e^2) / 2.
            let mid = review_offset_days(0.5);
            assert!((mid - std::f64::consts::E).abs() < 1e-6);

            let linear_mid = (review_offset_days(0.0) + review_offset_days(1.0)) / 2.0;
            assert!(mid < linear_mid);
        }

        #[test]
        fn next_review_strictly_increases_with_mastery() {
            let now = fixed_now();
            let mut prev = next_review_at(now, 0.0);
            for i in 1..=10 {
                let level = i as f64 / 10.0;
                let next = next_review_at(now, level);
                assert!(next > prev, "next_review should increase at level {}", level);
                prev = next;
            }
        }

        #[test]
        fn next_review_at_zero_is_tomorrow() {
            let now = fixed_now();
            let next = next_review_at(now, 0.0);
            assert_eq!(next - now, Duration::seconds(86_400));
        }

        #[test]
        fn next_review_at_one_is_about_a_week_out() {
            let now = fixed_now();
            let next = next_review_at(now, 1.0);
            let days = (next - now).num_seconds() as f64 / 86_400.0;
            assert!(days > 7.38 && days < 7.40, "got {} days", days);
        }
    }

    mod update_tests {
        use super::*;

        #[test]
        fn update_returns_stepped_level() {
            let (level, _) = update_mastery(0.3, true);
            assert!((level - 0.4).abs() < EPSILON);

            let (level, _) = update_mastery(0.3, false);
            assert!((level - 0.2).abs() < EPSILON);
        }

        #[test]
        fn update_schedules_in_the_future() {
            let before = Utc::now();
            let (_, next_review) = update_mastery(0.0, false);
            // Level 0.0 after failure -> 1 day out.
            assert!(next_review > before);
        }

        #[test]
        fn update_success_schedules_further_than_failure() {
            let (_, after_success) = update_mastery(0.5, true);
            let (_, after_failure) = update_mastery(0.5, false);
            assert!(after_success > after_failure);
        }
    }
}
