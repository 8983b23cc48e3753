//! SM-2 spaced repetition algorithm.
//!
//! Based on SuperMemo 2:
//! - A failed recall (quality below 3) resets the repetition count and the interval.
//! - Successful recalls step through 1 day, 6 days, then `interval * ease_factor`.
//! - The ease factor is adjusted after every review, failed or not, and never drops
//!   below the minimum.

use super::SpacedRepetitionAlgorithm;
use crate::types::{to_millis, Quality, ReviewState, DAY_MS, DEFAULT_EASE, MINIMUM_EASE};
use chrono::{DateTime, Utc};

/// SM-2 algorithm parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: DEFAULT_EASE,
            minimum_ease: MINIMUM_EASE,
        }
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self, now: DateTime<Utc>) -> ReviewState {
        ReviewState {
            ease_factor: self.initial_ease,
            ..ReviewState::new_card(now)
        }
    }

    fn schedule(&self, state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
        let (interval, repetition) = if quality.is_pass() {
            let interval = match state.repetition {
                0 => 1,
                1 => 6,
                _ => (f64::from(state.interval) * state.ease_factor).round() as u32,
            };
            (interval.max(1), state.repetition.saturating_add(1))
        } else {
            (1, 0)
        };

        let ease_factor = adjust_ease(state.ease_factor, quality).max(self.minimum_ease);
        let due = to_millis(now).saturating_add(i64::from(interval).saturating_mul(DAY_MS));

        ReviewState {
            interval,
            repetition,
            ease_factor,
            due,
        }
    }
}

/// Ease adjustment applied after every review, before clamping.
fn adjust_ease(ease_factor: f64, quality: Quality) -> f64 {
    let miss = f64::from(Quality::MAX - quality.value());
    ease_factor + (0.1 - miss * (0.08 + miss * 0.02))
}

/// Apply the default SM-2 policy to `state`.
pub fn update(state: &ReviewState, quality: Quality, now: DateTime<Utc>) -> ReviewState {
    Sm2::default().schedule(state, quality, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPSILON: f64 = 1e-9;

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn state(interval: u32, repetition: u32, ease_factor: f64) -> ReviewState {
        ReviewState {
            interval,
            repetition,
            ease_factor,
            due: 0,
        }
    }

    #[test]
    fn failure_resets_repetition_and_interval() {
        for quality in [1, 2] {
            for prior in [state(1, 0, 2.5), state(40, 7, 2.9), state(15, 3, 1.3)] {
                let next = update(&prior, q(quality), now());
                assert_eq!(next.repetition, 0);
                assert_eq!(next.interval, 1);
            }
        }
    }

    #[test]
    fn first_success_is_one_day() {
        for quality in 3..=5 {
            let next = update(&state(30, 0, 1.7), q(quality), now());
            assert_eq!(next.interval, 1);
            assert_eq!(next.repetition, 1);
        }
    }

    #[test]
    fn second_success_is_six_days() {
        for quality in 3..=5 {
            let next = update(&state(17, 1, 3.1), q(quality), now());
            assert_eq!(next.interval, 6);
            assert_eq!(next.repetition, 2);
        }
    }

    #[test]
    fn third_success_scales_by_ease_factor() {
        let next = update(&state(6, 2, 2.5), q(4), now());
        assert_eq!(next.interval, 15);
        assert_eq!(next.repetition, 3);
    }

    #[test]
    fn ease_factor_never_below_minimum() {
        for quality in 1..=5 {
            for ease in [1.3, 1.35, 1.5, 2.5] {
                let next = update(&state(10, 4, ease), q(quality), now());
                assert!(next.ease_factor >= MINIMUM_EASE);
            }
        }
    }

    #[test]
    fn ease_factor_updates_even_on_failure() {
        let next = update(&state(10, 4, 2.5), q(2), now());
        // 2.5 + 0.1 - 3 * (0.08 + 3 * 0.02)
        assert!((next.ease_factor - 2.18).abs() < EPSILON);
    }

    #[test]
    fn ease_factor_has_no_upper_clamp() {
        let next = update(&state(10, 4, 4.0), q(5), now());
        assert!((next.ease_factor - 4.1).abs() < EPSILON);
    }

    #[test]
    fn due_is_interval_days_ahead() {
        let now = now();
        let next = update(&state(6, 2, 2.5), q(5), now);
        assert_eq!(next.due, to_millis(now) + i64::from(next.interval) * DAY_MS);
    }

    #[test]
    fn update_is_deterministic_and_leaves_input_untouched() {
        let now = now();
        let original = state(6, 2, 2.5);
        let copy = original;
        let first = update(&original, q(3), now);
        let second = update(&original, q(3), now);
        assert_eq!(first, second);
        assert_eq!(original, copy);
    }

    #[test]
    fn grade_sequence_trajectory() {
        let now = now();
        let start = Sm2::default().initial_state(now);

        let after_first = update(&start, q(3), now);
        assert_eq!(after_first.interval, 1);
        assert!((after_first.ease_factor - 2.36).abs() < EPSILON);

        let after_second = update(&after_first, q(4), now);
        assert_eq!(after_second.interval, 6);
        assert!((after_second.ease_factor - 2.36).abs() < EPSILON);

        let after_third = update(&after_second, q(5), now);
        assert_eq!(after_third.interval, 14);
        assert_eq!(after_third.repetition, 3);
        assert!((after_third.ease_factor - 2.46).abs() < EPSILON);
    }
}
