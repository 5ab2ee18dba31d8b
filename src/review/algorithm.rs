//! Review scheduling algorithm
//!
//! A small ease/interval scheme in the spirit of SM-2, reduced to three
//! outcomes:
//! - OK: ease grows by 0.08, interval multiplies by the new ease (3..=90 days)
//! - BAD: ease drops by 0.2, interval resets to one day
//! - SKIP: schedule untouched, re-presentation deferred by six hours
//!
//! Everything here is pure: callers pass `now` explicitly.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::models::{Grade, ReviewEntry, ReviewState, MAX_EASE, MIN_EASE};

const OK_EASE_STEP: f64 = 0.08;
const BAD_EASE_STEP: f64 = 0.2;

/// Interval used for an OK on an item that has no interval yet
const FIRST_OK_INTERVAL: u32 = 3;
const MIN_OK_INTERVAL: u32 = 3;
const MAX_OK_INTERVAL: u32 = 90;
const BAD_INTERVAL: u32 = 1;

/// How far a skip pushes the next presentation
const SKIP_DEFER_HOURS: i64 = 6;

/// Overdue days assumed for an item that was never scheduled
const UNSCHEDULED_OVERDUE_DAYS: f64 = 999.0;
/// Bonus that surfaces never-graded items first
const UNSEEN_BONUS: f64 = 3.0;

/// Number of top-ranked items the random pick is drawn from
const SELECTION_WINDOW: usize = 7;

fn clamp_ease(ease: f64) -> f64 {
    ease.clamp(MIN_EASE, MAX_EASE)
}

/// An item is due when it was never scheduled or its due time has passed
pub fn is_due(state: &ReviewState, now: DateTime<Utc>) -> bool {
    match state.due_at {
        None => true,
        Some(due) => due <= now,
    }
}

/// Apply a graded outcome and return the updated state
pub fn grade(state: &ReviewState, outcome: Grade, now: DateTime<Utc>) -> ReviewState {
    let mut next = state.clone();

    match outcome {
        Grade::Ok => {
            let ease = clamp_ease(state.ease + OK_EASE_STEP);
            // The interval grows by the updated ease, not the pre-grade one
            let interval = if state.interval_days == 0 {
                FIRST_OK_INTERVAL
            } else {
                (state.interval_days as f64 * ease).round() as u32
            };
            let interval = interval.clamp(MIN_OK_INTERVAL, MAX_OK_INTERVAL);

            next.ease = ease;
            next.interval_days = interval;
            next.due_at = Some(now + Duration::days(interval as i64));
            next.counters.ok = next.counters.ok.saturating_add(1);
        }
        Grade::Bad => {
            next.ease = clamp_ease(state.ease - BAD_EASE_STEP);
            next.interval_days = BAD_INTERVAL;
            next.due_at = Some(now + Duration::days(BAD_INTERVAL as i64));
            next.counters.bad = next.counters.bad.saturating_add(1);
        }
        Grade::Skip => {
            let deferred = now + Duration::hours(SKIP_DEFER_HOURS);
            next.ease = clamp_ease(state.ease);
            next.due_at = Some(match state.due_at {
                Some(due) => due.max(deferred),
                None => deferred,
            });
            next.counters.skip = next.counters.skip.saturating_add(1);
        }
    }

    next.last_seen = Some(now);
    next.last_grade = Some(outcome);
    next
}

/// Fractional days since the item became due (never negative)
fn overdue_days(state: &ReviewState, now: DateTime<Utc>) -> f64 {
    match state.due_at {
        None => UNSCHEDULED_OVERDUE_DAYS,
        Some(due) => {
            let millis = (now - due).num_milliseconds() as f64;
            (millis / Duration::days(1).num_milliseconds() as f64).max(0.0)
        }
    }
}

/// Priority of an item; higher means it should be shown sooner
pub fn rank_score(state: &ReviewState, now: DateTime<Utc>) -> f64 {
    let bad_bias = (state.counters.bad as f64 / 10.0).min(1.0);
    let unseen = if state.last_seen.is_none() {
        UNSEEN_BONUS
    } else {
        0.0
    };
    overdue_days(state, now) * 2.0 + bad_bias + unseen
}

/// Order entries by descending rank score. Ties keep their input order.
pub fn rank<'a>(pool: &'a [ReviewEntry], now: DateTime<Utc>) -> Vec<&'a ReviewEntry> {
    let mut scored: Vec<(f64, &ReviewEntry)> = pool
        .iter()
        .map(|entry| (rank_score(&entry.state, now), entry))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, entry)| entry).collect()
}

/// Pick the next entry to present: a uniform draw among the top-ranked few
pub fn select_next<'a, R: Rng + ?Sized>(
    pool: &'a [ReviewEntry],
    rng: &mut R,
    now: DateTime<Utc>,
) -> Option<&'a ReviewEntry> {
    if pool.is_empty() {
        return None;
    }

    let ranked = rank(pool, now);
    let window = SELECTION_WINDOW.min(ranked.len());
    let pick = rng.gen_range(0..window);
    Some(ranked[pick])
}

/// Intervals each grade would produce, in `Grade::ALL` order
pub fn preview_intervals(state: &ReviewState, now: DateTime<Utc>) -> [u32; 3] {
    Grade::ALL.map(|g| grade(state, g, now).interval_days)
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn fresh() -> ReviewState {
        ReviewState::new()
    }

    fn entry(id: &str, state: ReviewState) -> ReviewEntry {
        ReviewEntry {
            item_id: id.to_string(),
            state,
        }
    }

    fn sample_states() -> Vec<ReviewState> {
        let mut states = Vec::new();
        for ease in [1.3, 1.31, 1.5, 2.0, 2.5, 2.75, 2.8] {
            for interval in [0, 1, 2, 3, 10, 40, 89, 90, 200] {
                for due in [None, Some(now() - Duration::days(5)), Some(now() + Duration::days(5))] {
                    states.push(ReviewState {
                        ease,
                        interval_days: interval,
                        due_at: due,
                        ..ReviewState::default()
                    });
                }
            }
        }
        states
    }

    #[test]
    fn test_fresh_item_ok() {
        let next = grade(&fresh(), Grade::Ok, now());
        assert!((next.ease - 2.08).abs() < 1e-9);
        assert_eq!(next.interval_days, 3);
        assert_eq!(next.due_at, Some(now() + Duration::days(3)));
        assert_eq!(next.counters.ok, 1);
        assert_eq!(next.last_seen, Some(now()));
        assert_eq!(next.last_grade, Some(Grade::Ok));
    }

    #[test]
    fn test_second_ok_uses_updated_ease() {
        let first = grade(&fresh(), Grade::Ok, now());
        let second = grade(&first, Grade::Ok, now());
        assert!((second.ease - 2.16).abs() < 1e-9);
        // round(3 * 2.16) = 6
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.counters.ok, 2);
    }

    #[test]
    fn test_counters_stop_at_max() {
        let mut state = fresh();
        state.counters.ok = u32::MAX;
        state.counters.bad = u32::MAX;
        state.counters.skip = u32::MAX;

        for outcome in [Grade::Ok, Grade::Bad, Grade::Skip] {
            state = grade(&state, outcome, now());
        }
        assert_eq!(state.counters.ok, u32::MAX);
        assert_eq!(state.counters.bad, u32::MAX);
        assert_eq!(state.counters.skip, u32::MAX);
    }

    #[test]
    fn test_fresh_item_bad() {
        let next = grade(&fresh(), Grade::Bad, now());
        assert!((next.ease - 1.8).abs() < 1e-9);
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.due_at, Some(now() + Duration::days(1)));
        assert_eq!(next.counters.bad, 1);
    }

    #[test]
    fn test_bad_at_floor_stays_clamped() {
        let state = ReviewState {
            ease: 1.3,
            interval_days: 12,
            ..ReviewState::default()
        };
        let next = grade(&state, Grade::Bad, now());
        assert_eq!(next.ease, 1.3);
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_ok_caps_interval_at_ninety_days() {
        let state = ReviewState {
            ease: 2.8,
            interval_days: 60,
            ..ReviewState::default()
        };
        let next = grade(&state, Grade::Ok, now());
        assert_eq!(next.ease, 2.8);
        assert_eq!(next.interval_days, 90);
    }

    #[test]
    fn test_skip_defers_without_rescheduling() {
        let state = ReviewState {
            ease: 2.3,
            interval_days: 8,
            due_at: Some(now() - Duration::days(2)),
            ..ReviewState::default()
        };
        let next = grade(&state, Grade::Skip, now());
        assert_eq!(next.ease, 2.3);
        assert_eq!(next.interval_days, 8);
        assert_eq!(next.due_at, Some(now() + Duration::hours(6)));
        assert_eq!(next.counters.skip, 1);

        // A due date further out than the deferral is kept
        let later = ReviewState {
            due_at: Some(now() + Duration::days(4)),
            ..state
        };
        let next = grade(&later, Grade::Skip, now());
        assert_eq!(next.due_at, Some(now() + Duration::days(4)));
    }

    #[test]
    fn test_ok_bounds_hold_for_all_states() {
        for state in sample_states() {
            let next = grade(&state, Grade::Ok, now());
            assert!((MIN_EASE..=MAX_EASE).contains(&next.ease), "{:?}", state);
            assert!((3..=90).contains(&next.interval_days), "{:?}", state);
            assert!(next.due_at.unwrap() > now());
        }
    }

    #[test]
    fn test_bad_bounds_hold_for_all_states() {
        for state in sample_states() {
            let next = grade(&state, Grade::Bad, now());
            assert_eq!(next.interval_days, 1);
            assert!(next.ease <= state.ease);
            assert!(next.ease >= MIN_EASE);
        }
    }

    #[test]
    fn test_skip_keeps_schedule_for_all_states() {
        for state in sample_states() {
            let next = grade(&state, Grade::Skip, now());
            assert_eq!(next.ease, state.ease);
            assert_eq!(next.interval_days, state.interval_days);
        }
    }

    #[test]
    fn test_is_due() {
        assert!(is_due(&fresh(), now()));

        let mut state = fresh();
        state.due_at = Some(now());
        assert!(is_due(&state, now()));

        state.due_at = Some(now() + Duration::seconds(1));
        assert!(!is_due(&state, now()));
    }

    #[test]
    fn test_rank_score() {
        // Never scheduled, never seen
        assert_eq!(rank_score(&fresh(), now()), 999.0 * 2.0 + 3.0);

        let state = ReviewState {
            due_at: Some(now() - Duration::days(2)),
            last_seen: Some(now() - Duration::days(5)),
            counters: crate::review::Counters { ok: 0, bad: 4, skip: 0 },
            ..ReviewState::default()
        };
        assert!((rank_score(&state, now()) - (4.0 + 0.4)).abs() < 1e-9);

        // Not yet due contributes no overdue weight; bad bias caps at 1
        let state = ReviewState {
            due_at: Some(now() + Duration::days(3)),
            last_seen: Some(now()),
            counters: crate::review::Counters { ok: 0, bad: 25, skip: 0 },
            ..ReviewState::default()
        };
        assert_eq!(rank_score(&state, now()), 1.0);
    }

    #[test]
    fn test_select_next_empty_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select_next(&[], &mut rng, now()).is_none());
    }

    #[test]
    fn test_select_next_draws_from_top_window() {
        let mut pool = Vec::new();
        // Eight items that are far from due and seen, scored 0
        for i in 0..8 {
            pool.push(entry(
                &format!("later-{}", i),
                ReviewState {
                    due_at: Some(now() + Duration::days(10)),
                    last_seen: Some(now()),
                    ..ReviewState::default()
                },
            ));
        }
        // Seven overdue items rank above every "later" item
        for i in 0..7 {
            pool.push(entry(
                &format!("overdue-{}", i),
                ReviewState {
                    due_at: Some(now() - Duration::days(i + 1)),
                    last_seen: Some(now() - Duration::days(20)),
                    ..ReviewState::default()
                },
            ));
        }

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let picked = select_next(&pool, &mut rng, now()).unwrap();
            assert!(picked.item_id.starts_with("overdue-"), "{}", picked.item_id);
        }
    }

    #[test]
    fn test_select_next_is_deterministic_with_seed() {
        let pool: Vec<ReviewEntry> = (0..5).map(|i| entry(&i.to_string(), fresh())).collect();
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(
                select_next(&pool, &mut a, now()).map(|e| e.item_id.clone()),
                select_next(&pool, &mut b, now()).map(|e| e.item_id.clone())
            );
        }
    }

    #[test]
    fn test_preview_intervals() {
        let state = ReviewState {
            ease: 2.5,
            interval_days: 10,
            ..ReviewState::default()
        };
        // OK: round(10 * 2.58) = 26, BAD: 1, SKIP: unchanged
        assert_eq!(preview_intervals(&state, now()), [26, 1, 10]);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(365), "1y");
        assert_eq!(format_interval(730), "2y");
    }
}
