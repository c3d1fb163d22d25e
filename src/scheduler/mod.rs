//! Spaced-repetition scheduling for question groups.
//!
//! Each group carries one [`SrsState`] with a difficulty in `[1, 10]` and a
//! stability in days. Rating a group moves both and produces the next due
//! timestamp. Skipping hides a group until the start of the next local
//! calendar day without touching its state.
//!
//! All timestamps are Unix epoch milliseconds. Intervals are whole days.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DAY_MS;
use crate::model::{Group, Print};

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;
pub const INITIAL_DIFFICULTY: f64 = 5.0;
pub const INITIAL_STABILITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }

    /// Additive difficulty adjustment for this rating.
    fn difficulty_delta(&self) -> f64 {
        match self {
            Rating::Again => 1.2,
            Rating::Hard => 0.6,
            Rating::Good => -0.1,
            Rating::Easy => -0.5,
        }
    }
}

/// Per-group scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrsState {
    pub group_id: Uuid,
    pub difficulty: f64,
    /// Stability in days. Grows on success, collapses on Again.
    pub stability: f64,
    pub next_due_at: i64,
    #[serde(default)]
    pub last_reviewed_at: Option<i64>,
    #[serde(default)]
    pub last_rating: Option<Rating>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub lapse_count: u32,
}

impl SrsState {
    /// Fresh state for a new group: medium difficulty, one day stability,
    /// due immediately.
    pub fn new(group_id: Uuid, now: i64) -> Self {
        Self {
            group_id,
            difficulty: INITIAL_DIFFICULTY,
            stability: INITIAL_STABILITY,
            next_due_at: now,
            last_reviewed_at: None,
            last_rating: None,
            review_count: 0,
            lapse_count: 0,
        }
    }

    /// Apply a rating at `now` and return the updated state.
    ///
    /// Difficulty moves additively and clamps to `[1, 10]`. Higher difficulty
    /// shrinks the stability growth factor, so hard material accumulates
    /// interval length more slowly. The interval is floored per rating so a
    /// success never schedules sooner than its rating promises.
    pub fn update(&self, rating: Rating, now: i64) -> Self {
        let difficulty =
            (self.difficulty + rating.difficulty_delta()).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        let factor = 1.0 - (difficulty - MIN_DIFFICULTY) / 20.0;

        let stability = match rating {
            Rating::Again => (self.stability * 0.35).max(0.5),
            Rating::Hard => (self.stability * 1.25 * factor).max(0.8),
            Rating::Good => (self.stability * 1.9 * factor).max(1.0),
            Rating::Easy => (self.stability * 2.6 * factor).max(2.0),
        };

        let interval_days = match rating {
            Rating::Again => 1,
            Rating::Hard => ((stability * 0.7).round() as i64).max(2),
            Rating::Good => (stability.round() as i64).max(3),
            Rating::Easy => ((stability * 1.4).round() as i64).max(7),
        };

        Self {
            group_id: self.group_id,
            difficulty,
            stability,
            next_due_at: now + interval_days * DAY_MS,
            last_reviewed_at: Some(now),
            last_rating: Some(rating),
            review_count: self.review_count + 1,
            lapse_count: self.lapse_count + u32::from(rating == Rating::Again),
        }
    }
}

/// One past rating, kept forever for the per-group history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub id: Uuid,
    pub group_id: Uuid,
    pub rating: Rating,
    pub reviewed_at: i64,
    /// Interval in days produced by this rating.
    pub interval_days: i64,
}

/// Hides a group from the due queue until `skip_until`, without rating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipRecord {
    pub group_id: Uuid,
    pub skip_until: i64,
}

/// Start of the next local calendar day after `now`, in epoch millis.
///
/// A skip always lasts until tomorrow morning local time, however late in
/// the day it happens.
pub fn start_of_next_local_day(now: i64) -> i64 {
    let Some(utc) = DateTime::from_timestamp_millis(now) else {
        return now + DAY_MS;
    };
    let next_day = utc.with_timezone(&Local).date_naive() + Duration::days(1);
    next_day
        .and_hms_opt(0, 0, 0)
        // earliest() covers a DST transition sitting on midnight
        .and_then(|t| t.and_local_timezone(Local).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(now + DAY_MS)
}

/// A group in the due queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueEntry {
    pub group_id: Uuid,
    pub print_id: Uuid,
    pub next_due_at: i64,
}

/// Groups due for review: active, past their due time, not skipped today,
/// optionally restricted to one subject. Sorted most overdue first.
pub fn compute_due(
    groups: &[Group],
    prints: &[Print],
    srs: &[SrsState],
    skips: &[SkipRecord],
    now: i64,
    subject: Option<&str>,
) -> Vec<DueEntry> {
    let mut due: Vec<DueEntry> = groups
        .iter()
        .filter(|g| g.is_active)
        .filter(|g| match subject {
            Some(s) => prints
                .iter()
                .find(|p| p.id == g.print_id)
                .is_some_and(|p| p.display_subject() == s),
            None => true,
        })
        .filter_map(|g| {
            let state = srs.iter().find(|s| s.group_id == g.id)?;
            if state.next_due_at > now {
                return None;
            }
            if skips.iter().any(|s| s.group_id == g.id && s.skip_until > now) {
                return None;
            }
            Some(DueEntry {
                group_id: g.id,
                print_id: g.print_id,
                next_due_at: state.next_due_at,
            })
        })
        .collect();
    due.sort_by_key(|e| (e.next_due_at, e.group_id));
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> SrsState {
        SrsState::new(Uuid::new_v4(), 0)
    }

    #[test]
    fn test_new_state_is_due_immediately() {
        let s = SrsState::new(Uuid::new_v4(), 1000);
        assert_eq!(s.difficulty, 5.0);
        assert_eq!(s.stability, 1.0);
        assert_eq!(s.next_due_at, 1000);
        assert!(s.last_rating.is_none());
    }

    #[test]
    fn test_good_from_fresh() {
        let s = fresh().update(Rating::Good, 0);
        assert!((s.difficulty - 4.9).abs() < 1e-9);
        // factor = 1 - 3.9/20 = 0.805, stability = 1.9 * 0.805
        assert!((s.stability - 1.5295).abs() < 1e-9);
        // round(1.5295) = 2, floored to 3 days
        assert_eq!(s.next_due_at, 3 * DAY_MS);
        assert_eq!(s.last_rating, Some(Rating::Good));
    }

    #[test]
    fn test_again_from_fresh_collapses_stability() {
        let s = fresh().update(Rating::Again, 0);
        assert!((s.difficulty - 6.2).abs() < 1e-9);
        assert_eq!(s.stability, 0.5);
        assert_eq!(s.next_due_at, DAY_MS);
    }

    #[test]
    fn test_hard_from_fresh() {
        let s = fresh().update(Rating::Hard, 0);
        assert!((s.difficulty - 5.6).abs() < 1e-9);
        // factor = 1 - 4.6/20 = 0.77, stability = max(0.8, 1.25 * 0.77)
        assert!((s.stability - 0.9625).abs() < 1e-9);
        // round(0.9625 * 0.7) = 1, floored to 2 days
        assert_eq!(s.next_due_at, 2 * DAY_MS);
    }

    #[test]
    fn test_easy_from_fresh() {
        let s = fresh().update(Rating::Easy, 0);
        assert!((s.difficulty - 4.5).abs() < 1e-9);
        // factor = 0.825, stability = max(2.0, 2.6 * 0.825) = 2.145
        assert!((s.stability - 2.145).abs() < 1e-9);
        // round(2.145 * 1.4) = 3, floored to 7 days
        assert_eq!(s.next_due_at, 7 * DAY_MS);
    }

    #[test]
    fn test_difficulty_clamps_at_bounds() {
        let mut s = fresh();
        for _ in 0..20 {
            s = s.update(Rating::Again, 0);
        }
        assert_eq!(s.difficulty, MAX_DIFFICULTY);

        let mut s = fresh();
        for _ in 0..20 {
            s = s.update(Rating::Easy, 0);
        }
        assert_eq!(s.difficulty, MIN_DIFFICULTY);
    }

    #[test]
    fn test_stability_never_below_floor() {
        let mut s = fresh();
        for _ in 0..10 {
            s = s.update(Rating::Again, 0);
            assert!(s.stability >= 0.5);
        }
    }

    #[test]
    fn test_repeated_good_grows_intervals() {
        let mut s = fresh();
        let mut prev_interval = 0;
        for _ in 0..6 {
            let next = s.update(Rating::Good, 0);
            let interval = next.next_due_at / DAY_MS;
            assert!(interval >= prev_interval);
            prev_interval = interval;
            s = next;
        }
        assert!(prev_interval > 3);
    }

    #[test]
    fn test_rating_order_respects_interval_order() {
        let base = fresh().update(Rating::Good, 0).update(Rating::Good, 0);
        let again = base.update(Rating::Again, 0).next_due_at;
        let hard = base.update(Rating::Hard, 0).next_due_at;
        let good = base.update(Rating::Good, 0).next_due_at;
        let easy = base.update(Rating::Easy, 0).next_due_at;
        assert!(again <= hard && hard <= good && good <= easy);
    }

    #[test]
    fn test_counters_track_reviews_and_lapses() {
        let s = fresh()
            .update(Rating::Good, 100)
            .update(Rating::Again, 200)
            .update(Rating::Hard, 300);
        assert_eq!(s.review_count, 3);
        assert_eq!(s.lapse_count, 1);
        assert_eq!(s.last_reviewed_at, Some(300));
    }

    #[test]
    fn test_start_of_next_local_day_is_after_now() {
        let now = chrono::Utc::now().timestamp_millis();
        let next = start_of_next_local_day(now);
        assert!(next > now);
        assert!(next <= now + DAY_MS);
    }

    #[test]
    fn test_rating_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Rating::Again).unwrap(), "\"again\"");
        let r: Rating = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(r, Rating::Easy);
    }

    mod due {
        use super::*;

        fn group(print_id: Uuid, active: bool) -> Group {
            Group {
                id: Uuid::new_v4(),
                print_id,
                page_index: 0,
                label: "Q1".into(),
                order_index: 0,
                is_active: active,
                created_at: 0,
            }
        }

        fn print(subject: &str) -> Print {
            Print {
                id: Uuid::new_v4(),
                title: "t".into(),
                subject: subject.into(),
                subject_other: String::new(),
                created_at: 0,
            }
        }

        fn due_state(group_id: Uuid, next_due_at: i64) -> SrsState {
            SrsState {
                next_due_at,
                ..SrsState::new(group_id, 0)
            }
        }

        #[test]
        fn test_due_sorted_most_overdue_first() {
            let p = print("Math");
            let g1 = group(p.id, true);
            let g2 = group(p.id, true);
            let srs = vec![due_state(g1.id, 500), due_state(g2.id, 100)];
            let due = compute_due(&[g1.clone(), g2.clone()], &[p], &srs, &[], 1000, None);
            assert_eq!(due.len(), 2);
            assert_eq!(due[0].group_id, g2.id);
            assert_eq!(due[1].group_id, g1.id);
        }

        #[test]
        fn test_future_inactive_and_skipped_are_excluded() {
            let p = print("Math");
            let future = group(p.id, true);
            let inactive = group(p.id, false);
            let skipped = group(p.id, true);
            let srs = vec![
                due_state(future.id, 5000),
                due_state(inactive.id, 0),
                due_state(skipped.id, 0),
            ];
            let skips = vec![SkipRecord {
                group_id: skipped.id,
                skip_until: 9000,
            }];
            let due = compute_due(&[future, inactive, skipped], &[p], &srs, &skips, 1000, None);
            assert!(due.is_empty());
        }

        #[test]
        fn test_expired_skip_no_longer_excludes() {
            let p = print("Math");
            let g = group(p.id, true);
            let srs = vec![due_state(g.id, 0)];
            let skips = vec![SkipRecord {
                group_id: g.id,
                skip_until: 500,
            }];
            let due = compute_due(&[g], &[p], &srs, &skips, 1000, None);
            assert_eq!(due.len(), 1);
        }

        #[test]
        fn test_subject_filter_uses_display_subject() {
            let math = print("Math");
            let mut custom = print("Other");
            custom.subject_other = "Geography".into();
            let g1 = group(math.id, true);
            let g2 = group(custom.id, true);
            let srs = vec![due_state(g1.id, 0), due_state(g2.id, 0)];
            let prints = vec![math, custom];
            let groups = vec![g1.clone(), g2.clone()];

            let due = compute_due(&groups, &prints, &srs, &[], 1000, Some("Geography"));
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].group_id, g2.id);
        }

        #[test]
        fn test_rating_removes_exactly_that_group_from_due() {
            let p = print("Math");
            let g1 = group(p.id, true);
            let g2 = group(p.id, true);
            let mut srs = vec![due_state(g1.id, 0), due_state(g2.id, 0)];
            let now = 1000;

            srs[0] = srs[0].update(Rating::Good, now);
            let groups = vec![g1.clone(), g2.clone()];
            let due = compute_due(&groups, &[p], &srs, &[], now, None);
            assert_eq!(due.len(), 1);
            assert_eq!(due[0].group_id, g2.id);
        }

        #[test]
        fn test_group_without_state_is_not_due() {
            let p = print("Math");
            let g = group(p.id, true);
            let due = compute_due(&[g], &[p], &[], &[], 1000, None);
            assert!(due.is_empty());
        }
    }
}
