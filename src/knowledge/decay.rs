//! Time-based mastery decay
//!
//! Linear in whole days past a grace period, measured from the mastery the
//! record had when it was last reinforced. Decay never touches `last_seen`
//! or the anchor, so applying it twice at the same instant changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mastery::{MasteryRecord, MasteryState};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayPolicy {
    /// Days after last reinforcement before decay starts
    #[serde(default = "default_grace_days")]
    pub grace_days: i64,
    /// Mastery lost per day past the grace period
    #[serde(default = "default_rate_per_day")]
    pub rate_per_day: f64,
}

fn default_grace_days() -> i64 {
    3
}

fn default_rate_per_day() -> f64 {
    0.02
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self { grace_days: default_grace_days(), rate_per_day: default_rate_per_day() }
    }
}

impl DecayPolicy {
    /// Mastery a record should have `elapsed_days` after reinforcement
    pub fn decayed(&self, anchor: f64, elapsed_days: i64) -> f64 {
        if elapsed_days <= self.grace_days {
            return anchor;
        }
        let overdue = (elapsed_days - self.grace_days) as f64;
        (anchor - overdue * self.rate_per_day).max(0.0)
    }

    /// Decay one record; returns whether its mastery changed
    pub fn apply_to(&self, record: &mut MasteryRecord, now: DateTime<Utc>) -> bool {
        let Some(last_seen) = record.last_seen() else {
            return false;
        };

        let elapsed_days = (now - last_seen).num_days();
        if elapsed_days <= self.grace_days {
            return false;
        }

        let target = self.decayed(record.anchor_mastery(), elapsed_days);
        if target == record.mastery() {
            return false;
        }
        record.set_mastery(target);
        true
    }

    /// Decay every record in the state; returns how many changed
    pub fn apply(&self, state: &mut MasteryState, now: DateTime<Utc>) -> usize {
        state
            .records_mut()
            .map(|record| self.apply_to(record, now))
            .filter(|changed| *changed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::mastery::MasteryStatus;
    use chrono::Duration;

    #[test]
    fn test_within_grace_unchanged() {
        let policy = DecayPolicy::default();
        let now = Utc::now();
        for days in 0..=3 {
            let mut record = MasteryRecord::reinforced(0.8, 3, now - Duration::days(days));
            assert!(!policy.apply_to(&mut record, now));
            assert_eq!(record.mastery(), 0.8);
        }
    }

    #[test]
    fn test_ten_days_loses_seven_days_of_rate() {
        let policy = DecayPolicy::default();
        let now = Utc::now();
        let mut record = MasteryRecord::reinforced(0.9, 5, now - Duration::days(10));
        assert!(policy.apply_to(&mut record, now));
        assert!((record.mastery() - 0.76).abs() < 1e-9);
        assert_eq!(record.status(), MasteryStatus::Strong);
        assert_eq!(record.last_seen(), Some(now - Duration::days(10)));
    }

    #[test]
    fn test_floor_at_zero() {
        let policy = DecayPolicy::default();
        let now = Utc::now();
        let mut record = MasteryRecord::reinforced(0.1, 1, now - Duration::days(400));
        policy.apply_to(&mut record, now);
        assert_eq!(record.mastery(), 0.0);
        assert_eq!(record.status(), MasteryStatus::Weak);
    }

    #[test]
    fn test_never_seen_is_never_decayed() {
        let policy = DecayPolicy::default();
        let mut state = MasteryState::default();
        state.get_or_create_record("ml", "untouched");
        assert_eq!(policy.apply(&mut state, Utc::now()), 0);
    }

    #[test]
    fn test_idempotent_at_same_instant() {
        let policy = DecayPolicy::default();
        let now = Utc::now();
        let mut state = MasteryState::default();
        state
            .get_or_create_domain("ml")
            .insert("stale", MasteryRecord::reinforced(0.8, 2, now - Duration::days(10)));

        assert_eq!(policy.apply(&mut state, now), 1);
        let once = state.clone();
        assert_eq!(policy.apply(&mut state, now), 0);
        assert_eq!(state, once);
    }

    #[test]
    fn test_non_compounding_over_time() {
        let policy = DecayPolicy::default();
        let seen = Utc::now();
        let mut record = MasteryRecord::reinforced(0.9, 1, seen);

        policy.apply_to(&mut record, seen + Duration::days(5));
        policy.apply_to(&mut record, seen + Duration::days(8));
        // 5 days past grace, measured from the anchor
        assert!((record.mastery() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_partial_days_truncate() {
        let policy = DecayPolicy::default();
        let now = Utc::now();
        let mut record =
            MasteryRecord::reinforced(0.5, 1, now - Duration::days(3) - Duration::hours(23));
        assert!(!policy.apply_to(&mut record, now));
    }
}
