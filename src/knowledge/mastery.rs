//! Mastery records and the mastery state document
//!
//! One `MasteryRecord` per (domain, node id). The status label is a pure
//! function of mastery: it is recomputed on every mutation and again when a
//! document is loaded, so whatever status is on disk is never trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// EMA smoothing factor: weight of the newest observation
pub const EMA_ALPHA: f64 = 0.3;

pub const MASTERED_THRESHOLD: f64 = 0.85;
pub const STRONG_THRESHOLD: f64 = 0.70;
pub const DEVELOPING_THRESHOLD: f64 = 0.40;

/// Current schema version of the state document
pub const STATE_VERSION: u32 = 1;

/// Observation value for a discrete challenge score.
///
/// Scores outside 0..=3 map to 0.0; rejecting them is the caller's job.
pub fn observation(score: u8) -> f64 {
    match score {
        1 => 0.3,
        2 => 0.7,
        3 => 1.0,
        _ => 0.0,
    }
}

/// Status band derived from mastery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryStatus {
    Weak,
    Developing,
    Strong,
    Mastered,
}

impl MasteryStatus {
    pub fn from_mastery(mastery: f64) -> Self {
        if mastery >= MASTERED_THRESHOLD {
            MasteryStatus::Mastered
        } else if mastery >= STRONG_THRESHOLD {
            MasteryStatus::Strong
        } else if mastery >= DEVELOPING_THRESHOLD {
            MasteryStatus::Developing
        } else {
            MasteryStatus::Weak
        }
    }
}

impl std::fmt::Display for MasteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasteryStatus::Weak => write!(f, "weak"),
            MasteryStatus::Developing => write!(f, "developing"),
            MasteryStatus::Strong => write!(f, "strong"),
            MasteryStatus::Mastered => write!(f, "mastered"),
        }
    }
}

/// Persisted shape of a record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    mastery: f64,
    #[serde(default)]
    attempts: u32,
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    status: MasteryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor_mastery: Option<f64>,
}

fn default_status() -> MasteryStatus {
    MasteryStatus::Weak
}

/// Mastery of one concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord", into = "StoredRecord")]
pub struct MasteryRecord {
    pub(crate) mastery: f64,
    pub(crate) attempts: u32,
    pub(crate) last_seen: Option<DateTime<Utc>>,
    pub(crate) status: MasteryStatus,
    /// Mastery as of `last_seen`; decay is measured from here
    pub(crate) anchor_mastery: f64,
}

impl Default for MasteryRecord {
    fn default() -> Self {
        Self {
            mastery: 0.0,
            attempts: 0,
            last_seen: None,
            status: MasteryStatus::Weak,
            anchor_mastery: 0.0,
        }
    }
}

impl From<StoredRecord> for MasteryRecord {
    fn from(stored: StoredRecord) -> Self {
        let mastery = clamp_unit(stored.mastery);
        let anchor_mastery = stored.anchor_mastery.map(clamp_unit).unwrap_or(mastery);
        Self {
            mastery,
            attempts: stored.attempts,
            last_seen: stored.last_seen,
            status: MasteryStatus::from_mastery(mastery),
            anchor_mastery,
        }
    }
}

impl From<MasteryRecord> for StoredRecord {
    fn from(record: MasteryRecord) -> Self {
        Self {
            mastery: record.mastery,
            attempts: record.attempts,
            last_seen: record.last_seen,
            status: record.status,
            anchor_mastery: Some(record.anchor_mastery),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl MasteryRecord {
    /// A record last reinforced at `last_seen` with the given mastery
    pub fn reinforced(mastery: f64, attempts: u32, last_seen: DateTime<Utc>) -> Self {
        let mastery = clamp_unit(mastery);
        Self {
            mastery,
            attempts,
            last_seen: Some(last_seen),
            status: MasteryStatus::from_mastery(mastery),
            anchor_mastery: mastery,
        }
    }

    pub fn mastery(&self) -> f64 {
        self.mastery
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn status(&self) -> MasteryStatus {
        self.status
    }

    pub fn anchor_mastery(&self) -> f64 {
        self.anchor_mastery
    }

    /// Fold one challenge score into mastery with an exponential moving average
    pub fn observe(&mut self, score: u8, now: DateTime<Utc>) {
        let blended = EMA_ALPHA * observation(score) + (1.0 - EMA_ALPHA) * self.mastery;
        self.reinforce(blended, self.attempts + 1, now);
    }

    /// Overwrite mastery from an external estimate (no blending)
    pub fn assign(&mut self, mastery: f64, attempts: u32, now: DateTime<Utc>) {
        self.reinforce(mastery, attempts, now);
    }

    fn reinforce(&mut self, mastery: f64, attempts: u32, now: DateTime<Utc>) {
        self.set_mastery(mastery);
        self.anchor_mastery = self.mastery;
        self.attempts = attempts;
        self.last_seen = Some(now);
    }

    /// Change mastery only, keeping status consistent
    pub(crate) fn set_mastery(&mut self, mastery: f64) {
        self.mastery = clamp_unit(mastery);
        self.status = MasteryStatus::from_mastery(self.mastery);
    }
}

/// Records of one domain, keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainState {
    #[serde(default)]
    pub nodes: BTreeMap<String, MasteryRecord>,
}

impl DomainState {
    pub fn get(&self, node_id: &str) -> Option<&MasteryRecord> {
        self.nodes.get(node_id)
    }

    /// Existing record, or a fresh zero-state record inserted for `node_id`
    pub fn get_or_create(&mut self, node_id: &str) -> &mut MasteryRecord {
        self.nodes.entry(node_id.to_string()).or_default()
    }

    pub fn insert(&mut self, node_id: impl Into<String>, record: MasteryRecord) {
        self.nodes.insert(node_id.into(), record);
    }
}

/// The whole per-user document: every domain, every tracked node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub domains: BTreeMap<String, DomainState>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for MasteryState {
    fn default() -> Self {
        Self { version: STATE_VERSION, domains: BTreeMap::new() }
    }
}

impl MasteryState {
    pub fn domain(&self, domain: &str) -> Option<&DomainState> {
        self.domains.get(domain)
    }

    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Existing domain state, or an empty one inserted for `domain`
    pub fn get_or_create_domain(&mut self, domain: &str) -> &mut DomainState {
        self.domains.entry(domain.to_string()).or_default()
    }

    pub fn record(&self, domain: &str, node_id: &str) -> Option<&MasteryRecord> {
        self.domains.get(domain).and_then(|d| d.get(node_id))
    }

    pub fn get_or_create_record(&mut self, domain: &str, node_id: &str) -> &mut MasteryRecord {
        self.get_or_create_domain(domain).get_or_create(node_id)
    }

    /// Every record across all domains
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut MasteryRecord> {
        self.domains.values_mut().flat_map(|d| d.nodes.values_mut())
    }

    pub fn record_count(&self) -> usize {
        self.domains.values().map(|d| d.nodes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_observation_table() {
        assert_eq!(observation(0), 0.0);
        assert_eq!(observation(1), 0.3);
        assert_eq!(observation(2), 0.7);
        assert_eq!(observation(3), 1.0);
        assert_eq!(observation(9), 0.0);
    }

    #[test]
    fn test_status_band_boundaries() {
        assert_eq!(MasteryStatus::from_mastery(0.85), MasteryStatus::Mastered);
        assert_eq!(MasteryStatus::from_mastery(0.8499), MasteryStatus::Strong);
        assert_eq!(MasteryStatus::from_mastery(0.70), MasteryStatus::Strong);
        assert_eq!(MasteryStatus::from_mastery(0.6999), MasteryStatus::Developing);
        assert_eq!(MasteryStatus::from_mastery(0.40), MasteryStatus::Developing);
        assert_eq!(MasteryStatus::from_mastery(0.399), MasteryStatus::Weak);
        assert_eq!(MasteryStatus::from_mastery(0.0), MasteryStatus::Weak);
        assert_eq!(MasteryStatus::from_mastery(1.0), MasteryStatus::Mastered);
    }

    #[test]
    fn test_ema_matches_formula_for_all_scores() {
        for score in 0..=3u8 {
            for step in 0..=10 {
                let prior = step as f64 / 10.0;
                let mut record = MasteryRecord::reinforced(prior, 0, now());
                record.observe(score, now());
                let expected = (0.3 * observation(score) + 0.7 * prior).clamp(0.0, 1.0);
                assert!((record.mastery() - expected).abs() < 1e-12, "s={} m={}", score, prior);
                assert_eq!(record.status(), MasteryStatus::from_mastery(record.mastery()));
            }
        }
    }

    #[test]
    fn test_first_correct_answer() {
        let mut record = MasteryRecord::default();
        record.observe(2, now());
        assert!((record.mastery() - 0.21).abs() < 1e-9);
        assert_eq!(record.attempts(), 1);
        assert_eq!(record.last_seen(), Some(now()));
        assert_eq!(record.status(), MasteryStatus::Weak);
        assert_eq!(record.anchor_mastery(), record.mastery());
    }

    #[test]
    fn test_load_recomputes_status_and_anchor() {
        let json = r#"{"mastery": 0.9, "attempts": 4, "last_seen": null, "status": "weak"}"#;
        let record: MasteryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status(), MasteryStatus::Mastered);
        assert_eq!(record.anchor_mastery(), 0.9);

        let json = r#"{"mastery": 3.5, "attempts": 1, "last_seen": null, "status": "mastered"}"#;
        let record: MasteryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.mastery(), 1.0);
    }

    #[test]
    fn test_get_or_create_is_lazy_and_preserving() {
        let mut state = MasteryState::default();
        assert!(state.record("ml", "x").is_none());

        state.get_or_create_record("ml", "x").observe(3, now());
        let mastery = state.record("ml", "x").unwrap().mastery();

        // a second get-or-create must not reset the record
        state.get_or_create_record("ml", "x");
        assert_eq!(state.record("ml", "x").unwrap().mastery(), mastery);
        assert_eq!(state.record_count(), 1);
    }

    #[test]
    fn test_state_document_shape() {
        let mut state = MasteryState::default();
        state.get_or_create_record("ml", "backprop");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["version"], 1);
        let node = &value["domains"]["ml"]["nodes"]["backprop"];
        assert_eq!(node["mastery"], 0.0);
        assert_eq!(node["attempts"], 0);
        assert!(node["last_seen"].is_null());
        assert_eq!(node["status"], "weak");
    }
}
