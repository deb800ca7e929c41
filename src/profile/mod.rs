//! Player profile - XP, streaks, levels and milestones
//!
//! Every scored challenge earns XP scaled by difficulty and the current
//! streak, moves the streak, and updates a per-topic score history from
//! which the topic level is derived.

pub mod store;

pub use store::ProfileStore;

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PROFILE_VERSION: u32 = 2;

/// Base XP per score 0..=3
const XP_TABLE: [f64; 4] = [0.0, 5.0, 12.0, 20.0];
const STREAK_STEP: f64 = 0.15;
const STREAK_CAP: f64 = 2.5;
const HINT_PENALTY: f64 = 0.75;

/// Scores kept per topic
const TOPIC_HISTORY: usize = 50;
/// Scores a topic level is judged on
const TOPIC_WINDOW: usize = 20;

const STREAK_MILESTONES: [u32; 3] = [5, 10, 20];
const XP_MILESTONES: [u64; 3] = [500, 2000, 5000];

/// Challenge difficulty, also used as the level ladder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Apprentice,
    Practitioner,
    Expert,
    Master,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] =
        [Difficulty::Apprentice, Difficulty::Practitioner, Difficulty::Expert, Difficulty::Master];

    pub fn multiplier(self) -> f64 {
        match self {
            Difficulty::Apprentice => 1.0,
            Difficulty::Practitioner => 1.5,
            Difficulty::Expert => 2.0,
            Difficulty::Master => 3.0,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Apprentice => write!(f, "Apprentice"),
            Difficulty::Practitioner => write!(f, "Practitioner"),
            Difficulty::Expert => write!(f, "Expert"),
            Difficulty::Master => write!(f, "Master"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown difficulty '{}' (expected Apprentice, Practitioner, Expert or Master)", s)
            })
    }
}

/// XP for one challenge; `streak` is the streak after this challenge
pub fn xp_for(score: u8, difficulty: Difficulty, streak: u32, hint_used: bool) -> u64 {
    let base = XP_TABLE.get(usize::from(score)).copied().unwrap_or(0.0);
    let streak_mult = (1.0 + f64::from(streak) * STREAK_STEP).min(STREAK_CAP);
    let hint_mult = if hint_used { HINT_PENALTY } else { 1.0 };
    (base * difficulty.multiplier() * streak_mult * hint_mult).round_ties_even().max(0.0) as u64
}

/// Overall level from total XP
pub fn overall_level(total_xp: u64) -> Difficulty {
    match total_xp {
        5000.. => Difficulty::Master,
        2000.. => Difficulty::Expert,
        500.. => Difficulty::Practitioner,
        _ => Difficulty::Apprentice,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Every attempt ever, not capped like `scores`
    pub attempts: u32,
    pub scores: Vec<u8>,
    pub level: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_challenged: Option<DateTime<Utc>>,
}

impl TopicRecord {
    /// Share of scores >= 2 over the recent window
    pub fn recent_accuracy(&self) -> Option<f64> {
        let start = self.scores.len().saturating_sub(TOPIC_WINDOW);
        let recent = &self.scores[start..];
        if recent.is_empty() {
            return None;
        }
        let passed = recent.iter().filter(|s| **s >= 2).count();
        Some(passed as f64 / recent.len() as f64)
    }

    pub fn computed_level(&self) -> Difficulty {
        let Some(accuracy) = self.recent_accuracy() else {
            return Difficulty::Apprentice;
        };
        if accuracy >= 0.90 && self.attempts >= 15 {
            Difficulty::Master
        } else if accuracy >= 0.75 && self.attempts >= 10 {
            Difficulty::Expert
        } else if accuracy >= 0.55 && self.attempts >= 5 {
            Difficulty::Practitioner
        } else {
            Difficulty::Apprentice
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub date: DateTime<Utc>,
}

impl Milestone {
    fn new(kind: impl Into<String>, topic: Option<&str>, date: DateTime<Utc>) -> Self {
        Self { kind: kind.into(), topic: topic.map(str::to_string), date }
    }

    fn key(&self) -> (String, String) {
        (self.kind.clone(), self.topic.clone().unwrap_or_default())
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.topic {
            Some(topic) => write!(f, "{} ({})", self.kind, topic),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// One scored challenge
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: u64,
    pub score: u8,
    pub topic: String,
    pub difficulty: Difficulty,
    pub hint_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeOutcome {
    pub xp_earned: u64,
    pub total_xp: u64,
    pub streak: u32,
    pub overall_level: Difficulty,
    pub topic_level: Difficulty,
    pub new_milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub version: u32,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub overall_level: Difficulty,
    pub total_xp: u64,
    pub total_challenges: u64,
    /// Count per score, keyed "0".."3"
    pub scores: BTreeMap<String, u64>,
    pub current_streak: u32,
    pub best_streak: u32,
    #[serde(default)]
    pub topics: BTreeMap<String, TopicRecord>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    pub next_challenge_id: u64,
}

impl Profile {
    pub fn new(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            version: PROFILE_VERSION,
            username: username.into(),
            created_at: now,
            overall_level: Difficulty::Apprentice,
            total_xp: 0,
            total_challenges: 0,
            scores: (0..=3).map(|s: u8| (s.to_string(), 0)).collect(),
            current_streak: 0,
            best_streak: 0,
            topics: BTreeMap::new(),
            milestones: Vec::new(),
            next_challenge_id: 1,
        }
    }

    /// Share of all challenges scored 2 or 3
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_challenges == 0 {
            return None;
        }
        let passed = self.score_count(2) + self.score_count(3);
        Some(passed as f64 / self.total_challenges as f64)
    }

    pub fn score_count(&self, score: u8) -> u64 {
        self.scores.get(&score.to_string()).copied().unwrap_or(0)
    }

    /// Apply one challenge result
    pub fn record(&mut self, challenge: &Challenge, now: DateTime<Utc>) -> ChallengeOutcome {
        match challenge.score {
            2.. => self.current_streak += 1,
            0 => self.current_streak = 0,
            _ => {}
        }
        self.best_streak = self.best_streak.max(self.current_streak);

        let xp = xp_for(challenge.score, challenge.difficulty, self.current_streak, challenge.hint_used);
        self.total_xp += xp;
        self.total_challenges += 1;
        *self.scores.entry(challenge.score.to_string()).or_insert(0) += 1;
        self.overall_level = overall_level(self.total_xp);

        let topic = self.topics.entry(challenge.topic.clone()).or_default();
        topic.attempts += 1;
        topic.scores.push(challenge.score);
        if topic.scores.len() > TOPIC_HISTORY {
            let excess = topic.scores.len() - TOPIC_HISTORY;
            topic.scores.drain(..excess);
        }
        topic.level = topic.computed_level();
        topic.last_challenged = Some(now);
        let topic_level = topic.level;

        self.next_challenge_id = challenge.id + 1;

        let new_milestones = self.new_milestones(&challenge.topic, now);
        self.milestones.extend(new_milestones.iter().cloned());

        ChallengeOutcome {
            xp_earned: xp,
            total_xp: self.total_xp,
            streak: self.current_streak,
            overall_level: self.overall_level,
            topic_level,
            new_milestones,
        }
    }

    fn new_milestones(&self, topic: &str, now: DateTime<Utc>) -> Vec<Milestone> {
        let earned: Vec<(String, String)> = self.milestones.iter().map(Milestone::key).collect();
        let mut found = Vec::new();
        let mut award = |kind: String, topic: Option<&str>| {
            let candidate = Milestone::new(kind, topic, now);
            if !earned.contains(&candidate.key()) {
                found.push(candidate);
            }
        };

        if self.total_challenges == 1 {
            award("first_challenge".to_string(), None);
        }
        for threshold in STREAK_MILESTONES {
            if self.current_streak >= threshold {
                award(format!("streak_{}", threshold), None);
            }
        }
        if let Some(record) = self.topics.get(topic) {
            match record.level {
                Difficulty::Expert => award("topic_expert".to_string(), Some(topic)),
                Difficulty::Master => award("topic_master".to_string(), Some(topic)),
                _ => {}
            }
        }
        for threshold in XP_MILESTONES {
            if self.total_xp >= threshold {
                award(format!("xp_{}", threshold), None);
            }
        }
        found
    }
}
