//! Plain-text rendering of graphs, rankings, analysis runs and the profile

use std::fmt;

use serde_json::{json, Value};

use crate::analyzer::{AnalysisOutcome, AnalysisSummary, CodeMatch, ConceptScore, Signal};
use crate::knowledge::{ConceptGraph, ConceptNode, MasteryRecord, MasteryStatus, RankedNode};
use crate::profile::{ChallengeOutcome, Profile};

const GRAPH_BAR_WIDTH: usize = 30;
const ANALYSIS_BAR_WIDTH: usize = 8;
const ANALYSIS_TOP: usize = 10;
const QUEUE_LEN: usize = 5;
const RULE_WIDTH: usize = 60;

fn status_tag(status: MasteryStatus) -> &'static str {
    match status {
        MasteryStatus::Mastered => "[MASTERED]",
        MasteryStatus::Strong => "[STRONG]  ",
        MasteryStatus::Developing => "[GOOD]    ",
        MasteryStatus::Weak => "[WEAK]    ",
    }
}

/// `filled` solid cells padded with light cells to `width`
fn bar(filled: usize, width: usize) -> String {
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn cells(value: f64, scale: usize) -> usize {
    (value.max(0.0) * scale as f64).floor() as usize
}

fn names(nodes: Vec<&ConceptNode>) -> String {
    nodes.into_iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(", ")
}

/// Every node with its mastery bar, most important first, then the queue
pub struct GraphView<'a> {
    graph: &'a ConceptGraph,
    listing: &'a [(ConceptNode, MasteryRecord)],
    ranked: &'a [RankedNode],
}

pub fn graph_view<'a>(
    graph: &'a ConceptGraph,
    listing: &'a [(ConceptNode, MasteryRecord)],
    ranked: &'a [RankedNode],
) -> GraphView<'a> {
    GraphView { graph, listing, ranked }
}

impl fmt::Display for GraphView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Knowledge Graph: {}", self.graph.domain())?;
        if !self.graph.description().is_empty() {
            writeln!(f, "{}", self.graph.description())?;
        }
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(f)?;

        if self.listing.is_empty() {
            return write!(f, "No nodes found. Run: skill-issue graph init --domain {}", self.graph.domain());
        }

        let mut by_weight: Vec<&(ConceptNode, MasteryRecord)> = self.listing.iter().collect();
        by_weight.sort_by(|a, b| b.0.importance_weight.total_cmp(&a.0.importance_weight));

        for (node, record) in by_weight {
            let attempts = if record.attempts() > 0 {
                format!(" ({})", record.attempts())
            } else {
                String::new()
            };
            writeln!(
                f,
                "{} {:<22} [{}] {:.2}{}",
                status_tag(record.status()),
                truncate(&node.name, 22),
                bar(cells(record.mastery(), GRAPH_BAR_WIDTH), GRAPH_BAR_WIDTH),
                record.mastery(),
                attempts
            )?;
            let prerequisites = self.graph.resolved_prerequisites(&node.id);
            if !prerequisites.is_empty() {
                writeln!(f, "{:11}└ needs: {}", "", names(prerequisites))?;
            }
            let related = self.graph.resolved_related(&node.id);
            if !related.is_empty() {
                writeln!(f, "{:11}└ see also: {}", "", names(related))?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Priority Queue (work on these next):")?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        for entry in self.ranked.iter().take(QUEUE_LEN) {
            writeln!(
                f,
                "  ▶ {}  (priority: {:.2} = weight:{:.2} × gap:{:.2})",
                entry.node_id,
                entry.priority,
                entry.node.importance_weight,
                1.0 - entry.record.mastery()
            )?;
        }

        let total = self.listing.len();
        let avg = self.listing.iter().map(|(_, r)| r.mastery()).sum::<f64>() / total as f64;
        let count =
            |status: MasteryStatus| self.listing.iter().filter(|(_, r)| r.status() == status).count();
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(f, "Total nodes: {} | Avg mastery: {:.2}", total, avg)?;
        write!(
            f,
            "  {} mastered | {} strong | {} weak",
            count(MasteryStatus::Mastered),
            count(MasteryStatus::Strong),
            count(MasteryStatus::Weak)
        )
    }
}

/// Numbered priority list
pub struct WeakList<'a> {
    domain: &'a str,
    ranked: &'a [RankedNode],
}

pub fn weak_list<'a>(domain: &'a str, ranked: &'a [RankedNode]) -> WeakList<'a> {
    WeakList { domain, ranked }
}

impl fmt::Display for WeakList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranked.is_empty() {
            return write!(f, "No weak nodes found.");
        }
        writeln!(f, "Top {} Priority Nodes ({}):", self.ranked.len(), self.domain)?;
        for (i, entry) in self.ranked.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "  {}. {}", i + 1, entry.node_id)?;
            writeln!(f, "     {}", entry.node.name)?;
            write!(
                f,
                "     Priority: {:.2} | Mastery: {:.2} | Status: {}",
                entry.priority,
                entry.record.mastery(),
                entry.record.status()
            )?;
        }
        Ok(())
    }
}

/// Nodes a code snippet maps onto
pub struct CodeMap<'a> {
    domain: &'a str,
    matches: &'a [CodeMatch],
}

pub fn code_map<'a>(domain: &'a str, matches: &'a [CodeMatch]) -> CodeMap<'a> {
    CodeMap { domain, matches }
}

impl fmt::Display for CodeMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matches.is_empty() {
            return write!(f, "No {} concepts found in snippet.", self.domain);
        }
        write!(f, "Concepts in snippet ({}):", self.domain)?;
        for m in self.matches {
            write!(f, "\n  {:<25} {} ({})", m.node_id, m.name, m.matches)?;
        }
        Ok(())
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Ranked list as JSON for `graph weak --json`
pub fn weak_json(ranked: &[RankedNode]) -> Value {
    Value::Array(
        ranked
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.node_id,
                    "name": entry.node.name,
                    "priority": round3(entry.priority),
                    "mastery": round3(entry.record.mastery()),
                    "importance_weight": entry.node.importance_weight,
                    "status": entry.record.status(),
                })
            })
            .collect(),
    )
}

pub struct AnalysisReport<'a>(&'a AnalysisOutcome);

pub fn analysis_report(outcome: &AnalysisOutcome) -> AnalysisReport<'_> {
    AnalysisReport(outcome)
}

/// ` -Nq +Na ~N` signal tally
struct SignalTally<'a>(&'a ConceptScore);

impl fmt::Display for SignalTally<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let questions = self.0.count(Signal::Question);
        let assertions = self.0.count(Signal::Assertion);
        let other = self.0.signals.len() - questions - assertions;
        if questions > 0 {
            write!(f, " -{}q", questions)?;
        }
        if assertions > 0 {
            write!(f, " +{}a", assertions)?;
        }
        if other > 0 {
            write!(f, " ~{}", other)?;
        }
        Ok(())
    }
}

impl AnalysisReport<'_> {
    fn completed(summary: &AnalysisSummary, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analyzed {} session(s)", summary.sessions_analyzed)?;
        writeln!(
            f,
            "Detected {} concept(s) across {} domain(s)",
            summary.concepts_detected,
            summary.domains.len()
        )?;
        writeln!(f)?;

        for (domain, concepts) in &summary.results {
            if concepts.is_empty() {
                continue;
            }
            writeln!(f, "─── {} ───", domain)?;

            let mut sorted: Vec<_> = concepts.iter().collect();
            sorted.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then_with(|| a.0.cmp(b.0)));

            for (node_id, concept) in sorted.iter().take(ANALYSIS_TOP) {
                writeln!(
                    f,
                    "  {:<25} [{}] {:.2}{}",
                    node_id,
                    bar(cells(concept.score, 10), ANALYSIS_BAR_WIDTH),
                    concept.score,
                    SignalTally(concept)
                )?;
            }
            if concepts.len() > ANALYSIS_TOP {
                writeln!(f, "  ... and {} more", concepts.len() - ANALYSIS_TOP)?;
            }
            writeln!(f)?;
        }

        if summary.applied {
            write!(f, "✓ Scores applied to knowledge state")
        } else {
            write!(f, "(dry run, no changes applied)")
        }
    }
}

impl fmt::Display for AnalysisReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            AnalysisOutcome::NoSessions => {
                write!(f, "No conversation sessions found. Start some conversations first!")
            }
            AnalysisOutcome::NoDomains => write!(f, "No knowledge graph domains available."),
            AnalysisOutcome::Completed(summary) => Self::completed(summary, f),
        }
    }
}

pub struct ProfileStats<'a>(&'a Profile);

pub fn profile_stats(profile: &Profile) -> ProfileStats<'_> {
    ProfileStats(profile)
}

impl fmt::Display for ProfileStats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = self.0;
        writeln!(f, "skill-issue: {}", profile.username)?;
        writeln!(f, "Level:    {} ({} XP)", profile.overall_level, profile.total_xp)?;
        writeln!(f, "Streak:   {} (best: {})", profile.current_streak, profile.best_streak)?;

        let passed = profile.score_count(2) + profile.score_count(3);
        let accuracy = profile.accuracy().unwrap_or(0.0) * 100.0;
        write!(f, "Accuracy: {:.0}%  ({}/{} correct)", accuracy, passed, profile.total_challenges)?;

        if !profile.topics.is_empty() {
            let mut topics: Vec<_> = profile.topics.iter().collect();
            topics.sort_by(|a, b| b.1.attempts.cmp(&a.1.attempts).then_with(|| a.0.cmp(b.0)));
            write!(f, "\n\nTopics:")?;
            for (topic, record) in topics {
                write!(f, "\n  {}: {} ({} attempts)", topic, record.level, record.attempts)?;
            }
        }
        Ok(())
    }
}

fn milestone_label(kind: &str, topic: Option<&str>) -> String {
    let topic = topic.unwrap_or("?");
    match kind {
        "first_challenge" => "First challenge complete!".to_string(),
        "streak_5" => "5-challenge streak!".to_string(),
        "streak_10" => "10-challenge streak!".to_string(),
        "streak_20" => "20-challenge streak!".to_string(),
        "topic_expert" => format!("{} Expert unlocked!", topic),
        "topic_master" => format!("{} MASTERED!", topic),
        "xp_500" => "500 XP reached!".to_string(),
        "xp_2000" => "2000 XP reached!".to_string(),
        "xp_5000" => "5000 XP reached!".to_string(),
        other => other.to_string(),
    }
}

/// Result of one scored challenge
pub struct ChallengeSummary<'a> {
    score: u8,
    topic: &'a str,
    outcome: &'a ChallengeOutcome,
}

pub fn challenge_summary<'a>(score: u8, topic: &'a str, outcome: &'a ChallengeOutcome) -> ChallengeSummary<'a> {
    ChallengeSummary { score, topic, outcome }
}

impl fmt::Display for ChallengeSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self.outcome;
        writeln!(f, "Score: {}/3", self.score)?;
        writeln!(f, "XP earned: +{} | Total: {}", outcome.xp_earned, outcome.total_xp)?;
        writeln!(f, "Streak: {} | Level: {}", outcome.streak, outcome.overall_level)?;
        write!(f, "Topic level ({}): {}", self.topic, outcome.topic_level)?;
        for milestone in &outcome.new_milestones {
            write!(f, "\n🏆 {}", milestone_label(&milestone.kind, milestone.topic.as_deref()))?;
        }
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}
