//! Retroactive bootstrap - seed mastery from past conversations
//!
//! Each user turn is classified by intent and scanned for concepts. Concepts
//! the user mentions move by the intent's delta; concepts only the following
//! assistant turn mentions get a small bump. Scores accumulate across
//! sessions and are clamped at the end, then replace the mastery of every
//! node that received at least one signal.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::detector::ConceptDetector;
use super::intent::{self, Intent};
use super::sessions::{self, TranscriptArchive};
use crate::error::KnowledgeResult;
use crate::knowledge::engine::seed_domain;
use crate::knowledge::{ConceptGraph, GraphSource, KnowledgeEngine, StateStore};
use crate::types::{Role, Turn};

/// Highest score a bootstrap can assign
pub const SCORE_CEILING: f64 = 0.8;

/// Evidence recorded against a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// User asked about it
    Question,
    /// User showed work with it
    Assertion,
    /// User mentioned it in passing
    NeutralUser,
    /// Only the assistant's reply mentioned it
    ClaudeExplained,
}

impl Signal {
    pub fn from_intent(intent: Intent) -> Self {
        match intent {
            Intent::Question => Signal::Question,
            Intent::Assertion => Signal::Assertion,
            Intent::Neutral => Signal::NeutralUser,
        }
    }

    pub fn delta(self) -> f64 {
        match self {
            Signal::Question => -0.15,
            Signal::Assertion => 0.20,
            Signal::NeutralUser => 0.05,
            Signal::ClaudeExplained => 0.05,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Question => "question",
            Signal::Assertion => "assertion",
            Signal::NeutralUser => "neutral_user",
            Signal::ClaudeExplained => "claude_explained",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running score and the signals behind it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConceptScore {
    pub score: f64,
    pub signals: Vec<Signal>,
}

impl ConceptScore {
    fn record(&mut self, signal: Signal) {
        self.score += signal.delta();
        self.signals.push(signal);
    }

    pub fn count(&self, signal: Signal) -> usize {
        self.signals.iter().filter(|s| **s == signal).count()
    }
}

/// node id -> score, per domain
pub type AnalysisResults = BTreeMap<String, BTreeMap<String, ConceptScore>>;

/// Per-domain accumulation over any number of sessions
pub struct Accumulator {
    detectors: Vec<ConceptDetector>,
    results: AnalysisResults,
}

impl Accumulator {
    pub fn new(graphs: &[ConceptGraph]) -> Self {
        let detectors: Vec<ConceptDetector> = graphs.iter().map(ConceptDetector::new).collect();
        let results = detectors
            .iter()
            .map(|d| (d.domain().to_string(), BTreeMap::new()))
            .collect();
        Self { detectors, results }
    }

    /// Score every user turn of one session
    pub fn add_session(&mut self, turns: &[Turn]) {
        for (i, turn) in turns.iter().enumerate() {
            if turn.role != Role::User {
                continue;
            }
            let signal = Signal::from_intent(intent::classify(&turn.text));
            let reply = turns
                .get(i + 1)
                .filter(|next| next.role == Role::Assistant)
                .map(|next| next.text.as_str())
                .unwrap_or("");

            for detector in &self.detectors {
                let user_concepts = detector.detect(&turn.text);
                let reply_concepts = detector.detect(reply);
                let Some(domain) = self.results.get_mut(detector.domain()) else {
                    continue;
                };

                for concept in &user_concepts {
                    domain.entry(concept.clone()).or_default().record(signal);
                }
                for concept in reply_concepts.into_iter().filter(|c| !user_concepts.contains(c)) {
                    domain.entry(concept).or_default().record(Signal::ClaudeExplained);
                }
            }
        }
    }

    /// Clamp every score into `[0, SCORE_CEILING]`
    pub fn finish(mut self) -> AnalysisResults {
        for concepts in self.results.values_mut() {
            for concept in concepts.values_mut() {
                concept.score = concept.score.clamp(0.0, SCORE_CEILING);
            }
        }
        self.results
    }
}

/// Score already-extracted sessions against the given graphs
pub fn analyze_sessions(sessions: &[Vec<Turn>], graphs: &[ConceptGraph]) -> AnalysisResults {
    let mut acc = Accumulator::new(graphs);
    for turns in sessions {
        acc.add_session(turns);
    }
    acc.finish()
}

/// Replace the mastery of every signalled node; returns how many were merged.
///
/// A domain is seeded from its graph first so re-runs never drop records.
/// Domains without a graph and nodes the graph does not define are skipped.
pub fn apply_analysis<G: GraphSource, S: StateStore>(
    engine: &KnowledgeEngine<G, S>,
    results: &AnalysisResults,
    now: DateTime<Utc>,
) -> KnowledgeResult<usize> {
    let mut state = engine.load_state()?;
    let mut merged = 0;

    for (domain, concepts) in results {
        if concepts.values().all(|c| c.signals.is_empty()) {
            continue;
        }
        let graph = match engine.load_graph(domain) {
            Ok(graph) => graph,
            Err(e) if e.is_not_found() => {
                debug!("Skipping '{}': no graph", domain);
                continue;
            }
            Err(e) => return Err(e),
        };
        seed_domain(&mut state, &graph);

        for (node_id, concept) in concepts {
            if concept.signals.is_empty() || !graph.contains(node_id) {
                continue;
            }
            let attempts = u32::try_from(concept.signals.len()).unwrap_or(u32::MAX);
            state.get_or_create_record(domain, node_id).assign(concept.score, attempts, now);
            merged += 1;
        }
    }

    engine.save_state(&state)?;
    info!("Bootstrap merged {} concept(s)", merged);
    Ok(merged)
}

/// Which transcripts to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// Sessions of the project rooted at this path
    Project(PathBuf),
    /// Every project's sessions
    All,
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub scope: SessionScope,
    /// Domains to score; every available domain when `None`
    pub domains: Option<Vec<String>>,
    pub max_sessions: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub sessions_found: usize,
    pub sessions_analyzed: usize,
    pub domains: Vec<String>,
    pub concepts_detected: usize,
    pub results: AnalysisResults,
    pub applied: bool,
    pub merged: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    NoSessions,
    NoDomains,
    Completed(AnalysisSummary),
}

/// Discover, score and (unless dry-running) merge
pub fn run_analysis<G: GraphSource, S: StateStore>(
    engine: &KnowledgeEngine<G, S>,
    archive: &TranscriptArchive,
    options: &AnalysisOptions,
) -> KnowledgeResult<AnalysisOutcome> {
    run_analysis_at(engine, archive, options, Utc::now())
}

/// `run_analysis` with an explicit clock
pub fn run_analysis_at<G: GraphSource, S: StateStore>(
    engine: &KnowledgeEngine<G, S>,
    archive: &TranscriptArchive,
    options: &AnalysisOptions,
    now: DateTime<Utc>,
) -> KnowledgeResult<AnalysisOutcome> {
    let sessions = match &options.scope {
        SessionScope::Project(path) => archive.project_sessions(path),
        SessionScope::All => archive.all_sessions(),
    };
    if sessions.is_empty() {
        return Ok(AnalysisOutcome::NoSessions);
    }

    let domains = options.domains.clone().unwrap_or_else(|| engine.domains());
    if domains.is_empty() {
        return Ok(AnalysisOutcome::NoDomains);
    }

    let mut graphs = Vec::with_capacity(domains.len());
    for domain in &domains {
        match engine.load_graph(domain) {
            Ok(graph) => graphs.push(graph),
            Err(e) if e.is_not_found() => debug!("Skipping '{}': no graph", domain),
            Err(e) => return Err(e),
        }
    }

    let mut acc = Accumulator::new(&graphs);
    let scanned = &sessions[..sessions.len().min(options.max_sessions)];
    for path in scanned {
        let turns = sessions::extract_turns(path);
        debug!("{}: {} turn(s)", path.display(), turns.len());
        acc.add_session(&turns);
    }
    let results = acc.finish();

    let concepts_detected: usize = results.values().map(BTreeMap::len).sum();
    let merged = if !options.dry_run && concepts_detected > 0 {
        apply_analysis(engine, &results, now)?
    } else {
        0
    };

    info!(
        "Analyzed {} of {} session(s): {} concept(s) detected",
        scanned.len(),
        sessions.len(),
        concepts_detected
    );
    Ok(AnalysisOutcome::Completed(AnalysisSummary {
        sessions_found: sessions.len(),
        sessions_analyzed: scanned.len(),
        domains,
        concepts_detected,
        results,
        applied: !options.dry_run,
        merged,
    }))
}
