//! Retroactive Bootstrap Analyzer
//!
//! Infers starting mastery from past conversation transcripts: questions
//! about a concept count against it, demonstrated work counts for it.

pub mod intent;
pub mod detector;
pub mod sessions;
pub mod bootstrap;

pub use bootstrap::{
    analyze_sessions, apply_analysis, run_analysis, AnalysisOptions, AnalysisOutcome,
    AnalysisResults, AnalysisSummary, ConceptScore, SessionScope, Signal,
};
pub use detector::{CodeMapper, CodeMatch, ConceptDetector};
pub use intent::{classify, Intent};
pub use sessions::{extract_turns, TranscriptArchive};
