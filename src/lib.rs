//! skill-issue - gamified learning tracker library
//!
//! - Knowledge-state engine: concept graphs, EMA mastery updates, decay and
//!   study-priority ranking
//! - Bootstrap analyzer that seeds mastery from past conversation transcripts
//! - Profile bookkeeping: XP, streaks, levels and milestones
//! - Plain-text renderers and the `skill-issue` CLI
//!
//! # Example
//!
//! ```no_run
//! use skill_issue::knowledge::{GraphCatalog, JsonStateFile, KnowledgeEngine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let engine = KnowledgeEngine::new(
//!         GraphCatalog::with_dir("/path/to/knowledge_graphs"),
//!         JsonStateFile::new("/path/to/knowledge_state.json"),
//!     );
//!     let record = engine.update("machine-learning", "gradient-descent", 2)?;
//!     println!("mastery now {:.2}", record.mastery());
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod config;
pub mod knowledge;
pub mod analyzer;
pub mod profile;
pub mod report;
pub mod cli;

pub use config::Config;
pub use error::{KnowledgeError, KnowledgeResult, ProfileError, ProfileResult};
pub use types::{Role, Turn};

pub use knowledge::{
    ConceptGraph,
    ConceptNode,
    GraphCatalog,
    GraphSource,
    JsonStateFile,
    KnowledgeEngine,
    MasteryRecord,
    MasteryState,
    MasteryStatus,
    StateStore,
};

pub use analyzer::{AnalysisOptions, AnalysisOutcome, SessionScope, TranscriptArchive};
pub use profile::{Challenge, Difficulty, Profile, ProfileStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
