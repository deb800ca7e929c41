//! Knowledge State Engine
//!
//! Per-domain concept graphs, per-concept mastery records, and the rules that
//! move mastery: EMA updates from challenge scores, linear decay of stale
//! knowledge, and the priority ranking used to pick what to study next.

pub mod graph;
pub mod mastery;
pub mod store;
pub mod decay;
pub mod priority;
pub mod engine;

pub use graph::{ConceptGraph, ConceptNode, GraphCatalog, GraphSource, StaticGraphs};
pub use mastery::{DomainState, MasteryRecord, MasteryState, MasteryStatus};
pub use store::{JsonStateFile, MemoryStateStore, StateStore};
pub use decay::DecayPolicy;
pub use priority::RankedNode;
pub use engine::{DomainInit, KnowledgeEngine};
