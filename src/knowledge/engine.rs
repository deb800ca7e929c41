//! Knowledge engine - the operations the CLI and the analyzer call
//!
//! Every mutating operation is one full cycle: load the whole state, change
//! it in memory, save the whole state.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::decay::DecayPolicy;
use super::graph::{ConceptGraph, ConceptNode, GraphSource};
use super::mastery::{MasteryRecord, MasteryState};
use super::priority::{self, RankedNode};
use super::store::StateStore;
use crate::error::KnowledgeResult;

/// Result of initialising a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInit {
    /// Records created by this call
    pub created: usize,
    /// Nodes in the domain graph
    pub total: usize,
}

/// Add a zero-state record for every graph node not yet tracked
pub fn seed_domain(state: &mut MasteryState, graph: &ConceptGraph) -> usize {
    let domain = state.get_or_create_domain(graph.domain());
    let mut created = 0;
    for node in graph.nodes() {
        if domain.get(&node.id).is_none() {
            domain.get_or_create(&node.id);
            created += 1;
        }
    }
    created
}

pub struct KnowledgeEngine<G, S> {
    graphs: G,
    store: S,
    decay: DecayPolicy,
}

impl<G: GraphSource, S: StateStore> KnowledgeEngine<G, S> {
    pub fn new(graphs: G, store: S) -> Self {
        Self { graphs, store, decay: DecayPolicy::default() }
    }

    pub fn with_decay(mut self, decay: DecayPolicy) -> Self {
        self.decay = decay;
        self
    }

    pub fn graphs(&self) -> &G {
        &self.graphs
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn decay_policy(&self) -> &DecayPolicy {
        &self.decay
    }

    pub fn domains(&self) -> Vec<String> {
        self.graphs.domains()
    }

    pub fn load_graph(&self, domain: &str) -> KnowledgeResult<ConceptGraph> {
        self.graphs.load(domain)
    }

    pub fn load_state(&self) -> KnowledgeResult<MasteryState> {
        self.store.load()
    }

    pub fn save_state(&self, state: &MasteryState) -> KnowledgeResult<()> {
        self.store.save(state)
    }

    /// Track every node of a domain's graph, keeping existing records
    pub fn init_domain(&self, domain: &str) -> KnowledgeResult<DomainInit> {
        let graph = self.graphs.load(domain)?;
        let mut state = self.store.load()?;
        let created = seed_domain(&mut state, &graph);
        self.store.save(&state)?;

        info!("Initialized domain '{}': {} new of {} nodes", domain, created, graph.len());
        Ok(DomainInit { created, total: graph.len() })
    }

    /// Record a challenge score (0-3) for a node
    pub fn update(&self, domain: &str, node_id: &str, score: u8) -> KnowledgeResult<MasteryRecord> {
        self.update_at(domain, node_id, score, Utc::now())
    }

    /// `update` with an explicit clock
    pub fn update_at(
        &self,
        domain: &str,
        node_id: &str,
        score: u8,
        now: DateTime<Utc>,
    ) -> KnowledgeResult<MasteryRecord> {
        let mut state = self.store.load()?;

        if !state.has_domain(domain) {
            match self.graphs.load(domain) {
                Ok(graph) => {
                    seed_domain(&mut state, &graph);
                }
                Err(e) if e.is_not_found() => {
                    debug!("No graph for '{}', tracking '{}' alone", domain, node_id);
                }
                Err(e) => return Err(e),
            }
        }

        let record = state.get_or_create_record(domain, node_id);
        record.observe(score, now);
        let updated = record.clone();
        self.store.save(&state)?;

        debug!(
            "Updated {}/{}: mastery={:.3} status={}",
            domain,
            node_id,
            updated.mastery(),
            updated.status()
        );
        Ok(updated)
    }

    /// Decay stale records; returns how many changed
    pub fn apply_decay(&self) -> KnowledgeResult<usize> {
        self.apply_decay_at(Utc::now())
    }

    /// `apply_decay` with an explicit clock
    pub fn apply_decay_at(&self, now: DateTime<Utc>) -> KnowledgeResult<usize> {
        let mut state = self.store.load()?;
        let changed = self.decay.apply(&mut state, now);
        if changed > 0 {
            self.store.save(&state)?;
            info!("Decayed {} record(s)", changed);
        }
        Ok(changed)
    }

    pub fn node_state(&self, domain: &str, node_id: &str) -> KnowledgeResult<Option<MasteryRecord>> {
        Ok(self.store.load()?.record(domain, node_id).cloned())
    }

    /// Priority of one node; 0.0 for ids the graph does not define
    pub fn priority(&self, domain: &str, node_id: &str) -> KnowledgeResult<f64> {
        let graph = self.graphs.load(domain)?;
        let Some(node) = graph.node(node_id) else {
            return Ok(0.0);
        };
        let mastery = self
            .store
            .load()?
            .record(domain, node_id)
            .map(|r| r.mastery())
            .unwrap_or(0.0);
        Ok(priority::priority(node.importance_weight, mastery))
    }

    /// Every node of the domain ranked by priority
    pub fn ranked(&self, domain: &str) -> KnowledgeResult<Vec<RankedNode>> {
        let graph = self.graphs.load(domain)?;
        let state = self.store.load()?;
        Ok(priority::rank(&graph, state.domain(domain)))
    }

    /// The `n` highest-priority nodes
    pub fn top_n(&self, domain: &str, n: usize) -> KnowledgeResult<Vec<RankedNode>> {
        let mut ranked = self.ranked(domain)?;
        ranked.truncate(n);
        Ok(ranked)
    }

    /// Every graph node with its record (zero state when untracked), graph order
    pub fn all_nodes(&self, domain: &str) -> KnowledgeResult<Vec<(ConceptNode, MasteryRecord)>> {
        let graph = self.graphs.load(domain)?;
        let state = self.store.load()?;
        let tracked = state.domain(domain);
        Ok(graph
            .nodes()
            .iter()
            .map(|node| {
                let record = tracked.and_then(|d| d.get(&node.id)).cloned().unwrap_or_default();
                (node.clone(), record)
            })
            .collect())
    }

    /// Nodes with mastery above 0.8, graph order
    pub fn strong_nodes(&self, domain: &str) -> KnowledgeResult<Vec<(ConceptNode, MasteryRecord)>> {
        Ok(self
            .all_nodes(domain)?
            .into_iter()
            .filter(|(_, record)| record.mastery() > 0.8)
            .collect())
    }
}
