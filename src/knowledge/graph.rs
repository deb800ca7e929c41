//! Concept graphs - the static, read-only definition of a domain
//!
//! One JSON document per domain under the graphs directory. Graphs are
//! validated on load (unique ids, weights clamped into [0, 1]) and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{KnowledgeError, KnowledgeResult};

/// A single learnable concept in a domain graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// How often the concept is reused or depended upon, in [0, 1]
    #[serde(default = "default_importance", alias = "reuse_weight")]
    pub importance_weight: f64,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
}

fn default_importance() -> f64 {
    0.5
}

impl ConceptNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, importance_weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            importance_weight,
            prerequisites: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_prerequisites(mut self, prerequisites: &[&str]) -> Self {
        self.prerequisites = prerequisites.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_related(mut self, related: &[&str]) -> Self {
        self.related = related.iter().map(|r| r.to_string()).collect();
        self
    }
}

/// On-disk shape of a graph document
#[derive(Debug, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    description: String,
    #[serde(default)]
    nodes: Vec<ConceptNode>,
}

/// A validated domain graph; nodes keep their declaration order
#[derive(Debug, Clone)]
pub struct ConceptGraph {
    domain: String,
    description: String,
    nodes: Vec<ConceptNode>,
}

impl ConceptGraph {
    /// Build a graph, rejecting duplicate ids and normalising node fields
    pub fn new(
        domain: impl Into<String>,
        description: impl Into<String>,
        nodes: Vec<ConceptNode>,
    ) -> KnowledgeResult<Self> {
        let domain = domain.into();
        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(nodes.len());

        for mut node in nodes {
            if !seen.insert(node.id.clone()) {
                return Err(KnowledgeError::DuplicateNode { domain, node_id: node.id });
            }
            if node.name.trim().is_empty() {
                node.name = node.id.clone();
            }
            node.importance_weight = if node.importance_weight.is_finite() {
                node.importance_weight.clamp(0.0, 1.0)
            } else {
                0.0
            };
            validated.push(node);
        }

        Ok(Self { domain, description: description.into(), nodes: validated })
    }

    /// Parse a graph document read from `origin`
    pub fn from_json(domain: &str, origin: &Path, json: &str) -> KnowledgeResult<Self> {
        let doc: GraphDocument =
            serde_json::from_str(json).map_err(|e| KnowledgeError::parse(origin, e))?;
        Self::new(domain, doc.description, doc.nodes)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn nodes(&self) -> &[ConceptNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Prerequisites of a node that actually exist in this graph
    pub fn resolved_prerequisites(&self, id: &str) -> Vec<&ConceptNode> {
        self.resolve_edges(id, |n| &n.prerequisites)
    }

    /// Related nodes that actually exist in this graph
    pub fn resolved_related(&self, id: &str) -> Vec<&ConceptNode> {
        self.resolve_edges(id, |n| &n.related)
    }

    fn resolve_edges<'a>(
        &'a self,
        id: &str,
        edges: impl Fn(&'a ConceptNode) -> &'a Vec<String>,
    ) -> Vec<&'a ConceptNode> {
        match self.node(id) {
            Some(node) => edges(node).iter().filter_map(|target| self.node(target)).collect(),
            None => Vec::new(),
        }
    }
}

/// Where concept graphs come from
pub trait GraphSource {
    /// Every domain with a graph available
    fn domains(&self) -> Vec<String>;

    /// Load one domain's graph; `DomainNotFound` when it has none
    fn load(&self, domain: &str) -> KnowledgeResult<ConceptGraph>;

    fn has_domain(&self, domain: &str) -> bool {
        self.domains().iter().any(|d| d == domain)
    }
}

/// Graphs stored as `<dir>/<domain>.json`
#[derive(Debug, Clone)]
pub struct GraphCatalog {
    dir: PathBuf,
}

impl GraphCatalog {
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn graph_path(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{}.json", domain))
    }
}

impl GraphSource for GraphCatalog {
    fn domains(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Graphs directory {} unreadable: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut domains: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        domains.sort();
        domains
    }

    fn load(&self, domain: &str) -> KnowledgeResult<ConceptGraph> {
        let path = self.graph_path(domain);
        if !path.exists() {
            return Err(KnowledgeError::DomainNotFound(domain.to_string()));
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| KnowledgeError::io(&path, e))?;
        ConceptGraph::from_json(domain, &path, &content)
    }
}

/// In-memory graphs, used by tests and embedders
#[derive(Debug, Clone, Default)]
pub struct StaticGraphs {
    graphs: BTreeMap<String, ConceptGraph>,
}

impl StaticGraphs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, graph: ConceptGraph) {
        self.graphs.insert(graph.domain().to_string(), graph);
    }

    pub fn with(mut self, graph: ConceptGraph) -> Self {
        self.insert(graph);
        self
    }
}

impl GraphSource for StaticGraphs {
    fn domains(&self) -> Vec<String> {
        self.graphs.keys().cloned().collect()
    }

    fn load(&self, domain: &str) -> KnowledgeResult<ConceptGraph> {
        self.graphs
            .get(domain)
            .cloned()
            .ok_or_else(|| KnowledgeError::DomainNotFound(domain.to_string()))
    }
}
