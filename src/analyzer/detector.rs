//! Concept detection - which graph nodes a piece of text mentions

use regex::Regex;
use serde::Serialize;

use crate::knowledge::{ConceptGraph, ConceptNode};

/// Longest alias that still needs a word-boundary match
const SHORT_ALIAS_LEN: usize = 3;

/// Same, for code snippets
const SHORT_CODE_ALIAS_LEN: usize = 4;

const NAME_WEIGHT: usize = 2;
const ID_WEIGHT: usize = 2;
const ALIAS_WEIGHT: usize = 1;

enum Needle {
    Substring(String),
    Word(Regex),
}

impl Needle {
    fn matches(&self, lower: &str) -> bool {
        match self {
            Needle::Substring(s) => lower.contains(s.as_str()),
            Needle::Word(re) => re.is_match(lower),
        }
    }
}

/// Word-boundary needle for short aliases, substring otherwise
fn alias_needle(alias: &str, short_len: usize) -> Option<Needle> {
    let alias = alias.to_lowercase();
    if alias.is_empty() {
        return None;
    }
    if alias.chars().count() <= short_len {
        let pattern = format!(r"\b{}\b", regex::escape(&alias));
        Regex::new(&pattern).ok().map(Needle::Word)
    } else {
        Some(Needle::Substring(alias))
    }
}

struct NodeMatcher {
    id: String,
    needles: Vec<Needle>,
}

/// Matchers for one domain, compiled once and reused for every turn
pub struct ConceptDetector {
    domain: String,
    matchers: Vec<NodeMatcher>,
}

impl ConceptDetector {
    pub fn new(graph: &ConceptGraph) -> Self {
        let matchers = graph
            .nodes()
            .iter()
            .map(|node| {
                let id = node.id.to_lowercase();
                let mut needles = Vec::new();
                let mut push = |s: String| {
                    if !s.is_empty() {
                        needles.push(Needle::Substring(s));
                    }
                };
                push(node.name.to_lowercase());
                push(id.replace('-', " "));
                push(id.replace('-', "_"));
                push(id);

                needles.extend(node.aliases.iter().filter_map(|a| alias_needle(a, SHORT_ALIAS_LEN)));

                NodeMatcher { id: node.id.clone(), needles }
            })
            .collect();

        Self { domain: graph.domain().to_string(), matchers }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Ids of the nodes mentioned in `text`, in graph declaration order
    pub fn detect(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let lower = text.to_lowercase();
        self.matchers
            .iter()
            .filter(|m| m.needles.iter().any(|n| n.matches(&lower)))
            .map(|m| m.id.clone())
            .collect()
    }
}

/// A node referenced by a code snippet, with its weighted hit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeMatch {
    pub node_id: String,
    pub name: String,
    pub matches: usize,
}

/// One group of needles scores its weight once, however many of them hit
struct WeightedGroup {
    needles: Vec<Needle>,
    weight: usize,
}

struct CodeNode {
    id: String,
    name: String,
    groups: Vec<WeightedGroup>,
}

impl CodeNode {
    fn new(node: &ConceptNode) -> Self {
        let substring = |s: String| if s.is_empty() { Vec::new() } else { vec![Needle::Substring(s)] };
        let id = node.id.to_lowercase();

        let mut groups = vec![
            WeightedGroup { needles: substring(node.name.to_lowercase()), weight: NAME_WEIGHT },
            WeightedGroup {
                needles: [id.replace('-', "_"), id.replace('-', " ")]
                    .into_iter()
                    .flat_map(substring)
                    .collect(),
                weight: ID_WEIGHT,
            },
        ];
        groups.extend(
            node.aliases
                .iter()
                .filter_map(|a| alias_needle(a, SHORT_CODE_ALIAS_LEN))
                .map(|needle| WeightedGroup { needles: vec![needle], weight: ALIAS_WEIGHT }),
        );

        Self { id: node.id.clone(), name: node.name.clone(), groups }
    }

    fn score(&self, lower: &str) -> usize {
        self.groups
            .iter()
            .filter(|g| g.needles.iter().any(|n| n.matches(lower)))
            .map(|g| g.weight)
            .sum()
    }
}

/// Maps code snippets onto the nodes they exercise
pub struct CodeMapper {
    nodes: Vec<CodeNode>,
}

impl CodeMapper {
    pub fn new(graph: &ConceptGraph) -> Self {
        Self { nodes: graph.nodes().iter().map(CodeNode::new).collect() }
    }

    /// Nodes with at least one hit, most hits first, ties in graph order
    pub fn map(&self, code: &str) -> Vec<CodeMatch> {
        let lower = code.to_lowercase();
        let mut found: Vec<CodeMatch> = self
            .nodes
            .iter()
            .filter_map(|node| match node.score(&lower) {
                0 => None,
                matches => Some(CodeMatch { node_id: node.id.clone(), name: node.name.clone(), matches }),
            })
            .collect();
        found.sort_by(|a, b| b.matches.cmp(&a.matches));
        found
    }
}
