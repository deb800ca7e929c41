//! Study priority: importance weight times the mastery gap

use serde::Serialize;

use super::graph::{ConceptGraph, ConceptNode};
use super::mastery::{DomainState, MasteryRecord};

/// `importance_weight × (1 - mastery)`
pub fn priority(importance_weight: f64, mastery: f64) -> f64 {
    importance_weight * (1.0 - mastery)
}

/// One node of a ranking, with the data renderers need
#[derive(Debug, Clone, Serialize)]
pub struct RankedNode {
    pub node_id: String,
    pub priority: f64,
    pub node: ConceptNode,
    pub record: MasteryRecord,
}

/// Rank every node of `graph`, highest priority first.
///
/// Nodes without a record are ranked as the zero state. Equal priorities
/// keep graph declaration order.
pub fn rank(graph: &ConceptGraph, state: Option<&DomainState>) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = graph
        .nodes()
        .iter()
        .map(|node| {
            let record = state
                .and_then(|s| s.get(&node.id))
                .cloned()
                .unwrap_or_default();
            RankedNode {
                node_id: node.id.clone(),
                priority: priority(node.importance_weight, record.mastery()),
                node: node.clone(),
                record,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn graph() -> ConceptGraph {
        ConceptGraph::new(
            "ml",
            "",
            vec![
                ConceptNode::new("a", "A", 0.5),
                ConceptNode::new("b", "B", 0.9),
                ConceptNode::new("c", "C", 0.5),
                ConceptNode::new("d", "D", 0.2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_priority_formula() {
        assert!((priority(0.95, 0.0) - 0.95).abs() < 1e-12);
        assert!(priority(0.95, 0.99) < 0.01);
        assert!(priority(0.8, 0.2) > priority(0.8, 0.6));
        assert!(priority(0.9, 0.5) > priority(0.3, 0.5));
    }

    #[test]
    fn test_rank_unseen_nodes_use_full_weight() {
        let ranked = rank(&graph(), None);
        let ids: Vec<&str> = ranked.iter().map(|r| r.node_id.as_str()).collect();
        // a and c tie at 0.5 and keep declaration order
        assert_eq!(ids, vec!["b", "a", "c", "d"]);
        assert!((ranked[0].priority - 0.9).abs() < 1e-12);
        assert_eq!(ranked[0].record.attempts(), 0);
    }

    #[test]
    fn test_rank_uses_mastery() {
        let mut state = DomainState::default();
        state.insert("b", MasteryRecord::reinforced(0.9, 4, Utc::now()));
        let ranked = rank(&graph(), Some(&state));
        let ids: Vec<&str> = ranked.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d", "b"]);
        assert_eq!(ranked.len(), 4);
    }

    #[test]
    fn test_rank_ignores_records_outside_graph() {
        let mut state = DomainState::default();
        state.insert("orphan", MasteryRecord::default());
        assert_eq!(rank(&graph(), Some(&state)).len(), 4);
    }
}
