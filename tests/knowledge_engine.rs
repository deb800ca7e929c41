//! Knowledge engine against on-disk graphs and state

use chrono::{Duration, Utc};
use skill_issue::knowledge::{
    GraphCatalog, GraphSource, JsonStateFile, KnowledgeEngine, MasteryStatus, StateStore,
};
use std::path::Path;

const ML_GRAPH: &str = r#"{
  "description": "Machine learning fundamentals",
  "nodes": [
    {"id": "linear-algebra", "name": "Linear Algebra", "reuse_weight": 0.7},
    {"id": "gradient-descent", "name": "Gradient Descent", "aliases": ["SGD"],
     "importance_weight": 0.95, "prerequisites": ["linear-algebra", "calculus"]},
    {"id": "dropout", "name": "Dropout", "importance_weight": 1.7}
  ]
}"#;

fn engine(dir: &Path) -> KnowledgeEngine<GraphCatalog, JsonStateFile> {
    let graphs = dir.join("graphs");
    std::fs::create_dir_all(&graphs).unwrap();
    std::fs::write(graphs.join("ml.json"), ML_GRAPH).unwrap();
    KnowledgeEngine::new(
        GraphCatalog::with_dir(graphs),
        JsonStateFile::new(dir.join("data").join("knowledge_state.json")),
    )
}

#[test]
fn test_graph_document_loading() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = engine(dir.path());

    assert_eq!(engine.domains(), vec!["ml"]);
    let graph = engine.load_graph("ml")?;
    assert_eq!(graph.description(), "Machine learning fundamentals");
    assert_eq!(graph.node("linear-algebra").unwrap().importance_weight, 0.7);
    // out of range weights are clamped
    assert_eq!(graph.node("dropout").unwrap().importance_weight, 1.0);

    let prereqs: Vec<&str> = graph
        .resolved_prerequisites("gradient-descent")
        .iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(prereqs, vec!["linear-algebra"]);

    assert!(engine.load_graph("absent").unwrap_err().is_not_found());
    assert!(!engine.graphs().has_domain("absent"));
    Ok(())
}

#[test]
fn test_duplicate_node_ids_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = engine(dir.path());
    std::fs::write(
        dir.path().join("graphs").join("dup.json"),
        r#"{"nodes": [{"id": "a", "name": "A"}, {"id": "a", "name": "Again"}]}"#,
    )?;
    let err = engine.load_graph("dup").unwrap_err();
    assert!(err.to_string().contains("more than once"));
    Ok(())
}

#[test]
fn test_update_persists_across_engines() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let record = engine(dir.path()).update("ml", "gradient-descent", 2)?;
    assert!((record.mastery() - 0.21).abs() < 1e-9);
    assert_eq!(record.status(), MasteryStatus::Weak);

    let reopened = engine(dir.path());
    let stored = reopened.node_state("ml", "gradient-descent")?.unwrap();
    assert_eq!(stored.attempts(), 1);
    assert!((stored.mastery() - 0.21).abs() < 1e-9);
    // lazily initialised siblings
    assert_eq!(reopened.load_state()?.domain("ml").unwrap().nodes.len(), 3);
    Ok(())
}

#[test]
fn test_status_is_recomputed_on_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = engine(dir.path());
    let path = dir.path().join("data").join("knowledge_state.json");
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(
        &path,
        r#"{"version": 1, "domains": {"ml": {"nodes": {
            "dropout": {"mastery": 0.9, "attempts": 4, "last_seen": null, "status": "weak"}
        }}}}"#,
    )?;

    let record = engine.node_state("ml", "dropout")?.unwrap();
    assert_eq!(record.status(), MasteryStatus::Mastered);
    assert_eq!(record.anchor_mastery(), 0.9);
    Ok(())
}

#[test]
fn test_corrupt_state_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = engine(dir.path());
    let path = dir.path().join("data").join("knowledge_state.json");
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(&path, "{ not json")?;
    assert!(engine.update("ml", "dropout", 3).is_err());
    Ok(())
}

#[test]
fn test_ranking_and_decay_on_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let engine = engine(dir.path());

    let top = engine.top_n("ml", 2)?;
    let ids: Vec<&str> = top.iter().map(|r| r.node_id.as_str()).collect();
    // dropout (clamped to 1.0) > gradient-descent (0.95)
    assert_eq!(ids, vec!["dropout", "gradient-descent"]);
    assert!(!dir.path().join("data").join("knowledge_state.json").exists());

    let seen = Utc::now() - Duration::days(10);
    for _ in 0..4 {
        engine.update_at("ml", "dropout", 3, seen)?;
    }
    let before = engine.node_state("ml", "dropout")?.unwrap().mastery();

    let now = Utc::now();
    assert_eq!(engine.apply_decay_at(now)?, 1);
    assert_eq!(engine.apply_decay_at(now)?, 0);
    let after = engine.node_state("ml", "dropout")?.unwrap();
    assert!((before - 0.14 - after.mastery()).abs() < 1e-9);
    assert_eq!(after.last_seen(), Some(seen));

    let reranked = engine.top_n("ml", 1)?;
    assert_eq!(reranked[0].node_id, "gradient-descent");
    Ok(())
}

#[test]
fn test_store_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonStateFile::new(dir.path().join("state.json"));
    assert_eq!(store.load()?.record_count(), 0);

    let engine = KnowledgeEngine::new(GraphCatalog::with_dir(dir.path().join("none")), store);
    engine.update("solo", "node", 3)?;
    let state = engine.store().load()?;
    assert_eq!(state.record_count(), 1);
    assert!(!dir.path().join("state.json.tmp").exists());
    Ok(())
}
