//! Transcript discovery and turn extraction
//!
//! Sessions live under a projects directory, one sub-directory per project,
//! one `*.jsonl` file per session. Each line is a JSON object; only `user`
//! and `assistant` lines carry turns.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::types::{Role, Turn};

/// Directory name a project's sessions are stored under:
/// `/home/me/app` becomes `-home-me-app`
pub fn mangle_project_path(path: &Path) -> String {
    let mangled = path.to_string_lossy().replace('/', "-");
    if mangled.starts_with('-') {
        mangled
    } else {
        format!("-{}", mangled)
    }
}

/// Read-only view over a projects directory
#[derive(Debug, Clone)]
pub struct TranscriptArchive {
    root: PathBuf,
}

impl TranscriptArchive {
    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Session files of one project, newest first
    pub fn project_sessions(&self, project: &Path) -> Vec<PathBuf> {
        let dir = self.root.join(mangle_project_path(project));
        if !dir.is_dir() {
            debug!("No session directory at {}", dir.display());
            return Vec::new();
        }
        newest_first(jsonl_files(&dir, 1))
    }

    /// Session files of every project, newest first
    pub fn all_sessions(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            debug!("Projects directory {} does not exist", self.root.display());
            return Vec::new();
        }
        newest_first(jsonl_files(&self.root, 2))
    }
}

/// `*.jsonl` files exactly `depth` levels below `dir`, through symlinks
fn jsonl_files(dir: &Path, depth: usize) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(depth)
        .max_depth(depth)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "jsonl"))
        .map(|entry| entry.into_path())
        .collect()
}

fn newest_first(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut stamped: Vec<(PathBuf, SystemTime)> = paths
        .into_iter()
        .map(|path| {
            let modified = path
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (path, modified)
        })
        .collect();
    stamped.sort_by(|a, b| b.1.cmp(&a.1));
    stamped.into_iter().map(|(path, _)| path).collect()
}

/// Ordered user/assistant turns of a session file.
///
/// Malformed lines are skipped; an unreadable file yields no turns.
pub fn extract_turns(path: &Path) -> Vec<Turn> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Cannot read session {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut turns = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("{}:{}: unreadable line: {}", path.display(), number + 1, e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(value) => turns.extend(parse_turn(&value)),
            Err(e) => debug!("{}:{}: skipping malformed line: {}", path.display(), number + 1, e),
        }
    }
    turns
}

/// A turn from one transcript line, if it is a non-empty user/assistant line
pub fn parse_turn(value: &Value) -> Option<Turn> {
    let role = value.get("type").and_then(Value::as_str).and_then(Role::from_transcript_type)?;

    let text = match value.get("message").and_then(|m| m.get("content")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return None,
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    Some(Turn { role, text: text.to_string(), timestamp })
}
