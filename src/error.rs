//! Typed errors for the knowledge-state core and the profile store

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by concept graph loading and mastery state persistence
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge graph not found: {0}")]
    DomainNotFound(String),

    #[error("Knowledge graph '{domain}' declares node '{node_id}' more than once")]
    DuplicateNode { domain: String, node_id: String },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KnowledgeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse { path: path.into(), source }
    }

    pub(crate) fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize { path: path.into(), source }
    }

    /// Whether this error only means "the domain has no graph"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DomainNotFound(_))
    }
}

/// Errors raised by the profile store
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("No profile found at {0}. Run: skill-issue init")]
    NotInitialized(PathBuf),

    #[error("Profile already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("Failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize profile for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse { path: path.into(), source }
    }

    pub(crate) fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize { path: path.into(), source }
    }
}

pub type KnowledgeResult<T> = std::result::Result<T, KnowledgeError>;
pub type ProfileResult<T> = std::result::Result<T, ProfileError>;
