//! Error taxonomy for the metadata engine.
//!
//! Only [`EngineError`] crosses the public orchestrator boundary. Failures
//! scoped to a single component are captured as [`EntryFailure`] values inside
//! cache entries and published alongside resolved metadata.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors returned by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The analysis capability is missing or misconfigured. Fatal.
    #[error("analyzer unavailable: {0}")]
    AnalyzerUnavailable(#[from] AnalyzerUnavailable),

    /// A single component could not be analyzed.
    #[error("component `{name}` failed ({kind}): {reason}")]
    Component {
        name: String,
        kind: FailureKind,
        reason: String,
    },

    /// The requested component is not in the registry.
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid options: {0}")]
    Config(#[from] ConfigError),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The analyzer cannot produce any metadata at all.
///
/// Cloneable so that every caller waiting on the same in-flight analysis
/// receives it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct AnalyzerUnavailable {
    pub reason: String,
}

/// Failures raised by an analysis capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("analysis timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("failed to parse component: {0}")]
    Parse(String),
}

/// A transform step rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transform `{step}` failed: {reason}")]
pub struct TransformError {
    pub step: String,
    pub reason: String,
}

/// A discovery tuple that cannot become a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("component at {0} has an empty name")]
    EmptyName(PathBuf),

    #[error("component `{name}` is not PascalCase")]
    InvalidName { name: String },

    #[error("component `{name}` has a relative path {path}")]
    RelativePath { name: String, path: PathBuf },

    #[error("component name `{name}` already registered for {existing}")]
    DuplicateName { name: String, existing: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read options file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed options: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("`{0}` must be greater than zero")]
    NonPositive(&'static str),
}

/// Errors of the persistent metadata store. Never fatal: callers treat them
/// as cache misses.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Returned by lookups on the published record set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("component `{0}` not found")]
    NotFound(String),
}

/// Category of a per-component failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Source,
    Transform,
    Timeout,
    Parse,
    /// The analyzer panicked.
    Panic,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Source => "source",
            FailureKind::Transform => "transform",
            FailureKind::Timeout => "timeout",
            FailureKind::Parse => "parse",
            FailureKind::Panic => "panic",
        };
        f.write_str(s)
    }
}

/// A failure recorded in place of metadata for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl EntryFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl From<TransformError> for EntryFailure {
    fn from(err: TransformError) -> Self {
        EntryFailure::new(FailureKind::Transform, err.to_string())
    }
}
