//! Engine options as recognized by the host integration.
//!
//! Options arrive as camelCase JSON (the shape a JS host passes through the
//! bridge or the CLI reads from `--options`). Every field has a default so an
//! empty object `{}` is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::ConfigError;

/// Type names the analyzer must not expand.
pub const DEFAULT_SCHEMA_IGNORE: &[&str] = &[
    "NuxtComponentMetaNames",
    "RouteLocationRaw",
    "RouteLocationPathRaw",
    "RouteLocationNamedRaw",
    "ComputedStyleProp",
    "VariantProp",
];

pub const DEFAULT_EXCLUDE: &[&str] = &[
    "nuxt/dist/app/components/client-only",
    "nuxt/dist/app/components/dev-only",
];

const DEFAULT_ANALYZER_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineOptions {
    /// Base for the `shortPath` of published records.
    pub root_dir: PathBuf,
    /// Where `component-meta.mjs` and `component-meta.json` are written.
    pub output_dir: Option<PathBuf>,
    /// Persistent metadata store; disabled when absent.
    pub cache_dir: Option<PathBuf>,
    /// Roots scanned by the CLI discovery.
    pub component_dirs: Vec<PathBuf>,
    pub silent: bool,
    pub exclude: Vec<String>,
    pub meta_fields: MetaFields,
    pub transformers: Vec<TransformConfig>,
    pub checker_options: CheckerOptions,
    pub globals_only: bool,
    pub analyzer_timeout_ms: u64,
    pub analyzer: AnalyzerConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_dir: None,
            cache_dir: None,
            component_dirs: Vec::new(),
            silent: true,
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            meta_fields: MetaFields::default(),
            transformers: vec![TransformConfig::ContentSlot],
            checker_options: CheckerOptions::default(),
            globals_only: false,
            analyzer_timeout_ms: DEFAULT_ANALYZER_TIMEOUT_MS,
            analyzer: AnalyzerConfig::Builtin,
        }
    }
}

impl EngineOptions {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let options: EngineOptions = serde_json::from_str(raw)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analyzer_timeout_ms == 0 {
            return Err(ConfigError::NonPositive("analyzerTimeoutMs"));
        }
        self.exclude_patterns()?;
        Ok(())
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }

    pub fn exclude_patterns(&self) -> Result<Vec<ExcludePattern>, ConfigError> {
        self.exclude.iter().map(|p| ExcludePattern::parse(p)).collect()
    }

    /// Digest of every option that influences analysis output. Two engines
    /// with equal digests produce equal metadata for equal sources.
    pub fn analysis_digest(&self) -> u64 {
        #[derive(Serialize)]
        struct Keyed<'a> {
            meta_fields: &'a MetaFields,
            transformers: &'a [TransformConfig],
            checker_options: &'a CheckerOptions,
            analyzer: &'a AnalyzerConfig,
        }
        let keyed = Keyed {
            meta_fields: &self.meta_fields,
            transformers: &self.transformers,
            checker_options: &self.checker_options,
            analyzer: &self.analyzer,
        };
        let bytes = serde_json::to_vec(&keyed).unwrap_or_default();
        xxh3_64(&bytes)
    }
}

/// Which metadata categories are computed. Disabled categories are omitted
/// from the output entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaFields {
    pub props: bool,
    pub slots: bool,
    pub events: bool,
    pub exposed: bool,
}

impl Default for MetaFields {
    fn default() -> Self {
        Self {
            props: true,
            slots: true,
            events: true,
            exposed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckerOptions {
    pub force_use_ts: bool,
    pub strict: bool,
    pub schema: SchemaOptions,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            force_use_ts: true,
            strict: false,
            schema: SchemaOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    pub ignore: Vec<String>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_SCHEMA_IGNORE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A transform step as written in the options. Compiled into a
/// [`crate::transform::TransformStep`] when the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransformConfig {
    /// `<ContentSlot :use="$slots.x" />` to a native `<slot>`.
    ContentSlot,
    Replace {
        #[serde(default)]
        name: Option<String>,
        pattern: String,
        replacement: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalyzerConfig {
    Builtin,
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

/// A compiled `exclude` entry. `/re/` is a regular expression, anything else
/// matches as a substring of the component path.
#[derive(Debug, Clone)]
pub enum ExcludePattern {
    Substring(String),
    Regex(Regex),
}

impl ExcludePattern {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.len() > 2 && raw.starts_with('/') && raw.ends_with('/') {
            let body = &raw[1..raw.len() - 1];
            let re = Regex::new(body).map_err(|e| ConfigError::Pattern {
                pattern: raw.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(ExcludePattern::Regex(re));
        }
        Ok(ExcludePattern::Substring(raw.to_string()))
    }

    pub fn matches(&self, path: &Path) -> bool {
        let normalized = path.to_string_lossy().replace('\\', "/");
        match self {
            ExcludePattern::Substring(s) => normalized.contains(s.as_str()),
            ExcludePattern::Regex(re) => re.is_match(&normalized),
        }
    }
}
