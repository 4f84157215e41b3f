//! Source rewriting applied before analysis.
//!
//! Steps run in registration order, each receiving the previous step's
//! output. A step sees the component identity but cannot rebind it.

use regex::{Captures, Regex};

use crate::config::TransformConfig;
use crate::error::{ConfigError, TransformError};
use crate::registry::ComponentIdentity;

const CONTENT_SLOT_PATTERN: &str = r#"(?m)<ContentSlot(.*)?:use="\$slots\.([a-z]+)"(.*)/>"#;

/// Host-provided rewrite. Returns the rewritten text or a failure reason.
pub type TransformFn = fn(&ComponentIdentity, &str) -> Result<String, String>;

pub enum TransformKind {
    ContentSlot(Regex),
    Replace { pattern: Regex, replacement: String },
    Custom(TransformFn),
}

pub struct TransformStep {
    name: String,
    kind: TransformKind,
}

impl TransformStep {
    pub fn custom(name: impl Into<String>, f: TransformFn) -> Self {
        Self {
            name: name.into(),
            kind: TransformKind::Custom(f),
        }
    }

    pub fn compile(config: &TransformConfig) -> Result<Self, ConfigError> {
        let step = match config {
            TransformConfig::ContentSlot => Self {
                name: "contentSlot".to_string(),
                kind: TransformKind::ContentSlot(compile_pattern(CONTENT_SLOT_PATTERN)?),
            },
            TransformConfig::Replace {
                name,
                pattern,
                replacement,
            } => Self {
                name: name.clone().unwrap_or_else(|| "replace".to_string()),
                kind: TransformKind::Replace {
                    pattern: compile_pattern(pattern)?,
                    replacement: replacement.clone(),
                },
            },
        };
        Ok(step)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, identity: &ComponentIdentity, code: &str) -> Result<String, TransformError> {
        match &self.kind {
            TransformKind::ContentSlot(re) => Ok(re
                .replace_all(code, |caps: &Captures| {
                    let slot = &caps[2];
                    if slot == "default" {
                        "<slot  />".to_string()
                    } else {
                        format!("<slot name=\"{slot}\" />")
                    }
                })
                .into_owned()),
            TransformKind::Replace {
                pattern,
                replacement,
            } => Ok(pattern.replace_all(code, replacement.as_str()).into_owned()),
            TransformKind::Custom(f) => f(identity, code).map_err(|reason| TransformError {
                step: self.name.clone(),
                reason,
            }),
        }
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Default)]
pub struct TransformPipeline {
    steps: Vec<TransformStep>,
}

impl TransformPipeline {
    pub fn from_config(configs: &[TransformConfig]) -> Result<Self, ConfigError> {
        let steps = configs
            .iter()
            .map(TransformStep::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    pub fn push(&mut self, step: TransformStep) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Identity of the configured rewrites. `None` when a host-provided step
    /// is present, since its behavior cannot be keyed.
    pub fn cache_key(&self) -> Option<String> {
        let mut key = String::new();
        for step in &self.steps {
            match &step.kind {
                TransformKind::ContentSlot(_) => key.push_str("contentSlot;"),
                TransformKind::Replace {
                    pattern,
                    replacement,
                } => key.push_str(&format!("replace:{}=>{};", pattern.as_str(), replacement)),
                TransformKind::Custom(_) => return None,
            }
        }
        Some(key)
    }

    pub fn apply(&self, identity: &ComponentIdentity, source: &str) -> Result<String, TransformError> {
        let mut code = source.to_string();
        for step in &self.steps {
            code = step.run(identity, &code)?;
        }
        Ok(code)
    }
}
