//! Boundary between the engine and the analysis capability.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::analyzer::command::CommandAnalyzer;
use crate::analyzer::extract::SfcAnalyzer;
use crate::analyzer::metadata::{normalize, ComponentMetadata};
use crate::config::{AnalyzerConfig, EngineOptions, MetaFields};
use crate::error::AnalyzerError;
use crate::registry::ComponentIdentity;

/// Invocation options handed to the capability for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub path: PathBuf,
    pub source: String,
    pub fields: MetaFields,
    /// Type names to leave unexpanded.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub force_use_ts: bool,
    #[serde(default)]
    pub strict: bool,
}

/// Given component source and its file identity, describe its public
/// interface. Output may use any shape [`normalize`] accepts.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<Value, AnalyzerError>;

    /// Stable identity of this analyzer's output. Results of an analyzer
    /// without one are never persisted.
    fn cache_key(&self) -> Option<String> {
        None
    }
}

pub fn analyzer_from_config(config: &AnalyzerConfig) -> Arc<dyn Analyzer> {
    match config {
        AnalyzerConfig::Builtin => Arc::new(SfcAnalyzer),
        AnalyzerConfig::Command { program, args } => {
            Arc::new(CommandAnalyzer::new(program.clone(), args.clone()))
        }
    }
}

/// Wraps a capability with the engine's options, a per-call timeout and
/// output normalization.
pub struct AnalyzerAdapter {
    analyzer: Arc<dyn Analyzer>,
    fields: MetaFields,
    ignore: Vec<String>,
    force_use_ts: bool,
    strict: bool,
    timeout: Duration,
}

impl AnalyzerAdapter {
    pub fn new(analyzer: Arc<dyn Analyzer>, options: &EngineOptions) -> Self {
        Self {
            analyzer,
            fields: options.meta_fields,
            ignore: options.checker_options.schema.ignore.clone(),
            force_use_ts: options.checker_options.force_use_ts,
            strict: options.checker_options.strict,
            timeout: options.analyzer_timeout(),
        }
    }

    pub fn cache_key(&self) -> Option<String> {
        self.analyzer.cache_key()
    }

    pub async fn analyze(
        &self,
        identity: &ComponentIdentity,
        transformed: String,
    ) -> Result<ComponentMetadata, AnalyzerError> {
        let request = AnalyzeRequest {
            path: identity.path().to_path_buf(),
            source: transformed,
            fields: self.fields,
            ignore: self.ignore.clone(),
            force_use_ts: self.force_use_ts,
            strict: self.strict,
        };
        debug!(component = identity.name(), "invoking analyzer");
        let raw = match tokio::time::timeout(self.timeout, self.analyzer.analyze(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(AnalyzerError::Timeout(self.timeout)),
        };
        normalize(&raw, self.fields)
            .map_err(|reason| AnalyzerError::Parse(format!("malformed analyzer output: {reason}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ComponentDescriptor, Registry};
    use serde_json::json;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<AnalyzeRequest>>,
        reply: Value,
    }

    #[async_trait]
    impl Analyzer for Recording {
        async fn analyze(&self, request: AnalyzeRequest) -> Result<Value, AnalyzerError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    struct Stalling;

    #[async_trait]
    impl Analyzer for Stalling {
        async fn analyze(&self, _request: AnalyzeRequest) -> Result<Value, AnalyzerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!({}))
        }
    }

    fn button() -> ComponentIdentity {
        let registry = Registry::new(vec![], false);
        registry.register(&[ComponentDescriptor::new("Button", "/a/Button.vue")]);
        registry.list().remove(0)
    }

    #[tokio::test]
    async fn forwards_options_and_normalizes() {
        let analyzer = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            reply: json!({ "props": [{ "name": "label", "type": "string", "required": true }] }),
        });
        let mut options = EngineOptions::default();
        options.meta_fields.slots = false;
        let adapter = AnalyzerAdapter::new(analyzer.clone(), &options);

        let meta = adapter.analyze(&button(), "<template />".to_string()).await.unwrap();
        assert_eq!(meta.props.unwrap()[0].name, "label");
        assert!(meta.slots.is_none());

        let seen = analyzer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, PathBuf::from("/a/Button.vue"));
        assert_eq!(seen[0].source, "<template />");
        assert!(!seen[0].fields.slots);
        assert!(seen[0].ignore.iter().any(|t| t == "RouteLocationRaw"));
        assert!(seen[0].force_use_ts);
    }

    #[tokio::test]
    async fn slow_analyzer_times_out() {
        let options = EngineOptions {
            analyzer_timeout_ms: 20,
            ..EngineOptions::default()
        };
        let adapter = AnalyzerAdapter::new(Arc::new(Stalling), &options);
        let err = adapter.analyze(&button(), String::new()).await.unwrap_err();
        assert_eq!(err, AnalyzerError::Timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn builtin_analyzer_honors_timeout() {
        let mut source = String::from("<script setup lang=\"ts\">\n");
        for i in 0..200_000 {
            source.push_str(&format!("const value{i}: number = {i}\n"));
        }
        source.push_str("</script>\n");
        let options = EngineOptions {
            analyzer_timeout_ms: 1,
            ..EngineOptions::default()
        };
        let adapter = AnalyzerAdapter::new(Arc::new(SfcAnalyzer), &options);
        let err = adapter.analyze(&button(), source).await.unwrap_err();
        assert_eq!(err, AnalyzerError::Timeout(Duration::from_millis(1)));
    }

    #[test]
    fn cache_key_comes_from_the_analyzer() {
        let options = EngineOptions::default();
        assert!(AnalyzerAdapter::new(Arc::new(Stalling), &options).cache_key().is_none());
        let builtin = AnalyzerAdapter::new(Arc::new(SfcAnalyzer), &options).cache_key().unwrap();
        assert!(builtin.starts_with("builtin/"));
    }

    #[tokio::test]
    async fn malformed_output_is_a_parse_failure() {
        let analyzer = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            reply: json!("not an object"),
        });
        let adapter = AnalyzerAdapter::new(analyzer, &EngineOptions::default());
        let err = adapter.analyze(&button(), String::new()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse(reason) if reason.contains("malformed")));
    }
}
