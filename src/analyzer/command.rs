//! Out-of-process analyzer.
//!
//! The child receives one [`AnalyzeRequest`] as JSON on stdin and answers
//! with raw metadata JSON on stdout, or `{"error": "..."}` with a non-zero
//! exit status when the component cannot be parsed. `component-meta analyze`
//! speaks this protocol.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::analyzer::adapter::{AnalyzeRequest, Analyzer};
use crate::error::AnalyzerError;

pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    async fn analyze(&self, request: AnalyzeRequest) -> Result<Value, AnalyzerError> {
        let payload = serde_json::to_vec(&request)
            .map_err(|e| AnalyzerError::Unavailable(format!("cannot encode request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a timed-out analysis drops this future; take the child with it
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    AnalyzerError::Unavailable(format!("analyzer `{}` not found", self.program))
                }
                _ => AnalyzerError::Unavailable(format!("cannot start `{}`: {e}", self.program)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| AnalyzerError::Unavailable(format!("cannot write request: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AnalyzerError::Unavailable(format!("analyzer did not finish: {e}")))?;

        let parsed = serde_json::from_slice::<Value>(&output.stdout);
        if let Ok(Value::Object(obj)) = &parsed {
            if let Some(reason) = obj.get("error").and_then(Value::as_str) {
                return Err(AnalyzerError::Parse(reason.to_string()));
            }
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalyzerError::Unavailable(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        parsed.map_err(|e| AnalyzerError::Parse(format!("analyzer printed invalid JSON: {e}")))
    }

    fn cache_key(&self) -> Option<String> {
        let mut key = format!("command/{}", self.program);
        for arg in &self.args {
            key.push(' ');
            key.push_str(arg);
        }
        Some(key)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::MetaFields;
    use serde_json::json;
    use std::path::PathBuf;

    fn request() -> AnalyzeRequest {
        AnalyzeRequest {
            path: PathBuf::from("/a/Button.vue"),
            source: "<template />".to_string(),
            fields: MetaFields::default(),
            ignore: vec![],
            force_use_ts: true,
            strict: false,
        }
    }

    fn sh(script: &str) -> CommandAnalyzer {
        CommandAnalyzer::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let analyzer = CommandAnalyzer::new("component-meta-no-such-analyzer", vec![]);
        let err = analyzer.analyze(request()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Unavailable(reason) if reason.contains("not found")));
    }

    #[tokio::test]
    async fn stdout_json_is_returned() {
        let analyzer = sh(r#"cat > /dev/null; echo '{"props":[{"name":"label","type":"string"}]}'"#);
        let raw = analyzer.analyze(request()).await.unwrap();
        assert_eq!(raw, json!({ "props": [{ "name": "label", "type": "string" }] }));
    }

    #[tokio::test]
    async fn error_object_is_a_parse_failure() {
        let analyzer = sh(r#"cat > /dev/null; echo '{"error":"Unexpected token"}'; exit 1"#);
        let err = analyzer.analyze(request()).await.unwrap_err();
        assert_eq!(err, AnalyzerError::Parse("Unexpected token".to_string()));
    }

    #[tokio::test]
    async fn crash_without_error_object_is_unavailable() {
        let analyzer = sh("cat > /dev/null; echo boom >&2; exit 3");
        let err = analyzer.analyze(request()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Unavailable(reason) if reason.contains("boom")));
    }
}
