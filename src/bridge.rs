use std::path::Path;

use napi::bindgen_prelude::*;
use napi_derive::napi;
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::config::EngineOptions;
use crate::error::EngineError;
use crate::parser::ComponentMetaParser;
use crate::registry::{ComponentDescriptor, ComponentIdentity, RegistryDiff};

fn engine_error(err: EngineError) -> Error {
    Error::from_reason(err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::from_reason(format!("serialize failed: {}", e)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncSummary {
    added: Vec<String>,
    removed: Vec<String>,
}

impl From<RegistryDiff> for SyncSummary {
    fn from(diff: RegistryDiff) -> Self {
        let names = |ids: Vec<ComponentIdentity>| ids.iter().map(|i| i.name().to_string()).collect::<Vec<_>>();
        Self {
            added: names(diff.added),
            removed: names(diff.removed),
        }
    }
}

/// Engine handle owned by the JS host. Every method blocks on an internal
/// runtime and returns JSON.
#[napi]
pub struct ComponentMetaEngine {
    runtime: Runtime,
    parser: ComponentMetaParser,
}

#[napi]
impl ComponentMetaEngine {
    #[napi(constructor)]
    pub fn new(options_json: Option<String>) -> Result<Self> {
        let options = match options_json {
            Some(raw) => EngineOptions::from_json_str(&raw).map_err(|e| Error::from_reason(format!("invalid options: {}", e)))?,
            None => EngineOptions::default(),
        };
        let runtime = Runtime::new().map_err(|e| Error::from_reason(format!("runtime start failed: {}", e)))?;
        let parser = ComponentMetaParser::from_options(options).map_err(engine_error)?;
        Ok(Self { runtime, parser })
    }

    /// `descriptors_json` is an array of `{displayName, resolvedPath, isGlobalOnly}`.
    #[napi]
    pub fn sync_components(&self, descriptors_json: String) -> Result<String> {
        let descriptors: Vec<ComponentDescriptor> = serde_json::from_str(&descriptors_json)
            .map_err(|e| Error::from_reason(format!("invalid descriptors json: {}", e)))?;
        let diff = self
            .runtime
            .block_on(self.parser.sync_components(&descriptors))
            .map_err(engine_error)?;
        to_json(&SyncSummary::from(diff))
    }

    #[napi]
    pub fn parse_all(&self) -> Result<String> {
        self.runtime.block_on(self.parser.parse_all()).map_err(engine_error)?;
        to_json(&self.parser.queryable())
    }

    /// Returns the refreshed record, or `null` for unregistered paths.
    #[napi]
    pub fn on_source_changed(&self, path: String) -> Result<String> {
        let entry = self
            .runtime
            .block_on(self.parser.on_source_changed(Path::new(&path)))
            .map_err(engine_error)?;
        let record = entry.and_then(|e| self.parser.queryable().get(e.identity.name()).cloned());
        to_json(&record)
    }

    #[napi]
    pub fn query(&self, name: Option<String>) -> Result<String> {
        self.parser.query_json(name.as_deref()).map_err(engine_error)
    }

    #[napi]
    pub fn to_module(&self) -> Result<String> {
        self.parser.to_module().map_err(engine_error)
    }

    #[napi]
    pub fn stub_output(&self) -> Result<String> {
        self.runtime.block_on(self.parser.stub_output()).map_err(engine_error)?;
        self.parser.to_module().map_err(engine_error)
    }
}
