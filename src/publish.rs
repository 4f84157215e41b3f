//! Published artifacts: the generated module and the queryable record set.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::analyzer::metadata::ComponentMetadata;
use crate::cache::{EntryOutcome, EntryStatus};
use crate::error::{EngineError, EntryFailure, QueryError};
use crate::registry::{kebab_case, pascal_case, ComponentIdentity};

pub const MODULE_FILE: &str = "component-meta.mjs";
pub const JSON_FILE: &str = "component-meta.json";

/// Immutable aggregate of completed cache entries, keyed by display name in
/// registry order.
#[derive(Debug, Clone, Default)]
pub struct PublishedSnapshot {
    /// 0 for the stub published before any analysis.
    pub generation: u64,
    /// Cache revision this snapshot was taken at.
    pub revision: u64,
    pub components: IndexMap<String, SnapshotEntry>,
}

impl PublishedSnapshot {
    /// Valid, empty snapshot that stands in until the first real one.
    pub fn stub() -> Self {
        Self::default()
    }

    pub fn is_stub(&self) -> bool {
        self.generation == 0
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.components.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub identity: ComponentIdentity,
    pub status: EntryStatus,
    pub outcome: EntryOutcome,
}

/// One component as served to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub pascal_name: String,
    pub kebab_name: String,
    pub file_path: String,
    pub short_path: String,
    pub global: bool,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ComponentMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryFailure>,
}

/// Record set indexed by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryableSet {
    records: IndexMap<String, ComponentRecord>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryResponse<'a> {
    All(&'a QueryableSet),
    One(&'a ComponentRecord),
}

impl QueryableSet {
    /// The whole set when `name` is absent, else the single matching record.
    pub fn lookup(&self, name: Option<&str>) -> Result<QueryResponse<'_>, QueryError> {
        let Some(raw) = name.filter(|n| !n.trim().is_empty()) else {
            return Ok(QueryResponse::All(self));
        };
        let key = normalize_query_name(raw);
        self.records
            .get(&key)
            .map(QueryResponse::One)
            .ok_or(QueryError::NotFound(key))
    }

    pub fn get(&self, name: &str) -> Option<&ComponentRecord> {
        self.records.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `my-button.json` -> `MyButton`.
pub fn normalize_query_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('/');
    let base = trimmed.strip_suffix(".json").unwrap_or(trimmed);
    pascal_case(base)
}

pub struct Publisher {
    root_dir: PathBuf,
    output_dir: Option<PathBuf>,
}

impl Publisher {
    pub fn new(root_dir: impl Into<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            output_dir,
        }
    }

    pub fn to_queryable(&self, snapshot: &PublishedSnapshot) -> QueryableSet {
        let records = snapshot
            .components
            .iter()
            .map(|(name, entry)| (name.clone(), self.record(name, entry)))
            .collect();
        QueryableSet { records }
    }

    fn record(&self, name: &str, entry: &SnapshotEntry) -> ComponentRecord {
        let path = entry.identity.path();
        let (meta, error) = match &entry.outcome {
            EntryOutcome::Resolved(meta) => (Some(ComponentMetadata::clone(meta)), None),
            EntryOutcome::Failed(failure) => (None, Some(failure.clone())),
        };
        ComponentRecord {
            pascal_name: name.to_string(),
            kebab_name: kebab_case(name),
            file_path: path.display().to_string(),
            short_path: self.short_path(path),
            global: entry.identity.is_global(),
            status: entry.status,
            meta,
            error,
        }
    }

    fn short_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Source of the generated module mapping display name to record. Byte
    /// identical for equal snapshots.
    pub fn to_module(&self, snapshot: &PublishedSnapshot) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string_pretty(&self.to_queryable(snapshot))?;
        Ok(format!("export default {json}\n"))
    }

    /// Write both artifacts to the output directory, if one is configured.
    pub async fn write(&self, snapshot: &PublishedSnapshot) -> Result<(), EngineError> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        let module = self.to_module(snapshot)?;
        let json = serde_json::to_string_pretty(&self.to_queryable(snapshot))?;
        write_if_changed(&dir.join(MODULE_FILE), module.as_bytes()).await?;
        write_if_changed(&dir.join(JSON_FILE), json.as_bytes()).await
    }

    /// Write the empty module unless an artifact already exists.
    pub async fn write_stub(&self) -> Result<(), EngineError> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        let path = dir.join(MODULE_FILE);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }
        let module = self.to_module(&PublishedSnapshot::stub())?;
        write_if_changed(&path, module.as_bytes()).await
    }
}

async fn write_if_changed(path: &Path, contents: &[u8]) -> Result<(), EngineError> {
    if let Ok(existing) = tokio::fs::read(path).await {
        if existing == contents {
            debug!(path = %path.display(), "artifact unchanged");
            return Ok(());
        }
    }
    let io = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io)?;
    }
    tokio::fs::write(path, contents).await.map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::metadata::PropMeta;
    use crate::error::FailureKind;
    use crate::registry::{ComponentDescriptor, Registry};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn snapshot() -> PublishedSnapshot {
        let registry = Registry::new(vec![], false);
        registry.register(&[
            ComponentDescriptor::new("MyButton", "/proj/components/MyButton.vue"),
            ComponentDescriptor::new("Card", "/proj/components/Card.vue").global(),
        ]);
        let ids = registry.list();
        let meta = ComponentMetadata {
            props: Some(vec![PropMeta {
                name: "label".to_string(),
                ty: "string".to_string(),
                required: true,
                default: None,
                description: None,
            }]),
            ..ComponentMetadata::default()
        };
        let mut components = IndexMap::new();
        components.insert(
            "MyButton".to_string(),
            SnapshotEntry {
                identity: ids[0].clone(),
                status: EntryStatus::Resolved,
                outcome: EntryOutcome::Resolved(Arc::new(meta)),
            },
        );
        components.insert(
            "Card".to_string(),
            SnapshotEntry {
                identity: ids[1].clone(),
                status: EntryStatus::Error,
                outcome: EntryOutcome::Failed(EntryFailure::new(FailureKind::Parse, "Unexpected token")),
            },
        );
        PublishedSnapshot {
            generation: 3,
            revision: 2,
            components,
        }
    }

    fn publisher() -> Publisher {
        Publisher::new("/proj", None)
    }

    #[test]
    fn records_carry_names_paths_and_failures() {
        let set = publisher().to_queryable(&snapshot());
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["MyButton", "Card"]);

        let button = set.get("MyButton").unwrap();
        assert_eq!(button.kebab_name, "my-button");
        assert_eq!(button.short_path, "components/MyButton.vue");
        assert!(!button.global);
        assert!(button.error.is_none());

        let card = set.get("Card").unwrap();
        assert!(card.global);
        assert!(card.meta.is_none());
        assert_eq!(card.error.as_ref().unwrap().reason, "Unexpected token");
    }

    #[test]
    fn lookup_whole_set_single_and_missing() {
        let set = publisher().to_queryable(&snapshot());
        assert!(matches!(set.lookup(None), Ok(QueryResponse::All(_))));
        assert!(matches!(set.lookup(Some("")), Ok(QueryResponse::All(_))));
        match set.lookup(Some("my-button.json")) {
            Ok(QueryResponse::One(record)) => assert_eq!(record.pascal_name, "MyButton"),
            other => panic!("unexpected lookup result: {other:?}"),
        }
        assert_eq!(
            set.lookup(Some("Modal")).unwrap_err(),
            QueryError::NotFound("Modal".to_string())
        );
    }

    #[test]
    fn error_records_serialize_with_reason() {
        let set = publisher().to_queryable(&snapshot());
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["Card"]["status"], "error");
        assert_eq!(json["Card"]["error"]["kind"], "parse");
        assert!(json["Card"].get("meta").is_none());
        assert_eq!(json["MyButton"]["meta"]["props"][0]["name"], "label");
    }

    #[test]
    fn module_is_deterministic() {
        let a = publisher().to_module(&snapshot()).unwrap();
        let b = publisher().to_module(&snapshot()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("export default {\n  \"MyButton\""));
        assert_eq!(publisher().to_module(&PublishedSnapshot::stub()).unwrap(), "export default {}\n");
    }

    #[tokio::test]
    async fn stub_is_written_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = Publisher::new("/proj", Some(dir.path().to_path_buf()));
        publisher.write_stub().await.unwrap();
        let module_path = dir.path().join(MODULE_FILE);
        assert_eq!(std::fs::read_to_string(&module_path).unwrap(), "export default {}\n");

        publisher.write(&snapshot()).await.unwrap();
        publisher.write_stub().await.unwrap();
        let written = std::fs::read_to_string(&module_path).unwrap();
        assert!(written.contains("MyButton"));
        assert!(dir.path().join(JSON_FILE).exists());
    }
}
