use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;
use xxhash_rust::xxh3::Xxh3;

use crate::analyzer::metadata::ComponentMetadata;
use crate::cache::Fingerprint;
use crate::error::StoreError;

/// Persisted analysis result of one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Fingerprint of the raw source the metadata was computed from
    pub fingerprint: Fingerprint,
    /// Seconds since the epoch at write time
    pub stored_at: u64,
    pub metadata: ComponentMetadata,
}

/// On-disk metadata store so a restarted engine skips analysis of unchanged
/// components.
///
/// File names hash the component path together with the crate version and
/// the options digest, so entries written under different analysis options
/// are never read back.
pub struct MetadataStore {
    cache_dir: PathBuf,
    version: String,
    options_digest: u64,
}

impl MetadataStore {
    pub fn open(cache_dir: impl AsRef<Path>, options_digest: u64) -> Result<Self, StoreError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).map_err(|source| StoreError::Io {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self {
            cache_dir,
            version: env!("CARGO_PKG_VERSION").to_string(),
            options_digest,
        })
    }

    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn entry_path(&self, component: &Path) -> PathBuf {
        let mut hasher = Xxh3::new();
        hasher.update(component.to_string_lossy().as_bytes());
        hasher.update(self.version.as_bytes());
        hasher.update(&self.options_digest.to_le_bytes());
        self.cache_dir.join(format!("{:016x}.json", hasher.digest()))
    }

    /// Metadata persisted for `component`, if it was computed from a source
    /// with the same fingerprint. Unreadable entries are misses.
    pub async fn load(&self, component: &Path, fingerprint: Fingerprint) -> Option<ComponentMetadata> {
        let path = self.entry_path(component);
        let raw = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<StoredEntry>(&raw) {
            Ok(entry) if entry.fingerprint == fingerprint => Some(entry.metadata),
            Ok(_) => None,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "ignoring corrupt store entry");
                None
            }
        }
    }

    pub async fn save(
        &self,
        component: &Path,
        fingerprint: Fingerprint,
        metadata: &ComponentMetadata,
    ) -> Result<(), StoreError> {
        let entry = StoredEntry {
            fingerprint,
            stored_at: Self::current_timestamp(),
            metadata: metadata.clone(),
        };
        let json = serde_json::to_vec(&entry)?;
        let path = self.entry_path(component);
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    pub fn remove(&self, component: &Path) {
        std::fs::remove_file(self.entry_path(component)).ok();
    }

    /// Drop every persisted entry.
    pub fn clear(&self) -> Result<(), StoreError> {
        let io = |source| StoreError::Io {
            path: self.cache_dir.clone(),
            source,
        };
        std::fs::remove_dir_all(&self.cache_dir).map_err(io)?;
        std::fs::create_dir_all(&self.cache_dir).map_err(io)
    }

    pub fn stats(&self) -> StoreStats {
        let entries = std::fs::read_dir(&self.cache_dir)
            .map(|dir| dir.filter_map(|e| e.ok()).count())
            .unwrap_or(0);
        StoreStats {
            entries,
            cache_dir: self.cache_dir.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreStats {
    pub entries: usize,
    pub cache_dir: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::metadata::PropMeta;

    fn metadata() -> ComponentMetadata {
        ComponentMetadata {
            props: Some(vec![PropMeta {
                name: "label".to_string(),
                ty: "string".to_string(),
                required: true,
                default: None,
                description: None,
            }]),
            ..ComponentMetadata::default()
        }
    }

    #[tokio::test]
    async fn hit_and_miss_by_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(dir.path(), 1).unwrap();
        let component = Path::new("/a/Button.vue");
        let fp = Fingerprint::compute(component, "<template />");

        assert!(store.load(component, fp).await.is_none());
        store.save(component, fp, &metadata()).await.unwrap();
        assert_eq!(store.load(component, fp).await, Some(metadata()));

        let changed = Fingerprint::compute(component, "<template><slot /></template>");
        assert!(store.load(component, changed).await.is_none());
    }

    #[tokio::test]
    async fn persists_across_instances_with_same_options() {
        let dir = tempfile::tempdir().unwrap();
        let component = Path::new("/a/Card.vue");
        let fp = Fingerprint::compute(component, "x");
        {
            let store = MetadataStore::open(dir.path(), 7).unwrap();
            store.save(component, fp, &metadata()).await.unwrap();
        }
        let same = MetadataStore::open(dir.path(), 7).unwrap();
        assert!(same.load(component, fp).await.is_some());

        let other_options = MetadataStore::open(dir.path(), 8).unwrap();
        assert!(other_options.load(component, fp).await.is_none());
    }

    #[tokio::test]
    async fn clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("meta"), 1).unwrap();
        let component = Path::new("/a/Card.vue");
        let fp = Fingerprint::compute(component, "x");
        store.save(component, fp, &metadata()).await.unwrap();
        assert_eq!(store.stats().entries, 1);
        store.clear().unwrap();
        assert_eq!(store.stats().entries, 0);
    }
}
