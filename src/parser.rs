//! Public coordinator: registry updates in, published snapshots out.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::Xxh3;

use crate::analyzer::adapter::{analyzer_from_config, Analyzer, AnalyzerAdapter};
use crate::analyzer::metadata::ComponentMetadata;
use crate::cache::{CacheEntry, EntryOutcome, EntryStatus, MetadataCache};
use crate::config::EngineOptions;
use crate::error::EngineError;
use crate::publish::{PublishedSnapshot, Publisher, QueryableSet};
use crate::registry::{ComponentDescriptor, ComponentIdentity, Registry, RegistryDiff};
use crate::store::MetadataStore;
use crate::transform::TransformPipeline;

pub struct ComponentMetaParser {
    silent: bool,
    registry: Arc<Registry>,
    cache: MetadataCache,
    publisher: Publisher,
    published: watch::Sender<Arc<PublishedSnapshot>>,
    /// Serializes publication so artifacts on disk follow snapshot order.
    publish_lock: Mutex<()>,
}

impl ComponentMetaParser {
    /// Engine using the analyzer named in `options.analyzer`.
    pub fn from_options(options: EngineOptions) -> Result<Self, EngineError> {
        let analyzer = analyzer_from_config(&options.analyzer);
        Self::new(options, analyzer)
    }

    pub fn new(options: EngineOptions, analyzer: Arc<dyn Analyzer>) -> Result<Self, EngineError> {
        let pipeline = TransformPipeline::from_config(&options.transformers)?;
        Self::with_pipeline(options, analyzer, pipeline)
    }

    pub fn with_pipeline(
        options: EngineOptions,
        analyzer: Arc<dyn Analyzer>,
        pipeline: TransformPipeline,
    ) -> Result<Self, EngineError> {
        options.validate()?;
        let registry = Arc::new(Registry::new(options.exclude_patterns()?, options.globals_only));
        let adapter = AnalyzerAdapter::new(analyzer, &options);
        let store = match (&options.cache_dir, adapter.cache_key(), pipeline.cache_key()) {
            (None, _, _) => None,
            (Some(dir), Some(analyzer_key), Some(pipeline_key)) => {
                let digest = store_digest(options.analysis_digest(), &analyzer_key, &pipeline_key);
                match MetadataStore::open(dir, digest) {
                    Ok(store) => Some(store),
                    Err(err) => {
                        warn!(error = %err, "persistent store disabled");
                        None
                    }
                }
            }
            (Some(_), _, _) => {
                warn!("persistent store disabled: analyzer or transform step has no cache key");
                None
            }
        };
        let cache = MetadataCache::new(registry.clone(), pipeline, adapter, store);
        let (published, _) = watch::channel(Arc::new(PublishedSnapshot::stub()));

        Ok(Self {
            silent: options.silent,
            registry,
            cache,
            publisher: Publisher::new(options.root_dir.clone(), options.output_dir.clone()),
            published,
            publish_lock: Mutex::new(()),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Apply a discovery update. Removed components leave the cache and the
    /// published snapshot.
    pub async fn sync_components(&self, descriptors: &[ComponentDescriptor]) -> Result<RegistryDiff, EngineError> {
        let diff = self.registry.register(descriptors);
        for removed in &diff.removed {
            self.cache.remove(removed.path());
        }
        if !diff.is_empty() {
            debug!(added = diff.added.len(), removed = diff.removed.len(), "component set changed");
            self.publish().await?;
        }
        Ok(diff)
    }

    pub async fn parse_component(&self, identity: &ComponentIdentity) -> Result<Arc<ComponentMetadata>, EngineError> {
        let entry = self.cache.get(identity).await?;
        self.publish().await?;
        match entry.outcome {
            EntryOutcome::Resolved(meta) => Ok(meta),
            EntryOutcome::Failed(failure) => Err(EngineError::Component {
                name: identity.name().to_string(),
                kind: failure.kind,
                reason: failure.reason,
            }),
        }
    }

    pub async fn parse_component_named(&self, name: &str) -> Result<Arc<ComponentMetadata>, EngineError> {
        let identity = self
            .registry
            .find_by_name(name)
            .ok_or_else(|| EngineError::UnknownComponent(name.to_string()))?;
        self.parse_component(&identity).await
    }

    /// Analyze every registered component that needs it and publish one
    /// snapshot. Per-component failures are part of the snapshot; only an
    /// unavailable analyzer is an error.
    pub async fn parse_all(&self) -> Result<Arc<PublishedSnapshot>, EngineError> {
        let started = Instant::now();
        let analyses_before = self.cache.analyses();
        let components = self.registry.list();
        let results = join_all(components.iter().map(|c| self.cache.get(c))).await;

        let mut failed = 0usize;
        for result in results {
            let entry = result?;
            if entry.failure().is_some() {
                failed += 1;
            }
        }

        let snapshot = self.publish().await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let analyzed = self.cache.analyses() - analyses_before;
        if self.silent {
            debug!(components = components.len(), analyzed, failed, elapsed_ms, "parsed components");
        } else {
            info!(components = components.len(), analyzed, failed, elapsed_ms, "parsed components");
        }
        Ok(snapshot)
    }

    /// File-change hook: invalidate, recompute and republish. Unknown paths
    /// are ignored.
    pub async fn on_source_changed(&self, path: &Path) -> Result<Option<CacheEntry>, EngineError> {
        let Some(identity) = self.registry.get(path) else {
            debug!(path = %path.display(), "change for unregistered path ignored");
            return Ok(None);
        };
        self.cache.invalidate(path);
        let entry = self.cache.get(&identity).await?;
        self.publish().await?;
        Ok(Some(entry))
    }

    /// Make sure a module artifact exists before any analysis has run.
    pub async fn stub_output(&self) -> Result<Arc<PublishedSnapshot>, EngineError> {
        self.publisher.write_stub().await?;
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> Arc<PublishedSnapshot> {
        self.published.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishedSnapshot>> {
        self.published.subscribe()
    }

    pub fn status(&self, identity: &ComponentIdentity) -> EntryStatus {
        self.cache.status(identity.path())
    }

    pub fn queryable(&self) -> QueryableSet {
        self.publisher.to_queryable(&self.snapshot())
    }

    /// JSON body for the query endpoint.
    pub fn query_json(&self, name: Option<&str>) -> Result<String, EngineError> {
        let set = self.queryable();
        let response = set.lookup(name)?;
        Ok(serde_json::to_string(&response)?)
    }

    pub fn to_module(&self) -> Result<String, EngineError> {
        Ok(self.publisher.to_module(&self.snapshot())?)
    }

    /// Take a new snapshot if the cache changed since the last one.
    async fn publish(&self) -> Result<Arc<PublishedSnapshot>, EngineError> {
        let _guard = self.publish_lock.lock().await;
        let current = self.snapshot();
        if !current.is_stub() && current.revision == self.cache.revision() {
            return Ok(current);
        }
        let snapshot = Arc::new(self.cache.snapshot());
        self.published.send_replace(snapshot.clone());
        self.publisher.write(&snapshot).await?;
        debug!(generation = snapshot.generation, components = snapshot.len(), "published snapshot");
        Ok(snapshot)
    }
}

/// Store key: option digest plus the identities of the analyzer and the
/// transform steps actually in use.
fn store_digest(options_digest: u64, analyzer_key: &str, pipeline_key: &str) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(&options_digest.to_le_bytes());
    hasher.update(analyzer_key.as_bytes());
    hasher.update(&[0]);
    hasher.update(pipeline_key.as_bytes());
    hasher.digest()
}
