//! Metadata cache keyed by component path.
//!
//! Each slot remembers the last completed outcome, the fingerprint of the
//! source it was computed from (`None` once invalidated), and at most one
//! in-flight analysis. Callers that find an analysis in flight await the
//! same shared future instead of starting another.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};
use xxhash_rust::xxh3::Xxh3;

use crate::analyzer::adapter::AnalyzerAdapter;
use crate::analyzer::metadata::ComponentMetadata;
use crate::error::{AnalyzerError, AnalyzerUnavailable, EntryFailure, FailureKind};
use crate::publish::{PublishedSnapshot, SnapshotEntry};
use crate::registry::{ComponentIdentity, Registry};
use crate::store::MetadataStore;
use crate::transform::TransformPipeline;

/// XXH3-128 of a component's resolved path and raw source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    pub fn compute(path: &Path, source: &str) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(source.as_bytes());
        Fingerprint(hasher.digest128())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:032x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        u128::from_str_radix(&hex, 16)
            .map(Fingerprint)
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Resolved(Arc<ComponentMetadata>),
    Failed(EntryFailure),
}

/// A completed analysis of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub identity: ComponentIdentity,
    /// `None` when the source could not be read.
    pub fingerprint: Option<Fingerprint>,
    pub outcome: EntryOutcome,
}

impl CacheEntry {
    pub fn metadata(&self) -> Option<&Arc<ComponentMetadata>> {
        match &self.outcome {
            EntryOutcome::Resolved(meta) => Some(meta),
            EntryOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EntryFailure> {
        match &self.outcome {
            EntryOutcome::Resolved(_) => None,
            EntryOutcome::Failed(failure) => Some(failure),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryStatus {
    Unknown,
    Pending,
    Resolved,
    Error,
    Stale,
}

type AnalysisFuture = Shared<BoxFuture<'static, Result<CacheEntry, AnalyzerUnavailable>>>;

struct InFlight {
    task: u64,
    fingerprint: Fingerprint,
    /// Set when the source changed while this analysis was running; the
    /// result is kept but stored as stale.
    invalidated: bool,
    future: AnalysisFuture,
}

#[derive(Default)]
struct Slot {
    fingerprint: Option<Fingerprint>,
    last: Option<CacheEntry>,
    in_flight: Option<InFlight>,
}

impl Slot {
    fn status(&self) -> EntryStatus {
        if self.in_flight.is_some() {
            return EntryStatus::Pending;
        }
        match (&self.last, self.fingerprint) {
            (None, _) => EntryStatus::Unknown,
            (Some(_), None) => EntryStatus::Stale,
            (Some(entry), Some(_)) => match entry.outcome {
                EntryOutcome::Resolved(_) => EntryStatus::Resolved,
                EntryOutcome::Failed(_) => EntryStatus::Error,
            },
        }
    }
}

enum Lookup {
    Hit(CacheEntry),
    Started(AnalysisFuture),
    Joined(AnalysisFuture),
}

struct CacheInner {
    registry: Arc<Registry>,
    entries: DashMap<PathBuf, Slot>,
    pipeline: TransformPipeline,
    adapter: AnalyzerAdapter,
    store: Option<MetadataStore>,
    next_task: AtomicU64,
    /// Bumped whenever a slot receives a new outcome.
    revision: AtomicU64,
    generation: AtomicU64,
    analyses: AtomicU64,
}

#[derive(Clone)]
pub struct MetadataCache {
    inner: Arc<CacheInner>,
}

impl MetadataCache {
    pub fn new(
        registry: Arc<Registry>,
        pipeline: TransformPipeline,
        adapter: AnalyzerAdapter,
        store: Option<MetadataStore>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                registry,
                entries: DashMap::new(),
                pipeline,
                adapter,
                store,
                next_task: AtomicU64::new(1),
                revision: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                analyses: AtomicU64::new(0),
            }),
        }
    }

    /// Entry for `identity`, analyzing it if absent or stale.
    ///
    /// Only [`AnalyzerUnavailable`] is returned as an error; every other
    /// failure is recorded in the entry.
    pub async fn get(&self, identity: &ComponentIdentity) -> Result<CacheEntry, AnalyzerUnavailable> {
        let source = match tokio::fs::read_to_string(identity.path()).await {
            Ok(source) => source,
            Err(err) => return Ok(self.record_source_failure(identity, &err)),
        };
        let fingerprint = Fingerprint::compute(identity.path(), &source);

        loop {
            match self.lookup(identity, fingerprint, &source) {
                Lookup::Hit(entry) => return Ok(entry),
                Lookup::Started(future) => return future.await,
                Lookup::Joined(future) => {
                    let entry = future.await?;
                    if entry.fingerprint == Some(fingerprint) {
                        return Ok(entry);
                    }
                    debug!(component = identity.name(), "joined analysis was for older source");
                }
            }
        }
    }

    fn lookup(&self, identity: &ComponentIdentity, fingerprint: Fingerprint, source: &str) -> Lookup {
        let mut slot = self
            .inner
            .entries
            .entry(identity.path().to_path_buf())
            .or_default();

        if let Some(in_flight) = &slot.in_flight {
            return Lookup::Joined(in_flight.future.clone());
        }
        if slot.fingerprint == Some(fingerprint) {
            if let Some(last) = slot.last.as_ref().filter(|e| e.identity == *identity) {
                return Lookup::Hit(last.clone());
            }
        }

        let task = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
        let future = run_analysis(
            self.inner.clone(),
            identity.clone(),
            source.to_string(),
            fingerprint,
            task,
        )
        .boxed()
        .shared();
        slot.in_flight = Some(InFlight {
            task,
            fingerprint,
            invalidated: false,
            future: future.clone(),
        });
        Lookup::Started(future)
    }

    fn record_source_failure(&self, identity: &ComponentIdentity, err: &std::io::Error) -> CacheEntry {
        warn!(component = identity.name(), path = %identity.path().display(), error = %err, "cannot read component source");
        let entry = CacheEntry {
            identity: identity.clone(),
            fingerprint: None,
            outcome: EntryOutcome::Failed(EntryFailure::new(
                FailureKind::Source,
                format!("cannot read {}: {err}", identity.path().display()),
            )),
        };
        let mut slot = self
            .inner
            .entries
            .entry(identity.path().to_path_buf())
            .or_default();
        if slot.in_flight.is_none() {
            slot.last = Some(entry.clone());
            slot.fingerprint = None;
            self.inner.revision.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    /// Mark stale without recomputing. An analysis already in flight is not
    /// cancelled; its result is stored as stale.
    pub fn invalidate(&self, path: &Path) {
        if let Some(mut slot) = self.inner.entries.get_mut(path) {
            slot.fingerprint = None;
            if let Some(in_flight) = slot.in_flight.as_mut() {
                in_flight.invalidated = true;
            }
        }
    }

    pub fn invalidate_all(&self) {
        for mut slot in self.inner.entries.iter_mut() {
            slot.fingerprint = None;
            if let Some(in_flight) = slot.in_flight.as_mut() {
                in_flight.invalidated = true;
            }
        }
    }

    /// Forget a component that left the registry, including its persisted
    /// entry.
    pub fn remove(&self, path: &Path) {
        if self.inner.entries.remove(path).is_some() {
            self.inner.revision.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(store) = &self.inner.store {
            store.remove(path);
        }
    }

    pub fn status(&self, path: &Path) -> EntryStatus {
        self.inner
            .entries
            .get(path)
            .map(|slot| slot.status())
            .unwrap_or(EntryStatus::Unknown)
    }

    /// Number of analyzer invocations so far.
    pub fn analyses(&self) -> u64 {
        self.inner.analyses.load(Ordering::Relaxed)
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Relaxed)
    }

    /// Completed entries in registry order. Components never analyzed are
    /// absent.
    pub fn snapshot(&self) -> PublishedSnapshot {
        let revision = self.revision();
        let mut components = IndexMap::new();
        for identity in self.inner.registry.list() {
            let Some(slot) = self.inner.entries.get(identity.path()) else {
                continue;
            };
            let Some(last) = &slot.last else { continue };
            components.insert(
                identity.name().to_string(),
                SnapshotEntry {
                    identity: identity.clone(),
                    status: slot.status(),
                    outcome: last.outcome.clone(),
                },
            );
        }
        PublishedSnapshot {
            generation: self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1,
            revision,
            components,
        }
    }
}

async fn run_analysis(
    inner: Arc<CacheInner>,
    identity: ComponentIdentity,
    source: String,
    fingerprint: Fingerprint,
    task: u64,
) -> Result<CacheEntry, AnalyzerUnavailable> {
    let computed = AssertUnwindSafe(inner.compute(&identity, source, fingerprint))
        .catch_unwind()
        .await;
    let result = match computed {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            warn!(component = identity.name(), reason = %reason, "analyzer panicked");
            Ok(CacheEntry {
                identity: identity.clone(),
                fingerprint: Some(fingerprint),
                outcome: EntryOutcome::Failed(EntryFailure::new(
                    FailureKind::Panic,
                    format!("analyzer panicked: {reason}"),
                )),
            })
        }
    };
    inner.finish(&identity, task, result.as_ref().ok());
    result
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl CacheInner {
    async fn compute(
        &self,
        identity: &ComponentIdentity,
        source: String,
        fingerprint: Fingerprint,
    ) -> Result<CacheEntry, AnalyzerUnavailable> {
        let entry = |outcome| CacheEntry {
            identity: identity.clone(),
            fingerprint: Some(fingerprint),
            outcome,
        };

        if let Some(store) = &self.store {
            if let Some(meta) = store.load(identity.path(), fingerprint).await {
                debug!(component = identity.name(), "restored from persistent store");
                return Ok(entry(EntryOutcome::Resolved(Arc::new(meta))));
            }
        }

        let transformed = match self.pipeline.apply(identity, &source) {
            Ok(code) => code,
            Err(err) => {
                warn!(component = identity.name(), error = %err, "transform failed");
                return Ok(entry(EntryOutcome::Failed(err.into())));
            }
        };

        self.analyses.fetch_add(1, Ordering::Relaxed);
        match self.adapter.analyze(identity, transformed).await {
            Ok(meta) => {
                if let Some(store) = &self.store {
                    if let Err(err) = store.save(identity.path(), fingerprint, &meta).await {
                        warn!(component = identity.name(), error = %err, "cannot persist metadata");
                    }
                }
                Ok(entry(EntryOutcome::Resolved(Arc::new(meta))))
            }
            Err(AnalyzerError::Unavailable(reason)) => Err(AnalyzerUnavailable { reason }),
            Err(err @ AnalyzerError::Timeout(_)) => {
                warn!(component = identity.name(), error = %err, "analysis failed");
                Ok(entry(EntryOutcome::Failed(EntryFailure::new(
                    FailureKind::Timeout,
                    err.to_string(),
                ))))
            }
            Err(AnalyzerError::Parse(reason)) => {
                warn!(component = identity.name(), reason = %reason, "analysis failed");
                Ok(entry(EntryOutcome::Failed(EntryFailure::new(
                    FailureKind::Parse,
                    reason,
                ))))
            }
        }
    }

    /// Store the outcome of task `task` unless the slot moved on (removed,
    /// or superseded).
    fn finish(&self, identity: &ComponentIdentity, task: u64, outcome: Option<&CacheEntry>) {
        let Some(mut slot) = self.entries.get_mut(identity.path()) else {
            return;
        };
        let (fingerprint, invalidated) = match &slot.in_flight {
            Some(in_flight) if in_flight.task == task => (in_flight.fingerprint, in_flight.invalidated),
            _ => return,
        };
        slot.in_flight = None;
        if let Some(entry) = outcome {
            slot.last = Some(entry.clone());
            slot.fingerprint = if invalidated { None } else { Some(fingerprint) };
            self.revision.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::adapter::{AnalyzeRequest, Analyzer};
    use crate::config::EngineOptions;
    use crate::registry::ComponentDescriptor;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Echoes the first line of the source as the single prop's type.
    struct Counting {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl Analyzer for Counting {
        async fn analyze(&self, request: AnalyzeRequest) -> Result<Value, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let first = request.source.lines().next().unwrap_or_default().to_string();
            Ok(json!({ "props": [{ "name": "value", "type": first }] }))
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: Arc<Registry>,
        analyzer: Arc<Counting>,
        cache: MetadataCache,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)], delay: Duration) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let descriptors: Vec<ComponentDescriptor> = files
                .iter()
                .map(|(name, source)| {
                    let path = dir.path().join(format!("{name}.vue"));
                    std::fs::write(&path, source).unwrap();
                    ComponentDescriptor::new(*name, path)
                })
                .collect();
            let registry = Arc::new(Registry::new(vec![], false));
            registry.register(&descriptors);
            let analyzer = Arc::new(Counting {
                calls: AtomicUsize::new(0),
                delay,
            });
            let options = EngineOptions::default();
            let adapter = AnalyzerAdapter::new(analyzer.clone(), &options);
            let cache = MetadataCache::new(registry.clone(), TransformPipeline::default(), adapter, None);
            Self {
                _dir: dir,
                registry,
                analyzer,
                cache,
            }
        }

        fn identity(&self, name: &str) -> ComponentIdentity {
            self.registry.find_by_name(name).unwrap()
        }

        fn calls(&self) -> usize {
            self.analyzer.calls.load(Ordering::SeqCst)
        }
    }

    fn prop_type(entry: &CacheEntry) -> String {
        entry.metadata().unwrap().props.as_ref().unwrap()[0].ty.clone()
    }

    #[tokio::test]
    async fn unchanged_source_is_analyzed_once() {
        let fx = Fixture::new(&[("Button", "string")], Duration::ZERO);
        let id = fx.identity("Button");
        let first = fx.cache.get(&id).await.unwrap();
        let second = fx.cache.get(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.calls(), 1);
        assert_eq!(fx.cache.status(id.path()), EntryStatus::Resolved);
    }

    #[tokio::test]
    async fn changed_source_is_reanalyzed_once() {
        let fx = Fixture::new(&[("Button", "string"), ("Card", "number")], Duration::ZERO);
        let button = fx.identity("Button");
        let card = fx.identity("Card");
        fx.cache.get(&button).await.unwrap();
        fx.cache.get(&card).await.unwrap();

        std::fs::write(button.path(), "boolean").unwrap();
        let entry = fx.cache.get(&button).await.unwrap();
        assert_eq!(prop_type(&entry), "boolean");
        fx.cache.get(&button).await.unwrap();
        fx.cache.get(&card).await.unwrap();
        assert_eq!(fx.calls(), 3);
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_analysis() {
        let fx = Fixture::new(&[("Button", "string")], Duration::from_millis(50));
        let id = fx.identity("Button");
        let results = futures::future::join_all((0..8).map(|_| fx.cache.get(&id))).await;
        assert_eq!(fx.calls(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert_eq!(result.as_ref().unwrap(), first);
        }
    }

    #[tokio::test]
    async fn invalidate_marks_stale_and_recomputes() {
        let fx = Fixture::new(&[("Button", "string")], Duration::ZERO);
        let id = fx.identity("Button");
        fx.cache.get(&id).await.unwrap();
        fx.cache.invalidate(id.path());
        assert_eq!(fx.cache.status(id.path()), EntryStatus::Stale);
        fx.cache.get(&id).await.unwrap();
        assert_eq!(fx.calls(), 2);
        assert_eq!(fx.cache.status(id.path()), EntryStatus::Resolved);
    }

    #[tokio::test]
    async fn invalidation_during_flight_keeps_result_as_stale() {
        let fx = Fixture::new(&[("Button", "string")], Duration::from_millis(150));
        let id = fx.identity("Button");
        let cache = fx.cache.clone();
        let path = id.path().to_path_buf();
        let (entry, ()) = tokio::join!(fx.cache.get(&id), async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert_eq!(cache.status(&path), EntryStatus::Pending);
            cache.invalidate(&path);
        });
        assert_eq!(prop_type(&entry.unwrap()), "string");
        assert_eq!(fx.cache.status(id.path()), EntryStatus::Stale);
        fx.cache.get(&id).await.unwrap();
        assert_eq!(fx.calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_all_recomputes_every_component_once() {
        let fx = Fixture::new(&[("Button", "string"), ("Card", "number")], Duration::ZERO);
        let button = fx.identity("Button");
        let card = fx.identity("Card");
        fx.cache.get(&button).await.unwrap();
        fx.cache.get(&card).await.unwrap();

        fx.cache.invalidate_all();
        assert_eq!(fx.cache.status(button.path()), EntryStatus::Stale);
        assert_eq!(fx.cache.status(card.path()), EntryStatus::Stale);
        fx.cache.get(&button).await.unwrap();
        fx.cache.get(&card).await.unwrap();
        fx.cache.get(&card).await.unwrap();
        assert_eq!(fx.calls(), 4);
        assert_eq!(fx.cache.analyses(), 4);
    }

    /// Panics on its first call, answers normally afterwards.
    struct PanicOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for PanicOnce {
        async fn analyze(&self, _request: AnalyzeRequest) -> Result<Value, AnalyzerError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("checker crashed");
            }
            Ok(json!({ "props": [{ "name": "value", "type": "string" }] }))
        }
    }

    #[tokio::test]
    async fn analyzer_panic_becomes_an_entry_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Button.vue");
        std::fs::write(&path, "<template />").unwrap();
        let registry = Arc::new(Registry::new(vec![], false));
        registry.register(&[ComponentDescriptor::new("Button", path)]);
        let analyzer = Arc::new(PanicOnce {
            calls: AtomicUsize::new(0),
        });
        let adapter = AnalyzerAdapter::new(analyzer.clone(), &EngineOptions::default());
        let cache = MetadataCache::new(registry.clone(), TransformPipeline::default(), adapter, None);
        let id = registry.find_by_name("Button").unwrap();

        let entry = cache.get(&id).await.unwrap();
        let failure = entry.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Panic);
        assert!(failure.reason.contains("checker crashed"));
        assert_eq!(cache.status(id.path()), EntryStatus::Error);

        cache.invalidate(id.path());
        let entry = cache.get(&id).await.unwrap();
        assert!(entry.metadata().is_some());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persisted_metadata_skips_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Button.vue");
        std::fs::write(&path, "string").unwrap();
        let store_dir = dir.path().join("store");

        let open = || {
            let registry = Arc::new(Registry::new(vec![], false));
            registry.register(&[ComponentDescriptor::new("Button", path.clone())]);
            let analyzer = Arc::new(Counting {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            });
            let adapter = AnalyzerAdapter::new(analyzer.clone(), &EngineOptions::default());
            let store = MetadataStore::open(&store_dir, 1).unwrap();
            let cache = MetadataCache::new(registry.clone(), TransformPipeline::default(), adapter, Some(store));
            (registry, analyzer, cache)
        };

        let (registry, first_analyzer, first) = open();
        let id = registry.find_by_name("Button").unwrap();
        first.get(&id).await.unwrap();
        assert_eq!(first_analyzer.calls.load(Ordering::SeqCst), 1);

        let (registry, second_analyzer, second) = open();
        let id = registry.find_by_name("Button").unwrap();
        let entry = second.get(&id).await.unwrap();
        assert_eq!(prop_type(&entry), "string");
        assert_eq!(second_analyzer.calls.load(Ordering::SeqCst), 0);

        second.remove(id.path());
        let (registry, third_analyzer, third) = open();
        let id = registry.find_by_name("Button").unwrap();
        third.get(&id).await.unwrap();
        assert_eq!(third_analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_source_is_an_error_entry() {
        let fx = Fixture::new(&[("Button", "string")], Duration::ZERO);
        let id = fx.identity("Button");
        std::fs::remove_file(id.path()).unwrap();
        let entry = fx.cache.get(&id).await.unwrap();
        assert_eq!(entry.failure().unwrap().kind, FailureKind::Source);
        assert_eq!(fx.calls(), 0);
    }

    #[tokio::test]
    async fn snapshot_follows_registry_order() {
        let fx = Fixture::new(&[("Zeta", "a"), ("Alpha", "b"), ("Mid", "c")], Duration::ZERO);
        fx.cache.get(&fx.identity("Mid")).await.unwrap();
        fx.cache.get(&fx.identity("Zeta")).await.unwrap();
        let snap = fx.cache.snapshot();
        assert_eq!(snap.components.keys().collect::<Vec<_>>(), vec!["Zeta", "Mid"]);
        assert_eq!(snap.generation, 1);
        assert_eq!(fx.cache.snapshot().generation, 2);
    }

    #[test]
    fn fingerprint_depends_on_path_and_content() {
        let a = Fingerprint::compute(Path::new("/a/A.vue"), "x");
        assert_eq!(a, Fingerprint::compute(Path::new("/a/A.vue"), "x"));
        assert_ne!(a, Fingerprint::compute(Path::new("/a/B.vue"), "x"));
        assert_ne!(a, Fingerprint::compute(Path::new("/a/A.vue"), "y"));
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(serde_json::from_str::<Fingerprint>(&json).unwrap(), a);
    }
}
