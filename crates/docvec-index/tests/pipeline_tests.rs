use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docvec_core::state::MemoryStateStore;
use docvec_core::traits::{SourceProcessor, VectorCollectionService, VectorEmbedder, VectorStorageService};
use docvec_core::types::{CollectionInfo, CollectionSpec, ContentType, Point, SourceItem, SourceType};
use docvec_core::{CollectionState, Error, Result};
use docvec_index::{CleanupStatus, IndexingPipeline, PipelineOptions, RetryPolicy};

const DIM: usize = 4;

struct VecSource(Vec<SourceItem>);

impl SourceProcessor for VecSource {
    fn process(&self) -> Result<Vec<SourceItem>> { Ok(self.0.clone()) }
}

fn items(n: usize) -> Vec<SourceItem> {
    (0..n)
        .map(|i| SourceItem {
            source_type: SourceType::File,
            source_location: format!("doc{i}.md"),
            content_type: ContentType::Markdown,
            content: format!("document number {i}"),
        })
        .collect()
}

struct LenEmbedder(usize);

#[async_trait]
impl VectorEmbedder for LenEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; self.0];
        if let Some(first) = v.first_mut() { *first = text.len() as f32; }
        Ok(v)
    }
}

#[derive(Default)]
struct MemoryStore {
    collections: Mutex<HashMap<String, (CollectionSpec, BTreeMap<u64, Point>)>>,
    upsert_failures: AtomicU32,
    upsert_calls: AtomicU32,
    batch_sizes: Mutex<Vec<usize>>,
    fail_delete: AtomicBool,
    // When set, every upsert records (target, active, active point count).
    watch: Mutex<Option<Arc<CollectionState>>>,
    seen: Mutex<Vec<(String, String, Option<usize>)>>,
}

impl MemoryStore {
    fn count(&self, name: &str) -> Option<usize> {
        self.collections.lock().unwrap().get(name).map(|(_, pts)| pts.len())
    }
}

#[async_trait]
impl VectorCollectionService for MemoryStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.lock().unwrap().contains_key(name))
    }

    async fn create(&self, name: &str, spec: CollectionSpec) -> Result<()> {
        self.collections.lock().unwrap().insert(name.to_string(), (spec, BTreeMap::new()));
        Ok(())
    }

    async fn info(&self, name: &str) -> Result<CollectionInfo> {
        self.count(name)
            .map(|points_count| CollectionInfo { points_count })
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Backend("delete refused".into()));
        }
        self.collections.lock().unwrap().remove(name);
        Ok(())
    }
}

#[async_trait]
impl VectorStorageService for MemoryStore {
    async fn upsert(&self, name: &str, points: &[Point]) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let watched = self.watch.lock().unwrap().clone();
        if let Some(state) = watched {
            let active = state.current_collection();
            let count = self.count(&active);
            self.seen.lock().unwrap().push((name.to_string(), active, count));
        }
        tokio::task::yield_now().await;
        let remaining = self.upsert_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.upsert_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Connectivity { backend: "mock", message: "connection reset".into() });
        }
        self.batch_sizes.lock().unwrap().push(points.len());
        let mut guard = self.collections.lock().unwrap();
        let (_, pts) = guard.get_mut(name).ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        for p in points {
            pts.insert(p.id, p.clone());
        }
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    state: Arc<CollectionState>,
    pipeline: Arc<IndexingPipeline>,
}

fn pipeline_over(
    store: &Arc<MemoryStore>,
    state: &Arc<CollectionState>,
    n_items: usize,
    batch_size: usize,
    embed_dim: usize,
) -> IndexingPipeline {
    let options = PipelineOptions {
        vector_size: DIM,
        batch_size,
        retry: RetryPolicy::new(10, Duration::ZERO),
        ..PipelineOptions::default()
    };
    IndexingPipeline::new(
        Arc::new(VecSource(items(n_items))),
        Arc::new(LenEmbedder(embed_dim)),
        store.clone(),
        store.clone(),
        state.clone(),
        options,
    )
    .unwrap()
}

async fn harness(n_items: usize, batch_size: usize, embed_dim: usize) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let state = Arc::new(
        CollectionState::load(Arc::new(MemoryStateStore::new(None)), Some("docs_v1")).await.unwrap(),
    );
    let pipeline = pipeline_over(&store, &state, n_items, batch_size, embed_dim);
    Harness { store, state, pipeline: Arc::new(pipeline) }
}

#[tokio::test]
async fn index_creates_and_populates_then_skips() {
    let h = harness(7, 3, DIM).await;

    let first = h.pipeline.index().await.unwrap();
    assert_eq!(first.collection, "docs_v1");
    let populated = first.populated.expect("fresh collection is populated");
    assert_eq!((populated.points, populated.batches), (7, 3));
    assert_eq!(*h.store.batch_sizes.lock().unwrap(), vec![3, 3, 1]);

    let second = h.pipeline.index().await.unwrap();
    assert!(second.populated.is_none());
    assert_eq!(h.store.count("docs_v1"), Some(7));
}

#[tokio::test]
async fn verify_collection_is_idempotent() {
    let h = harness(1, 10, DIM).await;
    assert!(h.pipeline.verify_collection("docs_v1").await.unwrap().requires_population);
    // Exists but empty: still needs data, and is not recreated.
    assert!(h.pipeline.verify_collection("docs_v1").await.unwrap().requires_population);
    h.pipeline.populate("docs_v1").await.unwrap();
    assert!(!h.pipeline.verify_collection("docs_v1").await.unwrap().requires_population);
    assert_eq!(h.store.count("docs_v1"), Some(1));
}

#[tokio::test]
async fn created_collection_uses_configured_size_and_cosine() {
    let h = harness(0, 10, DIM).await;
    h.pipeline.verify_collection("docs_v1").await.unwrap();
    let spec = h.store.collections.lock().unwrap()["docs_v1"].0;
    assert_eq!(spec.vector_size, DIM);
    assert_eq!(spec.distance, docvec_index::VECTOR_DISTANCE);
}

#[tokio::test]
async fn transient_upsert_failures_are_retried() {
    let h = harness(2, 10, DIM).await;
    h.store.upsert_failures.store(9, Ordering::SeqCst);
    let report = h.pipeline.index().await.unwrap();
    assert_eq!(report.populated.unwrap().points, 2);
    assert_eq!(h.store.upsert_calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn upsert_gives_up_after_ten_attempts() {
    let h = harness(5, 2, DIM).await;
    h.store.upsert_failures.store(10, Ordering::SeqCst);
    let err = h.pipeline.index().await.unwrap_err();
    match &err {
        Error::BatchUpsert { batch, total_batches, attempts, .. } => {
            assert_eq!((*batch, *total_batches, *attempts), (0, 3, 10));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("Failed to upload batch 1/3 after 10 attempts"));
    assert!(err.is_connectivity());
    assert_eq!(h.store.upsert_calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn refresh_swaps_to_alternate_and_drops_previous() {
    let h = harness(4, 250, DIM).await;
    h.pipeline.index().await.unwrap();

    let report = h.pipeline.refresh().await.unwrap();
    assert_eq!(report.previous, "docs_v1");
    assert_eq!(report.current, "docs_v2");
    assert_eq!(report.cleanup, CleanupStatus::Deleted);
    assert_eq!(h.state.current_collection(), "docs_v2");
    assert_eq!(h.store.count("docs_v2"), Some(4));
    assert_eq!(h.store.count("docs_v1"), None);

    let back = h.pipeline.refresh().await.unwrap();
    assert_eq!(back.current, "docs_v1");
    assert_eq!(h.state.current_collection(), "docs_v1");
}

#[tokio::test]
async fn refresh_without_previous_collection_reports_absent() {
    let h = harness(3, 250, DIM).await;
    let report = h.pipeline.refresh().await.unwrap();
    assert_eq!(report.current, "docs_v2");
    assert_eq!(report.cleanup, CleanupStatus::Absent);
    assert_eq!(report.populated.unwrap().points, 3);
}

#[tokio::test]
async fn failed_population_keeps_old_collection_active() {
    let h = harness(3, 250, DIM).await;
    h.pipeline.index().await.unwrap();
    h.store.upsert_failures.store(u32::MAX, Ordering::SeqCst);

    let err = h.pipeline.refresh().await.unwrap_err();
    assert!(matches!(err, Error::BatchUpsert { .. }), "{err}");
    assert_eq!(h.state.current_collection(), "docs_v1");
    assert_eq!(h.store.count("docs_v1"), Some(3));
}

#[tokio::test]
async fn cleanup_failure_is_soft() {
    let h = harness(2, 250, DIM).await;
    h.pipeline.index().await.unwrap();
    h.store.fail_delete.store(true, Ordering::SeqCst);

    let report = h.pipeline.refresh().await.unwrap();
    assert!(matches!(report.cleanup, CleanupStatus::Failed(ref reason) if reason.contains("delete refused")));
    assert_eq!(h.state.current_collection(), "docs_v2");
    assert_eq!(h.store.count("docs_v1"), Some(2));
}

#[tokio::test]
async fn refresh_rebuilds_leftover_alternate() {
    let h = harness(3, 250, DIM).await;
    h.pipeline.index().await.unwrap();
    h.store.fail_delete.store(true, Ordering::SeqCst);
    h.pipeline.refresh().await.unwrap();
    assert_eq!(h.store.count("docs_v1"), Some(3), "orphaned after failed cleanup");

    // Partial leftover: the next refresh must not treat it as populated.
    h.store.collections.lock().unwrap().get_mut("docs_v1").unwrap().1.remove(&0);
    h.store.fail_delete.store(false, Ordering::SeqCst);

    let report = h.pipeline.refresh().await.unwrap();
    assert_eq!(report.current, "docs_v1");
    assert_eq!(report.populated.map(|p| p.points), Some(3));
    assert_eq!(h.store.count("docs_v1"), Some(3));
    assert_eq!(report.cleanup, CleanupStatus::Deleted);
}

#[tokio::test]
async fn concurrent_refreshes_are_serialized() {
    let h = harness(2, 250, DIM).await;
    h.pipeline.index().await.unwrap();

    let (a, b) = tokio::join!(h.pipeline.refresh(), h.pipeline.refresh());
    let mut currents = vec![a.unwrap().current, b.unwrap().current];
    currents.sort();
    assert_eq!(currents, vec!["docs_v1".to_string(), "docs_v2".to_string()]);
    assert_eq!(h.state.current_collection(), "docs_v1");
    assert_eq!(h.store.count("docs_v1"), Some(2));
    assert_eq!(h.store.count("docs_v2"), None);
}

#[tokio::test]
async fn pipelines_sharing_state_do_not_race() {
    let h = harness(3, 1, DIM).await;
    h.pipeline.index().await.unwrap();
    let other = pipeline_over(&h.store, &h.state, 3, 1, DIM);

    let (a, b) = tokio::join!(h.pipeline.refresh(), other.refresh());
    let (a, b) = (a.unwrap(), b.unwrap());
    let mut transitions = vec![(a.previous, a.current), (b.previous, b.current)];
    transitions.sort();
    assert_eq!(
        transitions,
        vec![
            ("docs_v1".to_string(), "docs_v2".to_string()),
            ("docs_v2".to_string(), "docs_v1".to_string()),
        ]
    );
    assert_eq!(h.state.current_collection(), "docs_v1");
    assert_eq!(h.store.count("docs_v1"), Some(3));
    assert_eq!(h.store.count("docs_v2"), None);
}

#[tokio::test]
async fn cutover_only_exposes_complete_collections() {
    let h = harness(9, 2, DIM).await;
    h.pipeline.index().await.unwrap();
    *h.store.watch.lock().unwrap() = Some(h.state.clone());

    let done = AtomicBool::new(false);
    let reader = async {
        let mut reads = Vec::new();
        while !done.load(Ordering::SeqCst) {
            let active = h.state.current_collection();
            reads.push((active.clone(), h.store.count(&active)));
            tokio::task::yield_now().await;
        }
        reads
    };
    let writer = async {
        h.pipeline.refresh().await.unwrap();
        h.pipeline.refresh().await.unwrap();
        done.store(true, Ordering::SeqCst);
    };
    let (reads, ()) = tokio::join!(reader, writer);

    let seen = h.store.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 10, "one observation per batch across both refreshes");
    for (target, active, count) in &seen {
        assert_ne!(target, active, "collection under population was active");
        assert_eq!(*count, Some(9), "active collection {active} was incomplete");
    }
    assert!(reads.len() > 1);
    for (active, count) in &reads {
        assert_eq!(*count, Some(9), "reader saw incomplete {active}");
    }
    assert_eq!(h.state.current_collection(), "docs_v1");
}

#[tokio::test]
async fn embedding_width_mismatch_names_the_source() {
    let h = harness(2, 250, DIM + 1).await;
    let err = h.pipeline.index().await.unwrap_err();
    match err {
        Error::Embedding(msg) => assert!(msg.contains("doc0.md"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.store.upsert_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn zero_batch_size_is_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let state = Arc::new(CollectionState::load(Arc::new(MemoryStateStore::default()), Some("docs_v1")).await.unwrap());
        let store = Arc::new(MemoryStore::default());
        let options = PipelineOptions { batch_size: 0, ..PipelineOptions::default() };
        let res = IndexingPipeline::new(
            Arc::new(VecSource(vec![])),
            Arc::new(LenEmbedder(DIM)),
            store.clone(),
            store,
            state,
            options,
        );
        assert!(matches!(res, Err(Error::InvalidConfig(_))));
    });
}
