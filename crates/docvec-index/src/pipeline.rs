use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use docvec_core::config::Settings;
use docvec_core::traits::{SourceProcessor, VectorCollectionService, VectorEmbedder, VectorStorageService};
use docvec_core::types::{CollectionSpec, CollectionVersions, Distance, Point, SourceItem};
use docvec_core::{CollectionState, Error, Result};

use crate::retry::RetryPolicy;

/// Collections are always created with cosine distance.
pub const VECTOR_DISTANCE: Distance = Distance::Cosine;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub vector_size: usize,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub versions: CollectionVersions,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            vector_size: 1024,
            batch_size: 250,
            retry: RetryPolicy::default(),
            versions: CollectionVersions::default(),
            show_progress: false,
        }
    }
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            vector_size: settings.vector_size,
            batch_size: settings.batch_size,
            retry: RetryPolicy::new(settings.max_attempts, Duration::from_millis(settings.retry_delay_ms)),
            versions: settings.collection_versions()?,
            show_progress: false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub requires_population: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateReport {
    pub collection: String,
    pub points: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub collection: String,
    /// `None` when the collection already held points.
    pub populated: Option<PopulateReport>,
}

/// Outcome of dropping the superseded collection after a cutover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    Deleted,
    Absent,
    /// Cutover already happened; the old collection is left behind.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub previous: String,
    pub current: String,
    pub populated: Option<PopulateReport>,
    pub cleanup: CleanupStatus,
}

/// Write path: source → embeddings → batched upserts, plus blue/green
/// refresh between the two configured collection versions.
pub struct IndexingPipeline {
    source: Arc<dyn SourceProcessor>,
    embedder: Arc<dyn VectorEmbedder>,
    collections: Arc<dyn VectorCollectionService>,
    storage: Arc<dyn VectorStorageService>,
    state: Arc<CollectionState>,
    options: PipelineOptions,
}

impl IndexingPipeline {
    pub fn new(
        source: Arc<dyn SourceProcessor>,
        embedder: Arc<dyn VectorEmbedder>,
        collections: Arc<dyn VectorCollectionService>,
        storage: Arc<dyn VectorStorageService>,
        state: Arc<CollectionState>,
        options: PipelineOptions,
    ) -> Result<Self> {
        if options.vector_size == 0 {
            return Err(Error::InvalidConfig("vector_size must be positive".into()));
        }
        if options.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        Ok(Self { source, embedder, collections, storage, state, options })
    }

    pub fn state(&self) -> &Arc<CollectionState> { &self.state }

    pub fn options(&self) -> &PipelineOptions { &self.options }

    /// Make sure the active collection exists and holds data. Safe to call
    /// repeatedly: a populated collection is left untouched.
    pub async fn index(&self) -> Result<IndexReport> {
        let _guard = self.state.writer_lock().await;
        let collection = self.state.current_collection();
        info!(collection = %collection, "initializing");
        let populated = if self.verify_collection(&collection).await?.requires_population {
            Some(self.populate(&collection).await?)
        } else {
            info!(collection = %collection, "collection already populated, skipping");
            None
        };
        Ok(IndexReport { collection, populated })
    }

    /// Alias of [`IndexingPipeline::index`].
    pub async fn init(&self) -> Result<IndexReport> {
        self.index().await
    }

    /// Create `name` if missing. A new or empty collection needs population.
    #[instrument(skip(self))]
    pub async fn verify_collection(&self, name: &str) -> Result<Verification> {
        if !self.collections.exists(name).await? {
            let spec = CollectionSpec { vector_size: self.options.vector_size, distance: VECTOR_DISTANCE };
            self.collections.create(name, spec).await?;
            return Ok(Verification { requires_population: true });
        }
        let info = self.collections.info(name).await?;
        info!(collection = name, points = info.points_count, "collection exists");
        Ok(Verification { requires_population: info.points_count == 0 })
    }

    /// Embed a fresh snapshot of the source and upsert it in batches.
    #[instrument(skip(self))]
    pub async fn populate(&self, collection: &str) -> Result<PopulateReport> {
        info!(collection, "starting population");
        let source = Arc::clone(&self.source);
        let items = tokio::task::spawn_blocking(move || source.process())
            .await
            .map_err(|e| Error::Backend(format!("source task failed: {e}")))??;
        let points = self.generate_points(items).await?;

        let batch_size = self.options.batch_size;
        let total_batches = points.len().div_ceil(batch_size);
        for (batch, chunk) in points.chunks(batch_size).enumerate() {
            self.options
                .retry
                .run("batch upsert", || self.storage.upsert(collection, chunk))
                .await
                .map_err(|(attempts, source)| Error::BatchUpsert {
                    batch,
                    total_batches,
                    attempts,
                    source: Box::new(source),
                })?;
            let start = batch * batch_size;
            info!(collection, "batch {}/{}: {} - {}", batch + 1, total_batches, start, start + chunk.len() - 1);
        }
        info!(collection, points = points.len(), "population complete");
        Ok(PopulateReport { collection: collection.to_string(), points: points.len(), batches: total_batches })
    }

    /// Build the alternate collection, switch to it, then drop the old one.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let _guard = self.state.writer_lock().await;
        let previous = self.state.current_collection();
        let current = self.options.versions.alternate(&previous).to_string();
        info!(from = %previous, to = %current, "refreshing");

        // A leftover alternate is an orphan from a failed cleanup or an
        // interrupted populate; never cut over to it.
        if self.collections.exists(&current).await? {
            warn!(collection = %current, "dropping leftover collection before rebuild");
            self.collections.delete(&current).await?;
        }
        let populated = if self.verify_collection(&current).await?.requires_population {
            Some(self.populate(&current).await?)
        } else {
            None
        };
        self.state.update_current_collection(&current).await?;
        let cleanup = self.drop_previous(&previous).await;
        Ok(RefreshReport { previous, current, populated, cleanup })
    }

    async fn drop_previous(&self, previous: &str) -> CleanupStatus {
        let outcome = match self.collections.exists(previous).await {
            Ok(false) => return CleanupStatus::Absent,
            Ok(true) => self.collections.delete(previous).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => CleanupStatus::Deleted,
            Err(e) => {
                warn!(collection = previous, error = %e, "could not delete previous collection");
                CleanupStatus::Failed(e.to_string())
            }
        }
    }

    async fn generate_points(&self, items: Vec<SourceItem>) -> Result<Vec<Point>> {
        let pb = progress_bar(items.len(), self.options.show_progress);
        let result = self.embed_items(items, &pb).await;
        finish_progress(&pb, &result);
        let points = result?;
        debug!(points = points.len(), "embedded source items");
        Ok(points)
    }

    async fn embed_items(&self, items: Vec<SourceItem>, pb: &ProgressBar) -> Result<Vec<Point>> {
        let mut points = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let vector = self.embedder.embed(&item.content).await?;
            if vector.len() != self.options.vector_size {
                return Err(Error::Embedding(format!(
                    "{} produced a {}-dimensional embedding, expected {}",
                    item.source_location,
                    vector.len(),
                    self.options.vector_size
                )));
            }
            points.push(Point { id: i as u64, vector, payload: item.into() });
            pb.inc(1);
        }
        Ok(points)
    }
}

/// A failed pass leaves the bar where it stopped instead of jumping to 100%.
fn finish_progress<T>(pb: &ProgressBar, result: &Result<T>) {
    match result {
        Ok(_) => pb.finish_and_clear(),
        Err(_) => pb.abandon(),
    }
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items ({percent}%)")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
