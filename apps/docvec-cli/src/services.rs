//! Lazily built services shared by the subcommands.
//!
//! Model loading and database connections are expensive, so each is built
//! on first use and reused afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use docvec_core::config::{Settings, StateBackend};
use docvec_core::lazy::SharedService;
use docvec_core::source::FileSourceProcessor;
use docvec_core::state::JsonFileStateStore;
use docvec_core::traits::{StateStore, VectorEmbedder};
use docvec_core::{CollectionState, Error, Result};
use docvec_embed::default_embedder;
use docvec_index::{IndexingPipeline, PipelineOptions};
use docvec_search::SearchOrchestrator;
use docvec_vector::{LanceStateStore, LanceVectorStore};

pub struct App {
    settings: Settings,
    base: PathBuf,
    embedder: SharedService<Arc<dyn VectorEmbedder>>,
    store: SharedService<LanceVectorStore>,
    state: SharedService<CollectionState>,
    pipeline: SharedService<IndexingPipeline>,
}

impl App {
    /// `base` is the directory relative paths in `settings` resolve against.
    pub fn new(settings: Settings, base: &Path) -> Self {
        Self {
            settings,
            base: base.to_path_buf(),
            embedder: SharedService::new(),
            store: SharedService::new(),
            state: SharedService::new(),
            pipeline: SharedService::new(),
        }
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub async fn embedder(&self) -> Result<Arc<dyn VectorEmbedder>> {
        let shared = self
            .embedder
            .get_or_try_init(|| async {
                let settings = self.settings.clone();
                tokio::task::spawn_blocking(move || default_embedder(&settings))
                    .await
                    .map_err(|e| Error::Embedding(format!("model loading task failed: {e}")))?
            })
            .await?;
        Ok(Arc::clone(&*shared))
    }

    pub async fn store(&self) -> Result<Arc<LanceVectorStore>> {
        self.store
            .get_or_try_init(|| async {
                let dir = self.settings.db_dir(&self.base);
                std::fs::create_dir_all(&dir)?;
                debug!(dir = %dir.display(), "opening vector store");
                LanceVectorStore::open(&dir).await
            })
            .await
    }

    pub async fn state(&self) -> Result<Arc<CollectionState>> {
        self.state
            .get_or_try_init(|| async {
                let store: Arc<dyn StateStore> = match self.settings.state_backend {
                    StateBackend::File => Arc::new(JsonFileStateStore::new(self.settings.state_file(&self.base))),
                    StateBackend::Lance => Arc::new(LanceStateStore::new(self.store().await?.connection().clone())),
                };
                CollectionState::load(store, self.settings.current_collection.as_deref()).await
            })
            .await
    }

    pub async fn pipeline(&self) -> Result<Arc<IndexingPipeline>> {
        self.pipeline
            .get_or_try_init(|| async {
                let store = self.store().await?;
                let options = PipelineOptions { show_progress: true, ..PipelineOptions::from_settings(&self.settings)? };
                IndexingPipeline::new(
                    Arc::new(FileSourceProcessor::new(self.settings.source_dir())),
                    self.embedder().await?,
                    store.clone(),
                    store,
                    self.state().await?,
                    options,
                )
            })
            .await
    }

    pub async fn searcher(&self) -> Result<SearchOrchestrator> {
        Ok(SearchOrchestrator::new(
            self.embedder().await?,
            self.store().await?,
            self.state().await?,
            self.settings.search_config()?,
        ))
    }
}
