//! Capabilities the pipeline and the search orchestrator depend on.
//!
//! Each trait is technology-agnostic: the workspace ships a LanceDB-backed
//! store, a candle embedder and a filesystem source, but any implementation
//! can be injected.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CollectionInfo, CollectionSpec, Point, SearchResult, SourceItem};

/// Produces a fresh snapshot of the corpus on every call.
pub trait SourceProcessor: Send + Sync {
    fn process(&self) -> Result<Vec<SourceItem>>;
}

/// Text to fixed-length vector. Query and corpus must share one embedder.
#[async_trait]
pub trait VectorEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait VectorCollectionService: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool>;
    async fn create(&self, name: &str, spec: CollectionSpec) -> Result<()>;
    async fn info(&self, name: &str) -> Result<CollectionInfo>;
    async fn delete(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait VectorStorageService: Send + Sync {
    /// Insert or overwrite points by id.
    async fn upsert(&self, name: &str, points: &[Point]) -> Result<()>;
}

#[async_trait]
pub trait VectorSearchService: Send + Sync {
    async fn search(&self, name: &str, query: &[f32], limit: usize) -> Result<Vec<SearchResult>>;
}

/// Durable single-value record backing `CollectionState`.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read(&self) -> Result<Option<String>>;
    async fn write(&self, value: &str) -> Result<()>;
}
