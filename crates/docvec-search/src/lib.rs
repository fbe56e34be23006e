//! Read path: embed a query, search the active collection, optionally
//! re-rank by keyword overlap.

use std::sync::Arc;
use tracing::debug;

use docvec_core::traits::{VectorEmbedder, VectorSearchService};
use docvec_core::types::{SearchConfig, SearchResult};
use docvec_core::{CollectionState, Result};

pub mod rerank;

pub use rerank::{apply_keyword_boost, extract_keywords};

pub struct SearchOrchestrator {
    embedder: Arc<dyn VectorEmbedder>,
    search: Arc<dyn VectorSearchService>,
    state: Arc<CollectionState>,
    config: SearchConfig,
}

impl SearchOrchestrator {
    pub fn new(
        embedder: Arc<dyn VectorEmbedder>,
        search: Arc<dyn VectorSearchService>,
        state: Arc<CollectionState>,
        config: SearchConfig,
    ) -> Self {
        Self { embedder, search, state, config }
    }

    pub fn config(&self) -> &SearchConfig { &self.config }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with(query, self.config).await
    }

    /// Search with per-call overrides of limit and boosting.
    pub async fn search_with(&self, query: &str, config: SearchConfig) -> Result<Vec<SearchResult>> {
        // Resolved per call so a refresh is picked up immediately.
        let collection = self.state.current_collection();
        let vector = self.embedder.embed(query).await?;
        let results = self.search.search(&collection, &vector, config.result_limit).await?;
        debug!(collection = %collection, hits = results.len(), boost = config.keyword_boost, "search");
        if config.keyword_boost {
            Ok(apply_keyword_boost(results, query, config.keyword_boost_weight))
        } else {
            Ok(results)
        }
    }
}
