//! Embedding runtimes behind the `VectorEmbedder` capability.
//!
//! `LocalEmbedder` runs an XLM-RoBERTa model through candle on a blocking
//! thread; `FakeEmbedder` is a fast deterministic stand-in for tests and
//! development (`use_fake_embeddings = true` / `APP_USE_FAKE_EMBEDDINGS=1`).

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use docvec_core::config::Settings;
use docvec_core::traits::VectorEmbedder;
use docvec_core::{Error, Result};

pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use fake::FakeEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

pub struct LocalEmbedder {
    model: Arc<EmbeddingModel>,
}

impl LocalEmbedder {
    pub fn new(model: EmbeddingModel) -> Self { Self { model: Arc::new(model) } }

    pub fn dim(&self) -> usize { self.model.dim() }
}

#[async_trait]
impl VectorEmbedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let text = text.to_owned();
        tokio::task::spawn_blocking(move || model.embed_text(&text))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))?
            .map_err(|e| Error::Embedding(format!("{e:#}")))
    }
}

/// Build the embedder selected by `settings`. The model's dimensionality must
/// match `vector_size`, otherwise collections would be created with the wrong
/// shape.
pub fn default_embedder(settings: &Settings) -> Result<Arc<dyn VectorEmbedder>> {
    if settings.use_fake_embeddings {
        info!(dim = settings.vector_size, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.vector_size)));
    }
    let dir = model::resolve_model_dir(settings.model_dir.as_deref())
        .map_err(|e| Error::Embedding(format!("{e:#}")))?;
    let model = EmbeddingModel::load(&dir).map_err(|e| Error::Embedding(format!("{e:#}")))?;
    if model.dim() != settings.vector_size {
        return Err(Error::InvalidConfig(format!(
            "vector_size is {} but the model produces {}-dimensional embeddings",
            settings.vector_size,
            model.dim()
        )));
    }
    Ok(Arc::new(LocalEmbedder::new(model)))
}
