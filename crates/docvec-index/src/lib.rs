//! Indexing pipeline with blue/green collection refresh.

pub mod pipeline;
pub mod retry;

pub use pipeline::{
    CleanupStatus, IndexReport, IndexingPipeline, PipelineOptions, PopulateReport, RefreshReport, Verification,
    VECTOR_DISTANCE,
};
pub use retry::RetryPolicy;
