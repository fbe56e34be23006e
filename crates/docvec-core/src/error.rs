use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot reach {backend}: {message}")]
    Connectivity { backend: &'static str, message: String },

    #[error("Failed to upload batch {}/{total_batches} after {attempts} attempts: {source}", .batch + 1)]
    BatchUpsert {
        batch: usize,
        total_batches: usize,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True when the failure means a backend could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Connectivity { .. } => true,
            Error::BatchUpsert { source, .. } => source.is_connectivity(),
            _ => false,
        }
    }

    /// True when a search or lookup targeted a collection that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::CollectionNotFound(_))
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
