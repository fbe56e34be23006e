use async_trait::async_trait;
use lancedb::Connection;

use docvec_core::traits::StateStore;
use docvec_core::Result;

use crate::table::{get_meta, set_meta};

pub const META_TABLE: &str = "docvec_meta";
pub const CURRENT_COLLECTION_KEY: &str = "current_collection";

/// Keeps the active collection pointer in a key/value table inside the same
/// LanceDB database as the collections.
pub struct LanceStateStore {
    db: Connection,
    table: String,
}

impl LanceStateStore {
    pub fn new(db: Connection) -> Self {
        Self { db, table: META_TABLE.to_string() }
    }

    pub fn with_table(db: Connection, table: impl Into<String>) -> Self {
        Self { db, table: table.into() }
    }
}

#[async_trait]
impl StateStore for LanceStateStore {
    async fn read(&self) -> Result<Option<String>> {
        get_meta(&self.db, &self.table, CURRENT_COLLECTION_KEY).await
    }

    async fn write(&self, value: &str) -> Result<()> {
        set_meta(&self.db, &self.table, CURRENT_COLLECTION_KEY, value).await
    }
}
