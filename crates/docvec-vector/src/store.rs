use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::path::Path;
use tracing::{debug, info};

use docvec_core::traits::{VectorCollectionService, VectorSearchService, VectorStorageService};
use docvec_core::types::{CollectionInfo, CollectionSpec, Distance, Point, SearchResult};
use docvec_core::{Error, Result};

use crate::schema::{batch_to_results, build_points_schema, points_to_batch, schema_distance, vector_dim};
use crate::table::{ensure_table, map_lance_err, open_db, table_exists};

/// Collections are LanceDB tables in one database directory.
#[derive(Clone)]
pub struct LanceVectorStore {
    db: Connection,
}

impl LanceVectorStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let db = open_db(path.to_string_lossy().as_ref()).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: Connection) -> Self { Self { db } }

    pub fn connection(&self) -> &Connection { &self.db }

    async fn table(&self, name: &str) -> Result<Table> {
        self.db.open_table(name).execute().await.map_err(map_lance_err)
    }
}

fn lance_distance(d: Distance) -> DistanceType {
    match d {
        Distance::Cosine => DistanceType::Cosine,
        Distance::Euclid => DistanceType::L2,
        Distance::Dot => DistanceType::Dot,
    }
}

#[async_trait]
impl VectorCollectionService for LanceVectorStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        table_exists(&self.db, name).await
    }

    async fn create(&self, name: &str, spec: CollectionSpec) -> Result<()> {
        let schema = build_points_schema(spec.vector_size, spec.distance)?;
        if !ensure_table(&self.db, name, schema).await? {
            return Err(Error::Backend(format!("collection '{name}' already exists")));
        }
        info!(collection = name, dim = spec.vector_size, distance = spec.distance.as_str(), "created collection");
        Ok(())
    }

    async fn info(&self, name: &str) -> Result<CollectionInfo> {
        let points_count = self.table(name).await?.count_rows(None).await.map_err(map_lance_err)?;
        Ok(CollectionInfo { points_count })
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.db.drop_table(name, &[]).await.map_err(map_lance_err)?;
        info!(collection = name, "dropped collection");
        Ok(())
    }
}

#[async_trait]
impl VectorStorageService for LanceVectorStore {
    async fn upsert(&self, name: &str, points: &[Point]) -> Result<()> {
        if points.is_empty() { return Ok(()); }
        let table = self.table(name).await?;
        let schema = table.schema().await.map_err(map_lance_err)?;
        let batch = points_to_batch(schema.clone(), points)?;
        let reader = Box::new(arrow_array::RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(map_lance_err)?;
        debug!(collection = name, points = points.len(), "upserted points");
        Ok(())
    }
}

#[async_trait]
impl VectorSearchService for LanceVectorStore {
    async fn search(&self, name: &str, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let table = self.table(name).await?;
        if limit == 0 { return Ok(Vec::new()); }
        let schema = table.schema().await.map_err(map_lance_err)?;
        if let Some(dim) = vector_dim(&schema) {
            if dim != query.len() {
                return Err(Error::Embedding(format!(
                    "query has {} dimensions, collection '{name}' expects {dim}",
                    query.len()
                )));
            }
        }
        let distance = schema_distance(&schema);
        let mut stream = table
            .vector_search(query.to_vec())
            .map_err(map_lance_err)?
            .distance_type(lance_distance(distance))
            .limit(limit)
            .execute()
            .await
            .map_err(map_lance_err)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(map_lance_err)? {
            hits.extend(batch_to_results(&batch, distance)?);
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        debug!(collection = name, hits = hits.len(), "vector search");
        Ok(hits)
    }
}
