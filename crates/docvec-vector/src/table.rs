//! LanceDB connection and housekeeping helpers.
//!
//! Provides the database open function, error mapping into the crate error
//! type, table existence checks and a small key/value metadata table.
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::sync::Arc;
use tracing::debug;

use docvec_core::{Error, Result};

pub const BACKEND: &str = "LanceDB";

pub async fn open_db(uri: &str) -> Result<Connection> {
    debug!(uri, "connecting to vector store");
    connect(uri).execute().await.map_err(|e| Error::Connectivity { backend: BACKEND, message: e.to_string() })
}

pub fn map_lance_err(e: lancedb::Error) -> Error {
    match e {
        lancedb::Error::TableNotFound { name, .. } => Error::CollectionNotFound(name),
        other => Error::Backend(other.to_string()),
    }
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await.map_err(map_lance_err)?;
    Ok(names.iter().any(|n| n == name))
}

/// Create an empty table with `schema` unless one named `name` exists.
/// Returns whether a table was created.
pub async fn ensure_table(conn: &Connection, name: &str, schema: SchemaRef) -> Result<bool> {
    if table_exists(conn, name).await? {
        return Ok(false);
    }
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await.map_err(map_lance_err)?;
    Ok(true)
}

fn build_meta_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    ensure_table(conn, table, build_meta_schema()).await?;
    let t = conn.open_table(table).execute().await.map_err(map_lance_err)?;
    let rb = RecordBatch::try_new(
        build_meta_schema(),
        vec![
            Arc::new(StringArray::from(vec![key])),
            Arc::new(StringArray::from(vec![value])),
            Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
        ],
    )
    .map_err(|e| Error::Backend(e.to_string()))?;
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
    let mut mi = t.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await.map_err(map_lance_err)?;
    Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    if !table_exists(conn, table).await? {
        return Ok(None);
    }
    let t = conn.open_table(table).execute().await.map_err(map_lance_err)?;
    let mut stream = t
        .query()
        .only_if(format!("key = '{}'", key.replace('\'', "''")))
        .execute()
        .await
        .map_err(map_lance_err)?;
    while let Some(batch) = stream.try_next().await.map_err(map_lance_err)? {
        if batch.num_rows() == 0 { continue; }
        let val = batch
            .column_by_name("value")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| Error::Backend("meta.value column missing".into()))?;
        return Ok(Some(val.value(0).to_string()));
    }
    Ok(None)
}
