//! Arrow schema for collection tables and conversions to and from record
//! batches.
//!
//! A collection's vector width and distance function live on the table
//! itself: the width in the `vector` FixedSizeList, the distance in schema
//! metadata under [`DISTANCE_KEY`].
use arrow_array::{
    types::Float32Type, Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use std::collections::HashMap;
use std::sync::Arc;

use docvec_core::types::{ContentType, Distance, Point, PointPayload, SearchResult, SourceType};
use docvec_core::{Error, Result};

pub const DISTANCE_KEY: &str = "distance";

pub fn build_points_schema(vector_size: usize, distance: Distance) -> Result<SchemaRef> {
    let dim = i32::try_from(vector_size)
        .map_err(|_| Error::InvalidConfig(format!("vector size {vector_size} is too large")))?;
    let metadata = HashMap::from([(DISTANCE_KEY.to_string(), distance.as_str().to_string())]);
    Ok(Arc::new(
        Schema::new(vec![
            Field::new("id", DataType::UInt64, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("content_type", DataType::Utf8, false),
            Field::new("source_type", DataType::Utf8, false),
            Field::new("source_location", DataType::Utf8, false),
            Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
        ])
        .with_metadata(metadata),
    ))
}

/// Width of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name("vector").ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

pub fn schema_distance(schema: &Schema) -> Distance {
    schema
        .metadata()
        .get(DISTANCE_KEY)
        .and_then(|d| d.parse().ok())
        .unwrap_or_default()
}

pub fn points_to_batch(schema: SchemaRef, points: &[Point]) -> Result<RecordBatch> {
    let dim = vector_dim(&schema).ok_or_else(|| Error::Backend("collection schema has no vector column".into()))?;
    if let Some(bad) = points.iter().find(|p| p.vector.len() != dim) {
        return Err(Error::Embedding(format!(
            "point {} has {} dimensions, collection expects {dim}",
            bad.id,
            bad.vector.len()
        )));
    }
    let ids: Vec<u64> = points.iter().map(|p| p.id).collect();
    let contents: Vec<&str> = points.iter().map(|p| p.payload.content.as_str()).collect();
    let content_types: Vec<&str> = points.iter().map(|p| p.payload.content_type.as_str()).collect();
    let source_types: Vec<&str> = points.iter().map(|p| p.payload.source_type.as_str()).collect();
    let locations: Vec<&str> = points.iter().map(|p| p.payload.source_location.as_str()).collect();
    let vectors = points.iter().map(|p| Some(p.vector.iter().copied().map(Some).collect::<Vec<_>>()));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(UInt64Array::from(ids)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(content_types)),
            Arc::new(StringArray::from(source_types)),
            Arc::new(StringArray::from(locations)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
        ],
    )
    .map_err(|e| Error::Backend(format!("failed to build record batch: {e}")))
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Backend(format!("result column `{name}` missing or mistyped")))
}

/// Convert a vector-search result batch into scored results. `_distance` is
/// turned into a similarity so that larger is always better.
pub fn batch_to_results(batch: &RecordBatch, distance: Distance) -> Result<Vec<SearchResult>> {
    let ids = column::<UInt64Array>(batch, "id")?;
    let contents = column::<StringArray>(batch, "content")?;
    let content_types = column::<StringArray>(batch, "content_type")?;
    let source_types = column::<StringArray>(batch, "source_type")?;
    let locations = column::<StringArray>(batch, "source_location")?;
    let distances = column::<Float32Array>(batch, "_distance")?;

    (0..batch.num_rows())
        .map(|i| {
            let payload = PointPayload {
                content: contents.value(i).to_string(),
                content_type: content_types.value(i).parse().unwrap_or(ContentType::Other),
                source_type: source_types.value(i).parse().unwrap_or(SourceType::File),
                source_location: locations.value(i).to_string(),
            };
            Ok(SearchResult { id: ids.value(i), score: similarity(distances.value(i), distance), payload })
        })
        .collect()
}

fn similarity(d: f32, distance: Distance) -> f32 {
    match distance {
        Distance::Cosine | Distance::Dot => 1.0 - d,
        Distance::Euclid => 1.0 / (1.0 + d),
    }
}
