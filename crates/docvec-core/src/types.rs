//! Domain types shared by the indexing pipeline, the search orchestrator and
//! the vector-store adapters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub type PointId = u64;

/// Where a source item came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::File => "file",
        }
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(SourceType::File),
            other => Err(Error::Backend(format!("unknown source type '{other}'"))),
        }
    }
}

/// Coarse content typing of a source item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Other,
    Text,
    Markdown,
    Html,
    Json,
    Yaml,
}

impl ContentType {
    /// Maps a file extension (without the dot, any case) to a content type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "markdown" => ContentType::Markdown,
            "html" | "htm" => ContentType::Html,
            "json" => ContentType::Json,
            "yaml" | "yml" => ContentType::Yaml,
            "txt" | "text" => ContentType::Text,
            _ => ContentType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Other => "other",
            ContentType::Text => "text",
            ContentType::Markdown => "markdown",
            ContentType::Html => "html",
            ContentType::Json => "json",
            ContentType::Yaml => "yaml",
        }
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "text" => ContentType::Text,
            "markdown" => ContentType::Markdown,
            "html" => ContentType::Html,
            "json" => ContentType::Json,
            "yaml" => ContentType::Yaml,
            _ => ContentType::Other,
        })
    }
}

/// One discoverable unit of content, produced by a `SourceProcessor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceItem {
    pub source_type: SourceType,
    pub source_location: String,
    pub content_type: ContentType,
    pub content: String,
}

/// Payload stored next to every vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointPayload {
    pub content: String,
    pub content_type: ContentType,
    pub source_type: SourceType,
    pub source_location: String,
}

impl From<SourceItem> for PointPayload {
    fn from(item: SourceItem) -> Self {
        Self {
            content: item.content,
            content_type: item.content_type,
            source_type: item.source_type,
            source_location: item.source_location,
        }
    }
}

/// An embedded unit ready for upsert.
///
/// `id` is the item's ordinal within one indexing pass. It is stable within
/// the pass only; a later pass over a changed corpus reassigns ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A nearest-neighbor hit. `score` is higher-is-better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: PointId,
    pub score: f32,
    pub payload: PointPayload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Euclid,
    Dot,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "cosine",
            Distance::Euclid => "euclid",
            Distance::Dot => "dot",
        }
    }
}

impl FromStr for Distance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(Distance::Cosine),
            "euclid" => Ok(Distance::Euclid),
            "dot" => Ok(Distance::Dot),
            other => Err(Error::Backend(format!("unknown distance '{other}'"))),
        }
    }
}

/// Shape of a collection at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub vector_size: usize,
    pub distance: Distance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionInfo {
    pub points_count: usize,
}

/// The two collection names that swap roles on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionVersions {
    pub primary: String,
    pub secondary: String,
}

impl CollectionVersions {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Result<Self> {
        let (primary, secondary) = (primary.into(), secondary.into());
        if primary.trim().is_empty() || secondary.trim().is_empty() {
            return Err(Error::InvalidConfig("collection names must not be empty".into()));
        }
        if primary == secondary {
            return Err(Error::InvalidConfig(format!(
                "collection versions must differ, both are '{primary}'"
            )));
        }
        Ok(Self { primary, secondary })
    }

    /// The collection a refresh should build next, given the active one.
    pub fn alternate(&self, current: &str) -> &str {
        if current == self.primary { &self.secondary } else { &self.primary }
    }
}

impl Default for CollectionVersions {
    fn default() -> Self {
        Self { primary: "docs_v1".to_string(), secondary: "docs_v2".to_string() }
    }
}

impl fmt::Display for CollectionVersions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.secondary)
    }
}

/// Read-side knobs, fixed for the lifetime of a search orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub result_limit: usize,
    pub keyword_boost: bool,
    pub keyword_boost_weight: f32,
}

impl SearchConfig {
    pub const DEFAULT_BOOST_WEIGHT: f32 = 0.2;

    pub fn new(result_limit: usize, keyword_boost: bool, keyword_boost_weight: f32) -> Result<Self> {
        if result_limit == 0 {
            return Err(Error::InvalidConfig("search result limit must be positive".into()));
        }
        if !(0.0..=1.0).contains(&keyword_boost_weight) {
            return Err(Error::InvalidConfig(format!(
                "keyword boost weight must be within [0, 1], got {keyword_boost_weight}"
            )));
        }
        Ok(Self { result_limit, keyword_boost, keyword_boost_weight })
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { result_limit: 3, keyword_boost: true, keyword_boost_weight: Self::DEFAULT_BOOST_WEIGHT }
    }
}
