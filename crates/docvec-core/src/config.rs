//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars into a typed [`Settings`]. Provides helpers to expand
//! `~` and `${VAR}` and to resolve relative paths against a base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::state::DEFAULT_STATE_FILE;
use crate::types::{CollectionVersions, SearchConfig};

/// Where the active collection pointer is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// JSON file at `state_path`.
    #[default]
    File,
    /// Key/value meta table inside the vector database.
    Lance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub source_path: String,
    pub vector_size: usize,
    pub search_result_limit: usize,
    pub keyword_boost: bool,
    pub keyword_boost_weight: f32,
    pub current_collection: Option<String>,
    pub collections: [String; 2],
    pub db_path: String,
    pub state_path: String,
    pub state_backend: StateBackend,
    pub batch_size: usize,
    /// Total upsert attempts per batch, including the first one.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub model_dir: Option<String>,
    pub use_fake_embeddings: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let versions = CollectionVersions::default();
        Self {
            source_path: String::new(),
            vector_size: 1024,
            search_result_limit: 3,
            keyword_boost: true,
            keyword_boost_weight: SearchConfig::DEFAULT_BOOST_WEIGHT,
            current_collection: None,
            collections: [versions.primary, versions.secondary],
            db_path: ".docvec/lancedb".to_string(),
            state_path: DEFAULT_STATE_FILE.to_string(),
            state_backend: StateBackend::File,
            batch_size: 250,
            max_attempts: 10,
            retry_delay_ms: 1000,
            model_dir: None,
            use_fake_embeddings: false,
        }
    }
}

impl Settings {
    /// Load using `RUST_ENV` (default `dev`) from the working directory.
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("config.toml"), &env_name)
    }

    /// Load from an explicit base file; `config.<env>.toml` is looked up
    /// next to it.
    pub fn load_from(base: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(base));
        let dir = base.parent().unwrap_or_else(|| Path::new(""));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_path.trim().is_empty() {
            return Err(Error::InvalidConfig("missing required field: source_path".into()));
        }
        if self.vector_size == 0 {
            return Err(Error::InvalidConfig("vector_size must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be at least 1".into()));
        }
        self.search_config()?;
        self.collection_versions()?;
        Ok(())
    }

    pub fn search_config(&self) -> Result<SearchConfig> {
        SearchConfig::new(self.search_result_limit, self.keyword_boost, self.keyword_boost_weight)
    }

    pub fn collection_versions(&self) -> Result<CollectionVersions> {
        let [primary, secondary] = &self.collections;
        CollectionVersions::new(primary.clone(), secondary.clone())
    }

    pub fn source_dir(&self) -> PathBuf { expand_path(&self.source_path) }

    pub fn db_dir(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.db_path) }

    pub fn state_file(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.state_path) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
