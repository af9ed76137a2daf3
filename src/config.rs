// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{Result, SearchError};
use crate::models::RecordType;
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub record_types: Vec<RecordType>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Per-request timeout handed to the HTTP client; no timeout when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Engine version; probed once with `GET /` when unset
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Primary-key field used when a record type declares none
    pub primary_key: String,
    /// Mapping type name for engines that still require one (pre-7)
    pub index_name: String,
    pub commit: CommitPolicy,
    pub geo_distance: String,
    pub geo_text_distance: String,
    /// Result size sent when the caller sets no limit
    pub unbounded_size: usize,
    pub bulk_concurrency: usize,
}

/// When writes become visible to searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Refresh the index after every write
    #[default]
    Immediate,
    /// Leave refreshes to the caller or the engine's refresh interval
    Deferred,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_secs: None,
            version: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            index_name: "msearch".to_string(),
            commit: CommitPolicy::Immediate,
            geo_distance: "10km".to_string(),
            geo_text_distance: "50km".to_string(),
            unbounded_size: 10_000,
            bulk_concurrency: 8,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SEARCH_MIRROR")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            engine: EngineConfig::default(),
            search: SearchConfig::default(),
            record_types: Vec::new(),
        }
    }

    pub fn record_type(&self, table: &str) -> Option<&RecordType> {
        self.record_types.iter().find(|rt| rt.table == table)
    }

    fn validate(&self) -> Result<()> {
        Validator::validate_url(&self.engine.url)?;

        if self.search.primary_key.trim().is_empty() {
            return Err(SearchError::Config(
                "primary_key must not be empty".to_string(),
            ));
        }

        if self.search.unbounded_size == 0 {
            return Err(SearchError::Config(
                "unbounded_size must be greater than 0".to_string(),
            ));
        }

        if self.search.bulk_concurrency == 0 {
            return Err(SearchError::Config(
                "bulk_concurrency must be greater than 0".to_string(),
            ));
        }

        Validator::validate_distance(&self.search.geo_distance)
            .and(Validator::validate_distance(&self.search.geo_text_distance))
            .map_err(|e| SearchError::Config(e.to_string()))?;

        Ok(())
    }
}
