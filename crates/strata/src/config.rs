//! Configuration for strata
//!
//! Values are layered: built-in defaults, then the global file
//! (`<config dir>/strata/config.toml`), then `./strata.toml` or the file given
//! with `--config`, then `STRATA__<SECTION>__<KEY>` environment variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use strata_core::{application::SplitterSettings, Thresholds};

use crate::error::{Result, StrataError};

pub const ENV_PREFIX: &str = "STRATA";
pub const LOCAL_CONFIG_FILE: &str = "strata.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub embedding: EmbeddingSettings,
    pub qdrant: QdrantSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingSettings,
}

/// HTTP embedding service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL; `/embed` and `/health` are resolved against it
    pub url: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            dimension: 1024,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantSettings {
    pub uri: String,
    pub collection_name: String,
    pub timeout_secs: u64,
    /// Extra attempts after a failed call
    pub retries: u32,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            uri: "http://localhost:6334".to_string(),
            collection_name: "strata_hierarchical".to_string(),
            timeout_secs: 30,
            retries: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub batch_size: usize,
    /// Normalize text before embedding
    pub normalize: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            batch_size: 64,
            normalize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub title_threshold: f32,
    pub filename_threshold: f32,
    pub content_threshold: f32,
    pub top_k: usize,
    pub scroll_limit: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            title_threshold: thresholds.title,
            filename_threshold: thresholds.filename,
            content_threshold: thresholds.content,
            top_k: 5,
            scroll_limit: 1000,
        }
    }
}

impl RetrievalSettings {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            title: self.title_threshold,
            filename: self.filename_threshold,
            content: self.content_threshold,
        }
    }
}

/// Language model used by `strata chunk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub max_input_chars: usize,
    pub fallback_chars: usize,
    /// Save progress after this many documents
    pub checkpoint_every: usize,
    /// Pause between documents to respect model rate limits
    pub request_delay_ms: u64,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        let splitter = SplitterSettings::default();
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            timeout_secs: 300,
            max_attempts: splitter.max_attempts,
            max_input_chars: splitter.max_input_chars,
            fallback_chars: splitter.fallback_chars,
            checkpoint_every: 2,
            request_delay_ms: 0,
        }
    }
}

impl ChunkingSettings {
    pub fn splitter(&self) -> SplitterSettings {
        SplitterSettings {
            max_attempts: self.max_attempts,
            max_input_chars: self.max_input_chars,
            fallback_chars: self.fallback_chars,
        }
    }
}

/// Resolves [`StrataConfig`] from files and the environment
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
    use_global: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: ENV_PREFIX.to_string(),
            use_global: true,
        }
    }

    /// Use an explicit file; it must exist
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip the per-user config file
    pub fn without_global(mut self) -> Self {
        self.use_global = false;
        self
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("strata").join("config.toml"))
    }

    pub fn load(&self) -> Result<StrataConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&StrataConfig::default())?);

        if let Some(global) = Self::global_config_path().filter(|_| self.use_global) {
            builder = builder.add_source(File::from(global).required(false));
        }
        builder = match &self.config_path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::from(Path::new(LOCAL_CONFIG_FILE)).required(false)),
        };
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config: StrataConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StrataConfig {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(StrataError::Validation(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }
        if self.index.batch_size == 0 {
            return Err(StrataError::Validation(
                "index.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.scroll_limit == 0 {
            return Err(StrataError::Validation(
                "retrieval.scroll_limit must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(StrataError::Validation(
                "retrieval.top_k must be greater than 0".to_string(),
            ));
        }
        if self.chunking.max_attempts == 0 {
            return Err(StrataError::Validation(
                "chunking.max_attempts must be greater than 0".to_string(),
            ));
        }
        self.retrieval
            .thresholds()
            .validate()
            .map_err(|err| StrataError::Validation(err.to_string()))?;
        url::Url::parse(&self.embedding.url)
            .map_err(|err| StrataError::InvalidUrl(format!("{}: {err}", self.embedding.url)))?;
        Ok(())
    }
}
