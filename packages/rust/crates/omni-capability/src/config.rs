//! Search settings loader for omni-capability.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/capability.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/capability.yaml`
//!
//! Merge precedence is user over system. Missing or unreadable files fall
//! back to built-in defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CapabilityError;
use crate::shaper::DEFAULT_CATEGORY_CAP;
use crate::strategy::STRATEGY_TOP_K;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/capability.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/capability.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";

const DEFAULT_LIMIT: usize = 10;
const DEFAULT_KEYWORD_CANDIDATES: usize = 50;
const DEFAULT_EMBEDDING_TOP_K: usize = 20;
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EMBEDDING_DIMENSION: usize = 256;

/// Raw settings file; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub search: RetrievalSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

/// Ranking and shaping knobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrievalSettings {
    pub default_limit: Option<usize>,
    pub category_cap: Option<usize>,
    pub strategy_top_k: Option<usize>,
    pub keyword_candidates: Option<usize>,
    pub embedding_top_k: Option<usize>,
    pub embedding_min_similarity: Option<f32>,
}

/// Embedding collaborator settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: Option<String>,
    pub client_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub dimension: Option<usize>,
}

/// Which embedding provider to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingBackend {
    /// No embeddings; discovery is BM25 only.
    #[default]
    None,
    /// Offline FNV-1a hash embeddings.
    Hash,
    /// HTTP `/embed/batch` service.
    Http,
}

impl EmbeddingBackend {
    /// Parse a backend label; unknown labels map to `None` with a warning.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "hash" => Self::Hash,
            "http" => Self::Http,
            "" | "none" | "off" | "disabled" => Self::None,
            other => {
                tracing::warn!(
                    event = "capability.config.unknown_embedding_provider",
                    provider = other,
                    "unknown embedding provider; embeddings disabled"
                );
                Self::None
            }
        }
    }
}

/// Settings with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSearchSettings {
    /// Result count when the caller gives no limit.
    pub default_limit: usize,
    /// Max results per category under the diversity constraint (>= 1).
    pub category_cap: usize,
    /// Max hits kept by each fan-out strategy.
    pub strategy_top_k: usize,
    /// Length of the BM25 ranked list fed into RRF.
    pub keyword_candidates: usize,
    /// Max embedding hits per node type.
    pub embedding_top_k: usize,
    /// Embedding hits must exceed this cosine similarity.
    pub embedding_min_similarity: f32,
    /// Embedding provider selection.
    pub embedding_backend: EmbeddingBackend,
    /// HTTP embedding base URL.
    pub embedding_client_url: Option<String>,
    /// Model name forwarded to the HTTP provider.
    pub embedding_model: Option<String>,
    /// HTTP request timeout.
    pub embedding_timeout_secs: u64,
    /// Hash embedding dimension.
    pub embedding_dimension: usize,
}

impl Default for ResolvedSearchSettings {
    fn default() -> Self {
        SearchSettings::default().resolve()
    }
}

impl SearchSettings {
    /// Parse settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Yaml`] for malformed YAML.
    pub fn from_yaml(raw: &str) -> Result<Self, CapabilityError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    fn merge(self, overlay: Self) -> Self {
        Self {
            search: self.search.merge(overlay.search),
            embedding: self.embedding.merge(overlay.embedding),
        }
    }

    /// Apply defaults.
    #[must_use]
    pub fn resolve(&self) -> ResolvedSearchSettings {
        let search = &self.search;
        let embedding = &self.embedding;
        let client_url = embedding
            .client_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let backend = match embedding.provider.as_deref() {
            Some(label) => EmbeddingBackend::parse(label),
            None if client_url.is_some() => EmbeddingBackend::Http,
            None => EmbeddingBackend::None,
        };

        ResolvedSearchSettings {
            default_limit: search.default_limit.unwrap_or(DEFAULT_LIMIT),
            category_cap: search.category_cap.unwrap_or(DEFAULT_CATEGORY_CAP).max(1),
            strategy_top_k: search.strategy_top_k.unwrap_or(STRATEGY_TOP_K).max(1),
            keyword_candidates: search
                .keyword_candidates
                .unwrap_or(DEFAULT_KEYWORD_CANDIDATES),
            embedding_top_k: search.embedding_top_k.unwrap_or(DEFAULT_EMBEDDING_TOP_K),
            embedding_min_similarity: search.embedding_min_similarity.unwrap_or(0.0),
            embedding_backend: backend,
            embedding_client_url: client_url,
            embedding_model: embedding.model.clone(),
            embedding_timeout_secs: embedding
                .timeout_secs
                .unwrap_or(DEFAULT_EMBEDDING_TIMEOUT_SECS),
            embedding_dimension: embedding.dimension.unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
        }
    }
}

impl RetrievalSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            default_limit: overlay.default_limit.or(self.default_limit),
            category_cap: overlay.category_cap.or(self.category_cap),
            strategy_top_k: overlay.strategy_top_k.or(self.strategy_top_k),
            keyword_candidates: overlay.keyword_candidates.or(self.keyword_candidates),
            embedding_top_k: overlay.embedding_top_k.or(self.embedding_top_k),
            embedding_min_similarity: overlay
                .embedding_min_similarity
                .or(self.embedding_min_similarity),
        }
    }
}

impl EmbeddingSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            provider: overlay.provider.or(self.provider),
            client_url: overlay.client_url.or(self.client_url),
            model: overlay.model.or(self.model),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
            dimension: overlay.dimension.or(self.dimension),
        }
    }
}

/// Load merged settings (user overrides system).
///
/// `config_home` replaces `PRJ_CONFIG_HOME` when given (CLI `--conf`).
#[must_use]
pub fn load_search_settings(config_home: Option<&Path>) -> SearchSettings {
    let (system_path, user_path) = search_settings_paths(config_home);
    load_search_settings_from_paths(&system_path, &user_path)
}

/// System and user settings paths.
#[must_use]
pub fn search_settings_paths(config_home: Option<&Path>) -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let home = match config_home {
        Some(path) => absolutize(&root, path.to_path_buf()),
        None => resolve_config_home(&root),
    };
    (system_path, home.join(DEFAULT_USER_SETTINGS_RELATIVE_PATH))
}

/// Load and merge two explicit settings files.
#[must_use]
pub fn load_search_settings_from_paths(system: &Path, user: &Path) -> SearchSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> SearchSettings {
    if !path.exists() {
        return SearchSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event = "capability.config.read_failed",
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return SearchSettings::default();
        }
    };
    match SearchSettings::from_yaml(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                event = "capability.config.parse_failed",
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            SearchSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}
