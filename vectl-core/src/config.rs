use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, VectlError};

/// Load environment variables from .env files in multiple locations
///
/// Priority order (highest to lowest):
/// 1. Current directory .env
/// 2. ~/.vectl/.env
/// 3. Environment variables already set
///
/// Runs before logging is set up, so the files that were loaded are returned
/// for the caller to report.
pub fn load_dotenv() -> Vec<PathBuf> {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        // dotenvy never overwrites variables that are already set
        if env_file.exists() && dotenvy::from_path(&env_file).is_ok() {
            loaded_from.push(env_file);
        }
    }

    loaded_from
}

/// Get the vectl config directory path (~/.vectl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vectl"))
}

// ============================================================================
// TOML Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VectlConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub elastic: ElasticConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Used when neither --database-url nor DATABASE_URL is given
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Manifest the readiness probe and URL derivation read from
    #[serde(default = "default_compose_file")]
    pub compose_file: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            compose_file: default_compose_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_index")]
    pub index: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: None,
            index: default_index(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    FastEmbed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Provider model name; each provider has its own default
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: None,
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// kNN candidate pool; `max(100, 10 * k)` when unset
    #[serde(default)]
    pub num_candidates: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            top_k: default_top_k(),
            num_candidates: None,
        }
    }
}

// Default value functions for serde
fn default_max_connections() -> u32 {
    5
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_index() -> String {
    "search".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_threshold() -> f32 {
    0.6
}

fn default_top_k() -> usize {
    10
}

impl VectlConfig {
    /// Load config from TOML files
    ///
    /// Priority order (highest to lowest):
    /// 1. ./vectl.toml (project-specific)
    /// 2. ~/.vectl/config.toml (user defaults)
    /// 3. Built-in defaults
    ///
    /// Unreadable or malformed files are logged and skipped.
    pub fn load() -> Self {
        let global_path = config_dir().map(|d| d.join("config.toml"));
        Self::load_layers(global_path.as_deref(), Path::new("vectl.toml"))
    }

    /// Overlay `local` on `global` key by key, then apply serde defaults
    fn load_layers(global: Option<&Path>, local: &Path) -> Self {
        let mut merged = toml::Table::new();

        for path in global.into_iter().chain(std::iter::once(local)) {
            if !path.exists() {
                continue;
            }
            match Self::read_table(path) {
                Ok(table) => {
                    debug!("Loaded config layer from {}", path.display());
                    merge_tables(&mut merged, table);
                }
                Err(e) => warn!("{}", e),
            }
        }

        match toml::Value::Table(merged).try_into() {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config files: {}", e);
                VectlConfig::default()
            }
        }
    }

    fn read_table(path: &Path) -> Result<toml::Table> {
        let contents = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&contents).map_err(|e| VectlError::toml(path, e))?;
        // Reject layers that parse as TOML but not as config
        toml::Value::Table(table.clone())
            .try_into::<VectlConfig>()
            .map_err(|e| VectlError::toml(path, e))?;
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| VectlError::toml(path, e))
    }

    /// Candidate pool size for a kNN query returning `k` hits
    pub fn num_candidates(&self, k: usize) -> usize {
        self.search
            .num_candidates
            .unwrap_or_else(|| std::cmp::max(100, k.saturating_mul(10)))
            .max(k)
    }
}

/// Deep-merge `overlay` into `base`; nested tables merge, other values replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_returns_path() {
        let dir = config_dir();
        assert!(dir.is_some());

        if let Some(path) = dir {
            assert!(path.ends_with(".vectl"));
        }
    }

    #[test]
    fn test_load_dotenv_reports_existing_files_only() {
        for path in load_dotenv() {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_vectl_config_defaults() {
        let config = VectlConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.elastic.index, "search");
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(config.embedding.provider, EmbeddingProvider::OpenAi);
        assert!((config.search.threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.search.top_k, 10);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: VectlConfig = toml::from_str(
            r#"
            [embedding]
            provider = "fastembed"

            [search]
            threshold = 0.75
            "#,
        )
        .unwrap();
        assert_eq!(config.embedding.provider, EmbeddingProvider::FastEmbed);
        assert_eq!(config.embedding.batch_size, 32);
        assert!((config.search.threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.elastic.index, "search");
    }

    #[test]
    fn test_local_layer_keeps_global_sections_it_omits() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let local = dir.path().join("vectl.toml");
        std::fs::write(
            &global,
            r#"
            [database]
            url = "postgres://global/db"

            [elastic]
            url = "http://global:9200"

            [embedding]
            provider = "fastembed"
            batch_size = 8

            [search]
            threshold = 0.8
            "#,
        )
        .unwrap();
        std::fs::write(
            &local,
            r#"
            [elastic]
            index = "notes"

            [search]
            top_k = 3
            "#,
        )
        .unwrap();

        let merged = VectlConfig::load_layers(Some(&global), &local);
        assert_eq!(merged.database.url.as_deref(), Some("postgres://global/db"));
        assert_eq!(merged.elastic.url.as_deref(), Some("http://global:9200"));
        assert_eq!(merged.elastic.index, "notes");
        assert_eq!(merged.embedding.provider, EmbeddingProvider::FastEmbed);
        assert_eq!(merged.embedding.batch_size, 8);
        assert!((merged.search.threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(merged.search.top_k, 3);
    }

    #[test]
    fn test_local_layer_overrides_global_values() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let local = dir.path().join("vectl.toml");
        std::fs::write(&global, "[embedding]\nprovider = \"fastembed\"\n").unwrap();
        std::fs::write(&local, "[embedding]\nprovider = \"openai\"\n").unwrap();

        let merged = VectlConfig::load_layers(Some(&global), &local);
        assert_eq!(merged.embedding.provider, EmbeddingProvider::OpenAi);
    }

    #[test]
    fn test_malformed_layer_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let local = dir.path().join("vectl.toml");
        std::fs::write(&global, "[search]\ntop_k = 4\n").unwrap();
        std::fs::write(&local, "[search]\ntop_k = \"many\"\n").unwrap();

        let merged = VectlConfig::load_layers(Some(&global), &local);
        assert_eq!(merged.search.top_k, 4);
    }

    #[test]
    fn test_num_candidates() {
        let mut config = VectlConfig::default();
        assert_eq!(config.num_candidates(5), 100);
        assert_eq!(config.num_candidates(50), 500);

        config.search.num_candidates = Some(20);
        assert_eq!(config.num_candidates(5), 20);
        assert_eq!(config.num_candidates(50), 50);
    }

    #[test]
    fn test_from_path_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectl.toml");
        std::fs::write(&path, "[search\nthreshold = ").unwrap();

        let err = VectlConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, VectlError::Toml { .. }));
    }
}
