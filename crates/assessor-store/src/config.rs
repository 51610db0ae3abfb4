//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assessor_core::session::SessionConfig;
use assessor_core::store::SessionStore;

use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Which session store backs the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Nothing outlives the process.
    Memory,
    /// JSON files under `dir`, questions from the optional `catalog` file.
    File {
        #[serde(default = "default_store_dir")]
        dir: PathBuf,
        #[serde(default)]
        catalog: Option<PathBuf>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            dir: default_store_dir(),
            catalog: None,
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./assessor-data")
}

/// Top-level assessor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessorConfig {
    /// Session store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Name the interviewer introduces itself with.
    #[serde(default = "default_interviewer")]
    pub interviewer_name: String,
    /// Pause between greeting and first question, in milliseconds.
    #[serde(default = "default_greeting_delay")]
    pub greeting_delay_ms: u64,
    /// Pause before feedback on an answer, in milliseconds.
    #[serde(default = "default_feedback_delay")]
    pub feedback_delay_ms: u64,
    /// Pause before the next question, in milliseconds.
    #[serde(default = "default_next_question_delay")]
    pub next_question_delay_ms: u64,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_interviewer() -> String {
    "Alex".to_string()
}
fn default_greeting_delay() -> u64 {
    2000
}
fn default_feedback_delay() -> u64 {
    1000
}
fn default_next_question_delay() -> u64 {
    1500
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./assessor-results")
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            interviewer_name: default_interviewer(),
            greeting_delay_ms: default_greeting_delay(),
            feedback_delay_ms: default_feedback_delay(),
            next_question_delay_ms: default_next_question_delay(),
            output_dir: default_output_dir(),
        }
    }
}

impl AssessorConfig {
    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            interviewer_name: self.interviewer_name.clone(),
            greeting_delay: Duration::from_millis(self.greeting_delay_ms),
            feedback_delay: Duration::from_millis(self.feedback_delay_ms),
            next_question_delay: Duration::from_millis(self.next_question_delay_ms),
            ..SessionConfig::default()
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessor.toml` in the current directory
/// 2. `~/.config/assessor/config.toml`
///
/// Environment variable override: `ASSESSOR_STORE_DIR`.
pub fn load_config() -> Result<AssessorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssessorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("assessor.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<AssessorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => AssessorConfig::default(),
    };

    if let Ok(dir) = std::env::var("ASSESSOR_STORE_DIR") {
        match &mut config.store {
            StoreConfig::File { dir: store_dir, .. } => *store_dir = PathBuf::from(dir),
            StoreConfig::Memory => {
                tracing::warn!("ASSESSOR_STORE_DIR ignored: memory store configured")
            }
        }
    }

    config.interviewer_name = resolve_env_vars(&config.interviewer_name);
    config.output_dir = resolve_path(&config.output_dir);
    if let StoreConfig::File { dir, catalog } = &mut config.store {
        *dir = resolve_path(dir);
        *catalog = catalog.as_deref().map(resolve_path);
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessor"))
}

/// Create a store instance from its configuration.
///
/// `catalog` overrides the configured catalog file of a file store and
/// seeds the questions of a memory store.
pub fn create_store(config: &StoreConfig, catalog: Option<&Path>) -> Result<Arc<dyn SessionStore>> {
    match config {
        StoreConfig::Memory => {
            let questions = match catalog {
                Some(path) => assessor_core::catalog::parse_catalog(path)?.questions,
                None => Vec::new(),
            };
            Ok(Arc::new(MemoryStore::new(questions)))
        }
        StoreConfig::File {
            dir,
            catalog: configured,
        } => {
            let mut store = FileStore::new(dir);
            if let Some(path) = catalog.or(configured.as_deref()) {
                store = store.with_catalog(path);
            }
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_ASSESSOR_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_ASSESSOR_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_ASSESSOR_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_ASSESSOR_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = AssessorConfig::default();
        assert_eq!(config.interviewer_name, "Alex");
        assert_eq!(config.greeting_delay_ms, 2000);
        assert!(matches!(config.store, StoreConfig::File { .. }));

        let session = config.session_config();
        assert_eq!(session.next_question_delay, Duration::from_millis(1500));
    }

    #[test]
    fn parse_store_config() {
        let toml_str = r#"
interviewer_name = "Sam"
feedback_delay_ms = 0

[store]
type = "file"
dir = "/var/lib/assessor"
catalog = "catalogs/excel.toml"
"#;
        let config: AssessorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.interviewer_name, "Sam");
        assert_eq!(config.feedback_delay_ms, 0);
        assert_eq!(
            config.store,
            StoreConfig::File {
                dir: PathBuf::from("/var/lib/assessor"),
                catalog: Some(PathBuf::from("catalogs/excel.toml")),
            }
        );
    }

    #[test]
    fn parse_memory_store() {
        let config: AssessorConfig = toml::from_str("[store]\ntype = \"memory\"\n").unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assessor.toml");
        std::fs::write(
            &path,
            "output_dir = \"reports\"\n\n[store]\ntype = \"memory\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
    }

    #[tokio::test]
    async fn memory_store_from_config_serves_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("c.toml");
        std::fs::write(
            &catalog,
            "[catalog]\nid = \"c\"\nname = \"C\"\n\n[[questions]]\nid = \"q1\"\nprompt = \"?\"\n",
        )
        .unwrap();

        let store = create_store(&StoreConfig::Memory, Some(&catalog)).unwrap();
        assert_eq!(store.name(), "memory");
        assert_eq!(store.load_active_questions().await.unwrap().len(), 1);
    }
}
