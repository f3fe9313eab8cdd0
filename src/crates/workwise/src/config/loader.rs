//! Configuration loader with layered file support
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.workwise/workwise.toml
//! 3. Project-level config: ./.workwise/workwise.toml
//! 4. An explicit file passed with `--config`
//!
//! Later layers override earlier ones key by key, so a project file that only
//! sets `llm.model` keeps the user's `llm.api_key`. `${VAR}` references and
//! `WORKWISE_*` variables are applied after the files are merged.

use crate::config::schema::WorkwiseConfig;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_DIR: &str = ".workwise";
const CONFIG_FILE: &str = "workwise.toml";

/// Loads and merges the configuration layers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: PathBuf,
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
            explicit_path: None,
        }
    }

    /// Also read `path`, overriding both standard locations. Unlike those,
    /// it must exist.
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// `~/.workwise/workwise.toml`, if a home directory is known.
    fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// `./.workwise/workwise.toml`
    fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load the merged configuration, resolving the process environment.
    pub async fn load(&self) -> Result<WorkwiseConfig, ConfigError> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    /// Load the merged configuration, resolving variables through `lookup`.
    pub async fn load_with_env<F>(&self, lookup: F) -> Result<WorkwiseConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        info!("Loading configuration with defaults");

        if let Some(path) = &self.user_config_path {
            match Self::read_layer(path).await? {
                Some(layer) => {
                    debug!(path = %path.display(), "Loaded user-level config");
                    merge_values(&mut merged, layer);
                }
                None => debug!(path = %path.display(), "User-level config not found"),
            }
        }

        match Self::read_layer(&self.project_config_path).await? {
            Some(layer) => {
                debug!(path = %self.project_config_path.display(), "Loaded project-level config");
                merge_values(&mut merged, layer);
            }
            None => debug!(path = %self.project_config_path.display(), "Project-level config not found"),
        }

        if let Some(path) = &self.explicit_path {
            let layer = Self::read_layer(path).await?.ok_or_else(|| ConfigError::Read {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            })?;
            debug!(path = %path.display(), "Loaded explicit config");
            merge_values(&mut merged, layer);
        }

        let mut config: WorkwiseConfig =
            merged.try_into().map_err(|e: toml::de::Error| ConfigError::Parse {
                path: "<merged configuration>".to_string(),
                source: e,
            })?;

        config.resolve_env_vars(&lookup);
        config.apply_env_overrides(&lookup)?;

        info!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Read one file as a TOML table; `None` when it does not exist.
    async fn read_layer(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Some(value))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key; any
/// other value replaces what was there.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Provider;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn loader_in(temp: &TempDir) -> ConfigLoader {
        ConfigLoader {
            user_config_path: Some(temp.path().join("user").join(CONFIG_FILE)),
            project_config_path: temp.path().join("project").join(CONFIG_FILE),
            explicit_path: None,
        }
    }

    async fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_defaults_when_no_files() {
        let temp = TempDir::new().unwrap();
        let config = loader_in(&temp).load_with_env(no_env).await.unwrap();
        assert_eq!(config, WorkwiseConfig::default());
    }

    #[tokio::test]
    async fn test_project_overrides_user_key_by_key() {
        let temp = TempDir::new().unwrap();
        let loader = loader_in(&temp);
        write(
            loader.user_config_path.as_ref().unwrap(),
            r#"
            [llm]
            model = "user-model"
            api_key = "user-key"
            "#,
        )
        .await;
        write(
            &loader.project_config_path,
            r#"
            [llm]
            model = "project-model"

            [logging]
            level = "debug"
            "#,
        )
        .await;

        let config = loader.load_with_env(no_env).await.unwrap();
        assert_eq!(config.llm.model, "project-model");
        assert_eq!(config.llm.api_key.as_deref(), Some("user-key"));
        assert_eq!(config.logging.level, "debug");
    }

    #[tokio::test]
    async fn test_explicit_path_wins_and_must_exist() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("custom.toml");
        write(&explicit, "[llm]\nprovider = \"openai\"\n").await;

        let config = loader_in(&temp)
            .with_explicit_path(&explicit)
            .load_with_env(no_env)
            .await
            .unwrap();
        assert_eq!(config.llm.provider, Provider::Openai);

        let err = loader_in(&temp)
            .with_explicit_path(temp.path().join("missing.toml"))
            .load_with_env(no_env)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_parse_error_reports_path() {
        let temp = TempDir::new().unwrap();
        let loader = loader_in(&temp);
        write(&loader.project_config_path, "[llm\nmodel = ").await;

        let err = loader.load_with_env(no_env).await.unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_env_references_resolved() {
        let temp = TempDir::new().unwrap();
        let loader = loader_in(&temp);
        write(
            &loader.project_config_path,
            "[llm]\napi_key = \"${MY_TOKEN}\"\nspace_id = \"${MY_SPACE:space-default}\"\n",
        )
        .await;

        let config = loader
            .load_with_env(|key| (key == "MY_TOKEN").then(|| "resolved".to_string()))
            .await
            .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("resolved"));
        assert_eq!(config.llm.space_id.as_deref(), Some("space-default"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_values_nested() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n[b]\nz = 3").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 20\n[c]\nw = 4").unwrap();
        merge_values(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(20));
        assert_eq!(base["b"]["z"].as_integer(), Some(3));
        assert_eq!(base["c"]["w"].as_integer(), Some(4));
    }
}
