use crate::markup::ParseOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const ENV_PREFIX: &str = "FABLEMARK_";

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory holding the page database and logs
    pub data_dir: PathBuf,

    /// Page database file; defaults to `pages.db` in the data directory
    pub database: Option<PathBuf>,

    /// Markup options used when none are given on the command line
    pub markup: ParseOptions,

    pub preview: PreviewConfig,
}

/// Terminal previewer settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Milliseconds between ticks of the event loop
    pub tick_ms: u64,

    /// Where logs go while the terminal is in raw mode
    pub log_file: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tick_ms: 250,
            log_file: None,
        }
    }
}

/// What a configuration file may set; absent keys keep the current value
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub markup: Option<ParseOptions>,
    pub preview: Option<PreviewConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|dir| dir.join("fablemark"))
            .unwrap_or_else(|| PathBuf::from("./data"));
        Self {
            data_dir,
            database: None,
            markup: ParseOptions::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Config {
    /// Initialize configuration from various sources.
    ///
    /// An explicit path must exist and parse; otherwise the usual locations
    /// are searched and a missing file is not an error.
    pub async fn init(explicit: Option<&Path>) -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = Self::default();
        config.load_from_env();

        let file_config = match explicit {
            Some(path) => Some(Self::read_file(path).await?),
            None => Self::load_from_file().await?,
        };
        if let Some(file_config) = file_config {
            config.merge_with(file_config);
        }

        if !config.data_dir.exists() {
            tokio::fs::create_dir_all(&config.data_dir)
                .await
                .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
        }

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply `FABLEMARK_*` variables obtained through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| var(&format!("{ENV_PREFIX}{name}"));
        let flag = |name: &str| get(name).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"));

        if let Some(data_dir) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(database) = get("DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(keep) = flag("KEEP_HTML") {
            self.markup.keep_html_tags = keep;
        }
        if let Some(escape) = flag("ESCAPE_HTML") {
            self.markup.escape_html = escape;
        }
        if let Some(depth) = get("MAX_DEPTH").and_then(|v| v.parse().ok()) {
            self.markup.max_depth = depth;
        }
        if let Some(tick) = get("TICK_MS").and_then(|v| v.parse().ok()) {
            self.preview.tick_ms = tick;
        }
        if let Some(log_file) = get("LOG_FILE") {
            self.preview.log_file = Some(PathBuf::from(log_file));
        }
    }

    /// Load the first configuration file found.
    ///
    /// Priority:
    /// 1. ./.fablemark.json
    /// 2. ./fablemark.json
    /// 3. $CONFIG/fablemark/fablemark.json
    pub async fn load_from_file() -> Result<Option<FileConfig>> {
        let mut config_paths = vec![
            PathBuf::from("./.fablemark.json"),
            PathBuf::from("./fablemark.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("fablemark").join("fablemark.json"));
        }

        for path in config_paths {
            if path.exists() {
                return Self::read_file(&path).await.map(Some);
            }
        }
        Ok(None)
    }

    async fn read_file(path: &Path) -> Result<FileConfig> {
        debug!("Loading configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Merge values from a configuration file into this one
    pub fn merge_with(&mut self, other: FileConfig) {
        if let Some(data_dir) = other.data_dir {
            self.data_dir = data_dir;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if let Some(markup) = other.markup {
            self.markup = markup;
        }
        if let Some(preview) = other.preview {
            self.preview = preview;
        }
    }

    /// Path of the page database
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("pages.db"))
    }

    /// Path of the previewer's log file
    pub fn log_file_path(&self) -> PathBuf {
        self.preview
            .log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("fablemark.log"))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.markup.max_depth == 0 {
            return Err(anyhow::anyhow!("markup.max_depth must be greater than 0"));
        }
        if self.preview.tick_ms == 0 {
            return Err(anyhow::anyhow!("preview.tick_ms must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FABLEMARK_DATA_DIR", "/tmp/fm"),
            ("FABLEMARK_ESCAPE_HTML", "TRUE"),
            ("FABLEMARK_MAX_DEPTH", "8"),
            ("FABLEMARK_TICK_MS", "not a number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/fm"));
        assert!(config.markup.escape_html);
        assert!(!config.markup.keep_html_tags);
        assert_eq!(config.markup.max_depth, 8);
        assert_eq!(config.preview.tick_ms, 250);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/fm/pages.db"));
    }

    #[tokio::test]
    async fn test_explicit_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fablemark.json");
        let data_dir = dir.path().join("data");
        std::fs::write(
            &path,
            serde_json::json!({
                "data_dir": data_dir,
                "markup": { "keep_html_tags": true },
                "preview": { "tick_ms": 100 }
            })
            .to_string(),
        )
        .unwrap();

        let config = Config::init(Some(&path)).await.unwrap();
        assert_eq!(config.data_dir, data_dir);
        assert!(data_dir.exists());
        assert!(config.markup.keep_html_tags);
        assert!(config.markup.trim_block_whitespace);
        assert_eq!(config.preview.tick_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::init(Some(&dir.path().join("nope.json"))).await.is_err());
    }
}
