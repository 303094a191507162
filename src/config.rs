use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::{LLMConfig, LLMProvider};
use crate::presentation::SortKey;

/// Configuration for vidscout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model provider settings
    pub llm: LLMConfig,

    /// Where history is stored
    pub storage: StorageConfig,

    /// Front-end behaviour
    pub ui: UiConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted state (search history)
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long a copied URL stays marked, in milliseconds
    pub copy_feedback_ms: u64,

    /// Initial sort order of the result list
    pub default_sort: SortKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("vidscout"))
            .unwrap_or_else(|| PathBuf::from(".vidscout"));
        Self { data_dir }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            copy_feedback_ms: 2000,
            default_sort: SortKey::Popularity,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "vidscout=info,warn".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl UiConfig {
    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }
}

impl Config {
    /// Load configuration from the first readable file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("vidscout.toml"),
            PathBuf::from("config/vidscout.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            config_paths.push(dir.join("vidscout").join("config.toml"));
        }

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        config.apply_env()?;
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load a specific configuration file, then apply environment overrides.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(provider) = std::env::var("VIDSCOUT_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }

        if let Ok(model) = std::env::var("VIDSCOUT_MODEL") {
            self.llm.model = model;
        }

        if let Ok(endpoint) = std::env::var("VIDSCOUT_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        let provider_key = match self.llm.provider {
            LLMProvider::Gemini => std::env::var("GEMINI_API_KEY").ok(),
            LLMProvider::OpenAI => std::env::var("OPENAI_API_KEY").ok(),
            LLMProvider::LMStudio => None,
        };
        if let Some(api_key) = std::env::var("VIDSCOUT_API_KEY").ok().or(provider_key) {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(data_dir) = std::env::var("VIDSCOUT_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(log_level) = std::env::var("VIDSCOUT_LOG_LEVEL") {
            self.logging.log_level = log_level;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.llm.provider {
            LLMProvider::Gemini | LLMProvider::OpenAI => {
                if self.llm.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(anyhow!(
                        "API key required for {:?} (set VIDSCOUT_API_KEY or llm.api_key)",
                        self.llm.provider
                    ));
                }
            }
            LLMProvider::LMStudio => {}
        }

        if self.llm.timeout_seconds == 0 {
            return Err(anyhow!("timeout_seconds must be greater than 0"));
        }

        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "vidscout configuration:\n\
            - Provider: {:?}\n\
            - Model: {}\n\
            - Endpoint: {}\n\
            - API key: {}\n\
            - Timeout: {}s\n\
            - Data directory: {}\n\
            - Default sort: {}",
            self.llm.provider,
            self.llm.model,
            self.llm.endpoint.as_deref().unwrap_or("(provider default)"),
            if self.llm.api_key.is_some() { "set" } else { "not set" },
            self.llm.timeout_seconds,
            self.storage.data_dir.display(),
            self.ui.default_sort,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.llm.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.llm.api_key = Some(api_key.into());
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.data_dir = dir;
        self
    }

    pub fn with_default_sort(mut self, sort: SortKey) -> Self {
        self.config.ui.default_sort = sort;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
