//! Configuration management for synclaude
//!
//! Handles loading, saving, and validating the TOML configuration, including
//! the API key, catalog endpoint, cache lifetime, and saved model choices.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::launcher::{Tier, TierSelection, DEFAULT_MAX_TOKENS};

pub const DEFAULT_API_KEY_ENV: &str = "SYNTHETIC_API_KEY";
pub const DEFAULT_MODELS_API_URL: &str = "https://api.synthetic.new/openai/v1/models";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.synthetic.new/anthropic";
pub const DEFAULT_CLAUDE_PATH: &str = "claude";
pub const DEFAULT_CACHE_HOURS: u32 = 24;
pub const MIN_CACHE_HOURS: u32 = 1;
pub const MAX_CACHE_HOURS: u32 = 168;

const APP_DIR: &str = "synclaude";
const CONFIG_FILE: &str = "config.toml";
const CACHE_FILE: &str = "models_cache.json";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key stored directly in the config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is empty
    pub api_key_env: String,
    /// Model catalog endpoint
    pub models_api_url: String,
    /// Anthropic-compatible endpoint Claude Code is pointed at
    pub anthropic_base_url: String,
    /// How long the model cache stays valid (1-168 hours)
    pub cache_duration_hours: u32,
    /// Catalog request timeout
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_thinking_model: Option<String>,
    /// Claude Code executable
    pub claude_path: String,
    pub max_token_size: u32,
    pub first_run_completed: bool,
    /// Per-tier model overrides
    #[serde(skip_serializing_if = "TierSelection::is_empty")]
    pub tiers: TierSelection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            models_api_url: DEFAULT_MODELS_API_URL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            cache_duration_hours: DEFAULT_CACHE_HOURS,
            request_timeout_secs: 30,
            selected_model: None,
            selected_thinking_model: None,
            claude_path: DEFAULT_CLAUDE_PATH.to_string(),
            max_token_size: DEFAULT_MAX_TOKENS,
            first_run_completed: false,
            tiers: TierSelection::default(),
        }
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Reject values the rest of the program cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CACHE_HOURS..=MAX_CACHE_HOURS).contains(&self.cache_duration_hours) {
            return Err(Error::Config(format!(
                "cache_duration_hours must be between {} and {}, got {}",
                MIN_CACHE_HOURS, MAX_CACHE_HOURS, self.cache_duration_hours
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_token_size == 0 {
            return Err(Error::Config(
                "max_token_size must be greater than zero".to_string(),
            ));
        }
        if self.claude_path.trim().is_empty() {
            return Err(Error::Config("claude_path must not be empty".to_string()));
        }
        check_url("models_api_url", &self.models_api_url)?;
        check_url("anthropic_base_url", &self.anthropic_base_url)?;
        Ok(())
    }

    /// Get the API key, checking the environment variable if not set directly
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    /// Like [`Config::api_key`] with an explicit environment lookup.
    pub fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(key) = non_blank(&self.api_key) {
            return Some(key.to_string());
        }
        if self.api_key_env.trim().is_empty() {
            return None;
        }
        lookup(&self.api_key_env).filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Saved tier choices, with the single saved model as the default and
    /// the saved thinking model as the thinking tier.
    pub fn tier_selection(&self) -> TierSelection {
        let mut tiers = self.tiers.clone();
        if tiers.get(Tier::Default).is_none() {
            tiers.set(Tier::Default, non_blank(&self.selected_model).map(String::from));
        }
        if tiers.get(Tier::Thinking).is_none() {
            tiers.set(
                Tier::Thinking,
                non_blank(&self.selected_thinking_model).map(String::from),
            );
        }
        tiers
    }

    /// Set a field by its config key, as used by `synclaude config set`.
    ///
    /// Tier overrides use `tiers.<tier>`. An empty value clears optional
    /// fields. The result is validated before it is kept.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        let value = value.trim();
        let optional = || (!value.is_empty()).then(|| value.to_string());

        match key {
            "api_key" => updated.api_key = optional(),
            "api_key_env" => updated.api_key_env = value.to_string(),
            "models_api_url" => updated.models_api_url = value.to_string(),
            "anthropic_base_url" => updated.anthropic_base_url = value.to_string(),
            "cache_duration_hours" => updated.cache_duration_hours = parse_number(key, value)?,
            "request_timeout_secs" => updated.request_timeout_secs = parse_number(key, value)?,
            "max_token_size" => updated.max_token_size = parse_number(key, value)?,
            "selected_model" => updated.selected_model = optional(),
            "selected_thinking_model" => updated.selected_thinking_model = optional(),
            "claude_path" => updated.claude_path = value.to_string(),
            "first_run_completed" => {
                updated.first_run_completed = value.parse().map_err(|_| {
                    Error::Config(format!("{} expects true or false, got {}", key, value))
                })?
            }
            _ => match key.strip_prefix("tiers.") {
                Some(tier) => {
                    let tier: Tier = tier.parse().map_err(Error::Config)?;
                    updated.tiers.set(tier, optional());
                }
                None => return Err(Error::Config(format!("unknown config key '{}'", key))),
            },
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{} expects a number, got '{}'", key, value)))
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Directory holding the config and the model cache
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join(APP_DIR))
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join(CONFIG_FILE))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Model cache file, kept next to the config
    pub fn cache_path(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(|dir| dir.join(CACHE_FILE))
            .unwrap_or_else(|| PathBuf::from(CACHE_FILE))
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        self.config.validate()?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Restore defaults, keeping the API key.
    pub fn reset(&mut self) {
        let api_key = self.config.api_key.take();
        self.config = Config {
            api_key,
            ..Config::default()
        };
    }

    pub fn set_api_key(&mut self, key: String) {
        self.config.api_key = Some(key);
    }

    pub fn get_api_key(&self) -> Option<String> {
        self.config.api_key()
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    pub fn set_selected_model(&mut self, model: Option<String>) {
        self.config.selected_model = model;
    }

    pub fn set_selected_thinking_model(&mut self, model: Option<String>) {
        self.config.selected_thinking_model = model;
    }

    pub fn mark_first_run_completed(&mut self) {
        self.config.first_run_completed = true;
    }
}
