//! Configuration management for Voyage
//!
//! Everything has a default that matches the remote service's contract, so a
//! missing `voyage.toml` is fine. A present file only needs the keys it wants
//! to override.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "voyage.toml";

/// Longest accepted cycle interval (one year)
pub const MAX_CYCLE_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level Voyage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageConfig {
    /// Reward API endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Generative-AI settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Retry policy applied to every remote call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pacing between chats and cycles
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Model tags rotated across chats
    #[serde(default = "default_model_tags")]
    pub model_tags: Vec<String>,
}

/// Reward API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

/// Generative-AI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,

    #[serde(default = "default_generator_model")]
    pub model: String,
}

/// Fixed-interval retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between attempts
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Pause after a call finishes, before the next one may start
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Pacing between chats and cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Wait after every chat, successful or not
    #[serde(default = "default_chat_interval_ms")]
    pub chat_interval_ms: u64,

    /// Time between cycle starts
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Countdown repaint interval
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,
}

// Default value providers
fn default_api_base_url() -> String {
    "https://api.mention.network".to_string()
}

fn default_generator_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generator_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_ms() -> u64 {
    5_000
}

fn default_settle_ms() -> u64 {
    500
}

fn default_chat_interval_ms() -> u64 {
    15_000
}

fn default_cycle_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_countdown_tick_ms() -> u64 {
    1_000
}

fn default_model_tags() -> Vec<String> {
    vec![
        "gpt-3-5".to_string(),
        "gemini-2.5-flash".to_string(),
        "grok-4".to_string(),
        "deepseek_default".to_string(),
    ]
}

impl VoyageConfig {
    /// Load configuration from `path`, or use defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content).map_err(|e| {
                crate::VoyageError::Config(format!("Failed to parse config file: {}", e))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(&Self::default()).map_err(|e| {
            crate::VoyageError::Config(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(crate::VoyageError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.model_tags.is_empty() {
            return Err(crate::VoyageError::Config(
                "model_tags must not be empty".to_string(),
            ));
        }
        if self.pacing.cycle_interval_secs == 0 {
            return Err(crate::VoyageError::Config(
                "pacing.cycle_interval_secs must be positive".to_string(),
            ));
        }
        if self.pacing.cycle_interval_secs > MAX_CYCLE_INTERVAL_SECS {
            return Err(crate::VoyageError::Config(format!(
                "pacing.cycle_interval_secs must be at most {}",
                MAX_CYCLE_INTERVAL_SECS
            )));
        }
        Ok(())
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl PacingConfig {
    pub fn chat_interval(&self) -> Duration {
        Duration::from_millis(self.chat_interval_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}

impl Default for VoyageConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            generator: GeneratorConfig::default(),
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
            model_tags: default_model_tags(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_generator_base_url(),
            model: default_generator_model(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            chat_interval_ms: default_chat_interval_ms(),
            cycle_interval_secs: default_cycle_interval_secs(),
            countdown_tick_ms: default_countdown_tick_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = VoyageConfig::load_or_default(&dir.path().join("voyage.toml")).unwrap();
        assert_eq!(config, VoyageConfig::default());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff(), Duration::from_secs(5));
        assert_eq!(config.retry.settle(), Duration::from_millis(500));
        assert_eq!(config.pacing.chat_interval(), Duration::from_secs(15));
        assert_eq!(config.pacing.cycle_interval(), Duration::from_secs(86_400));
        assert_eq!(config.model_tags.len(), 4);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voyage.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://localhost:9000\"\n\n[retry]\nbackoff_ms = 10\n",
        )
        .unwrap();

        let config = VoyageConfig::load_or_default(&path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.retry.backoff_ms, 10);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.generator.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("voyage.toml");
        std::fs::write(&path, "model_tags = []\n").unwrap();
        assert!(VoyageConfig::load_or_default(&path).is_err());

        std::fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();
        assert!(VoyageConfig::load_or_default(&path).is_err());

        std::fs::write(&path, "[pacing]\ncycle_interval_secs = 18446744073709551615\n").unwrap();
        assert!(VoyageConfig::load_or_default(&path).is_err());

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(VoyageConfig::load_or_default(&path).is_err());
    }

    #[test]
    fn test_cycle_interval_upper_bound() {
        let mut config = VoyageConfig::default();
        config.pacing.cycle_interval_secs = MAX_CYCLE_INTERVAL_SECS;
        assert!(config.validate().is_ok());
        config.pacing.cycle_interval_secs = MAX_CYCLE_INTERVAL_SECS + 1;
        assert!(matches!(
            config.validate(),
            Err(crate::VoyageError::Config(_))
        ));
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("voyage.toml");
        VoyageConfig::write_default(&path).unwrap();
        let loaded = VoyageConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, VoyageConfig::default());
    }
}
