use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::dispatcher::DEFAULT_CHANNEL_CAPACITY;
use crate::report::OutputFormat;

const DEFAULT_CONFIG_FILE: &str = "targets.json";

const DEFAULT_TARGETS: &[&str] = &[
    "https://www.medium.com/",
    "https://www.practical-go-lessons.com/",
    "https://www.stackoverflow.com/",
    "https://www.skysports.com",
    "https://www.mail.com",
    "https://www.guardian.com",
    "https://www.google.com",
    "https://www.kll.la",
    "https://www.bbc.co.uk",
    "https://yoox.com",
];

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProbeConfig {
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub output: OutputFormat,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_enable_latency_history")]
    pub enable_latency_history: bool,
    /// Where to write the Prometheus text exposition after the run, if anywhere.
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
}

fn default_targets() -> Vec<String> {
    DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_enable_latency_history() -> bool {
    false
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            output: OutputFormat::default(),
            channel_capacity: default_channel_capacity(),
            enable_latency_history: default_enable_latency_history(),
            metrics_file: None,
        }
    }
}

impl ProbeConfig {
    /// Get the log level as a tracing::Level
    pub fn get_tracing_level(&self) -> Result<tracing::Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(tracing::Level::TRACE),
            "debug" => Ok(tracing::Level::DEBUG),
            "info" => Ok(tracing::Level::INFO),
            "warn" | "warning" => Ok(tracing::Level::WARN),
            "error" => Ok(tracing::Level::ERROR),
            _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels are: trace, debug, info, warn, error", self.log_level))
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.get_tracing_level()?;
        if self.channel_capacity == 0 {
            return Err(anyhow::anyhow!("channel_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Command-line targets replace the configured ones when given.
    pub fn with_target_overrides<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        if !args.is_empty() {
            self.targets = args;
        }
        self
    }
}

pub struct ConfigManager;

impl ConfigManager {
    /// Reads the file named by `TARGET_CONFIG`, or `targets.json` when unset.
    /// A missing default file falls back to built-in defaults; a missing file
    /// that was asked for explicitly is an error.
    pub async fn start() -> Result<ProbeConfig> {
        match std::env::var("TARGET_CONFIG") {
            Ok(config_file) => {
                eprintln!("Starting with local file: {}", config_file);
                Self::load_file_config(&config_file).await
            }
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                eprintln!("Starting with local file: {}", DEFAULT_CONFIG_FILE);
                Self::load_file_config(DEFAULT_CONFIG_FILE).await
            }
            Err(_) => {
                eprintln!("No {} found, using built-in targets", DEFAULT_CONFIG_FILE);
                Ok(ProbeConfig::default())
            }
        }
    }

    pub async fn load_file_config(file_path: impl AsRef<Path>) -> Result<ProbeConfig> {
        let file_path = file_path.as_ref();
        if !file_path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", file_path.display()));
        }

        let content = fs::read_to_string(file_path).await?;
        let config: ProbeConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gets_defaults() {
        let config: ProbeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ProbeConfig::default());
        assert_eq!(config.targets.len(), DEFAULT_TARGETS.len());
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.output, OutputFormat::Text);
    }

    #[test]
    fn full_config_deserializes() {
        let json = r#"{
            "targets": ["https://a.example", "http://b.example:8080"],
            "log_level": "debug",
            "log_format": "json",
            "output": "json",
            "channel_capacity": 16,
            "enable_latency_history": true,
            "metrics_file": "/tmp/probe.prom"
        }"#;
        let config: ProbeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.targets, vec!["https://a.example", "http://b.example:8080"]);
        assert_eq!(config.get_tracing_level().unwrap(), tracing::Level::DEBUG);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.channel_capacity, 16);
        assert!(config.enable_latency_history);
        assert_eq!(config.metrics_file, Some(PathBuf::from("/tmp/probe.prom")));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_bad_log_level_and_zero_capacity() {
        let config = ProbeConfig {
            log_level: "loud".into(),
            ..ProbeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ProbeConfig {
            channel_capacity: 0,
            ..ProbeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn warning_is_an_alias_for_warn() {
        let config = ProbeConfig {
            log_level: "WARNING".into(),
            ..ProbeConfig::default()
        };
        assert_eq!(config.get_tracing_level().unwrap(), tracing::Level::WARN);
    }

    #[test]
    fn cli_targets_override_config() {
        let config = ProbeConfig::default().with_target_overrides(vec!["http://x".to_string()]);
        assert_eq!(config.targets, vec!["http://x"]);

        let config = ProbeConfig::default().with_target_overrides(Vec::new());
        assert_eq!(config.targets.len(), DEFAULT_TARGETS.len());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("latency-check-{}.json", std::process::id()));
        fs::write(&path, r#"{"targets": ["http://127.0.0.1:1/"]}"#).await.unwrap();

        let config = ConfigManager::load_file_config(&path).await.unwrap();
        assert_eq!(config.targets, vec!["http://127.0.0.1:1/"]);

        fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = ConfigManager::load_file_config("/nonexistent/targets.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
