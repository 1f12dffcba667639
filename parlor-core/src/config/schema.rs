//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for parlor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Inference server configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// History storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inference server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama-compatible server
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds between liveness probes in watch mode
    #[serde(default = "default_status_poll_secs")]
    pub status_poll_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_status_poll_secs() -> u64 {
    5
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_poll_secs: default_status_poll_secs(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Default model for new sessions; empty means "first available"
    #[serde(default)]
    pub default_model: String,
    /// Send the rendered prior history with each prompt instead of the
    /// latest user turn only
    #[serde(default)]
    pub send_full_history: bool,
    /// Number of trailing messages included when sending full history
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
}

fn default_max_context_messages() -> usize {
    50
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: String::new(),
            send_full_history: false,
            max_context_messages: default_max_context_messages(),
        }
    }
}

/// History storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the single history slot
    #[serde(default = "default_history_path")]
    pub history_path: String,
}

fn default_history_path() -> String {
    "~/.parlor/history.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
