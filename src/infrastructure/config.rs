//! Configuration file management.
//!
//! Loads the TOML configuration file and can seed a commented default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::ScoreThresholds;
use crate::domain::{AppError, DateStampMode, LabelLanguage, MessageFilter, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# chat-export configuration
# Auto-generated - edit as needed

[export]
# Default output format: markdown, text, html, word, pdf, notion
format = "markdown"

# Role label language: tr, en
label_language = "tr"

# Date stamp placement: none, filename, content, both
date_stamp_mode = "none"

# Which messages to export: all, user, assistant
message_filter = "all"

# Token-span highlighting for code in HTML-based exports
syntax_highlight = true

# Bounded wait per conversation fetch, in seconds
fetch_timeout_secs = 20

[notion]
# Integration token and default parent page for `chat-export notion`
# token = "secret_..."
# parent_page_id = "..."
"#;

/// Per-export defaults, overridable from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: String,
    pub label_language: LabelLanguage,
    pub date_stamp_mode: DateStampMode,
    pub message_filter: MessageFilter,
    pub syntax_highlight: bool,
    pub fetch_timeout_secs: u64,
    /// Default directory exports are written into.
    pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: "markdown".to_owned(),
            label_language: LabelLanguage::default(),
            date_stamp_mode: DateStampMode::default(),
            message_filter: MessageFilter::default(),
            syntax_highlight: true,
            fetch_timeout_secs: 20,
            output_dir: None,
        }
    }
}

impl ExportConfig {
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Notion delivery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    pub token: Option<String>,
    pub parent_page_id: Option<String>,
}

/// Weak-extraction scoring thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub min_solo_text_len: usize,
    pub rich_bonus: usize,
    pub per_message_bonus: usize,
    pub min_total: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let t = ScoreThresholds::default();
        Self {
            min_solo_text_len: t.min_solo_text_len,
            rich_bonus: t.rich_bonus,
            per_message_bonus: t.per_message_bonus,
            min_total: t.min_total,
        }
    }
}

impl ScoringConfig {
    #[must_use]
    pub const fn thresholds(&self) -> ScoreThresholds {
        ScoreThresholds {
            min_solo_text_len: self.min_solo_text_len,
            rich_bonus: self.rich_bonus,
            per_message_bonus: self.per_message_bonus,
            min_total: self.min_total,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub export: ExportConfig,
    pub notion: NotionConfig,
    pub scoring: ScoringConfig,
}

/// Load configuration from file or create default.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config() -> Result<AppConfig> {
    let config_path = config_file_path();

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create default configuration file if it doesn't exist.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists() -> Result<()> {
    let config_path = config_file_path();

    if !config_path.exists() {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(())
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chat-export")
        .join("config.toml")
}
