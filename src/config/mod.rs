// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Culler

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dates::DateRule;
use crate::navigator::AdvancePolicy;
use crate::report::ReportFormat;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Directory holding one sub-directory per review period
    #[serde(default = "default_history_dir")]
    pub history_dir: String,

    /// Resume marker location
    #[serde(default = "default_settings_file")]
    pub settings_file: String,

    /// Optional age-inference output shown next to each image
    #[serde(default)]
    pub annotations: Option<String>,

    /// Review behaviour
    pub review: ReviewConfig,

    /// Cross-period lookup settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// End-of-session report settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReviewConfig {
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// How the date token is cut out of an image filename. Deliberately
    /// without a default: datasets disagree on the convention.
    pub date_rule: DateRule,
    #[serde(default)]
    pub advance_policy: AdvancePolicy,
    #[serde(default = "default_data_dir_name")]
    pub data_dir_name: String,
    #[serde(default = "default_archive_dir_name")]
    pub archive_dir_name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default = "default_report_prefix")]
    pub file_prefix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_history_dir() -> String { "history".to_string() }
fn default_settings_file() -> String { "culler_settings.json".to_string() }
fn default_display_limit() -> usize { 3 }
fn default_data_dir_name() -> String { "data".to_string() }
fn default_archive_dir_name() -> String { "classified".to_string() }
fn default_report_prefix() -> String { "classification_report".to_string() }

fn default_labels() -> Vec<String> {
    vec!["NOLOOK", "BLACK", "NAKED", "MALE"]
        .into_iter().map(String::from).collect()
}

fn default_image_extensions() -> Vec<String> {
    vec!["jpg", "jpeg", "png"]
        .into_iter().map(String::from).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            history_dir: default_history_dir(),
            settings_file: default_settings_file(),
            annotations: None,
            review: ReviewConfig::default(),
            history: HistoryConfig::default(),
            report: ReportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            labels: default_labels(),
            image_extensions: default_image_extensions(),
            date_rule: DateRule::FirstUnderscore,
            advance_policy: AdvancePolicy::default(),
            data_dir_name: default_data_dir_name(),
            archive_dir_name: default_archive_dir_name(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            display_limit: default_display_limit(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            file_prefix: default_report_prefix(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::CullerError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            tracing::info!(
                "Config file not found at {:?}, using defaults (date rule: {})",
                path, config.review.date_rule
            );
            Ok(config)
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the store encoding cannot represent
    pub fn validate(&self) -> crate::Result<()> {
        if self.review.labels.is_empty() {
            return Err(crate::CullerError::Config("review.labels must not be empty".to_string()));
        }
        for label in &self.review.labels {
            if label.is_empty() || label.contains('_') {
                return Err(crate::CullerError::Config(format!(
                    "Invalid label {:?}: labels must be non-empty and must not contain '_'",
                    label
                )));
            }
        }
        if self.review.image_extensions.is_empty() {
            return Err(crate::CullerError::Config(
                "review.image_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.history_dir)
    }

    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(&self.settings_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.review.labels.len(), 4);
        assert_eq!(config.review.date_rule, DateRule::FirstUnderscore);
        assert_eq!(config.history.display_limit, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("culler.json");
        let mut config = AppConfig::default();
        config.review.date_rule = DateRule::LastUnderscore;
        config.review.advance_policy = AdvancePolicy::Silent;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.review.date_rule, DateRule::LastUnderscore);
        assert_eq!(loaded.review.advance_policy, AdvancePolicy::Silent);
    }

    #[test]
    fn test_date_rule_is_required() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("culler.json");
        std::fs::write(&path, r#"{"review": {"labels": ["ADULT"]}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::CullerError::Config(_))));
    }

    #[test]
    fn test_label_with_underscore_rejected() {
        let mut config = AppConfig::default();
        config.review.labels = vec!["NO_LOOK".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("culler.json");
        std::fs::write(&path, r#"{"review": {"date_rule": "last_underscore"}}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.review.archive_dir_name, "classified");
        assert_eq!(config.report.file_prefix, "classification_report");
        assert!(config.logging.file.is_none());
    }
}
