use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Knobs shared by all optimization passes. Validated once before the
/// pipeline runs; the passes assume the ranges hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    /// Target reading speed in characters per second.
    pub chars_per_sec: f64,
    /// Lower bound on display duration in seconds.
    pub min_duration: f64,
    /// Upper bound on the ideal display duration; rebalancing may exceed it.
    pub max_duration: f64,
    /// Minimum separation between consecutive cues in seconds.
    pub min_gap: f64,
    /// A cue shorter than this is a rebalance receiver.
    pub short_threshold: f64,
    /// A cue longer than this is a rebalance donor.
    pub long_threshold: f64,
    /// Maximum lead-in shift in seconds.
    pub max_anticipation: f64,
    /// Merge duplicate/continuation cues before optimizing. Off by default.
    pub merge_duplicates: bool,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            chars_per_sec: 20.0,
            min_duration: 1.0,
            max_duration: 8.0,
            min_gap: 0.05,
            short_threshold: 0.8,
            long_threshold: 3.0,
            max_anticipation: 0.5,
            merge_duplicates: false,
        }
    }
}

impl OptimizeConfig {
    /// Range and cross-field checks. All violations are collected into a
    /// single error so the user sees everything at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(10.0..=40.0).contains(&self.chars_per_sec) {
            errors.push("chars_per_sec must be between 10 and 40".to_string());
        }
        if !(0.5..=2.0).contains(&self.min_duration) {
            errors.push("min_duration must be between 0.5 and 2 seconds".to_string());
        }
        if !(3.0..=15.0).contains(&self.max_duration) {
            errors.push("max_duration must be between 3 and 15 seconds".to_string());
        }
        if self.min_duration >= self.max_duration {
            errors.push("min_duration must be less than max_duration".to_string());
        }
        if !(0.01..=0.2).contains(&self.min_gap) {
            errors.push("min_gap must be between 0.01 and 0.2 seconds".to_string());
        }
        if !(0.5..=1.5).contains(&self.short_threshold) {
            errors.push("short_threshold must be between 0.5 and 1.5 seconds".to_string());
        }
        if !(2.0..=6.0).contains(&self.long_threshold) {
            errors.push("long_threshold must be between 2 and 6 seconds".to_string());
        }
        if self.short_threshold >= self.long_threshold {
            errors.push("short_threshold must be less than long_threshold".to_string());
        }
        if !(0.0..=1.0).contains(&self.max_anticipation) {
            errors.push("max_anticipation must be between 0 and 1 second".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

/// Persistent defaults from `~/.config/subpace/config.toml`. Every field is
/// optional; values set here are overridden by CLI flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub chars_per_sec: Option<f64>,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub min_gap: Option<f64>,
    pub short_threshold: Option<f64>,
    pub long_threshold: Option<f64>,
    pub max_anticipation: Option<f64>,
    pub label: Option<String>,
}

impl Defaults {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("subpace").join("config.toml"))
    }

    /// Load the defaults file. A missing file yields empty defaults; a
    /// malformed one is an error.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading defaults file {}", path.display()))?;
        let defaults: Self = toml::from_str(&content)
            .with_context(|| format!("parsing defaults file {}", path.display()))?;
        Ok(defaults)
    }

    /// Fold the file values into a config; CLI-provided overrides are
    /// applied by the caller afterwards.
    pub fn apply(&self, config: &mut OptimizeConfig) {
        if let Some(value) = self.chars_per_sec {
            config.chars_per_sec = value;
        }
        if let Some(value) = self.min_duration {
            config.min_duration = value;
        }
        if let Some(value) = self.max_duration {
            config.max_duration = value;
        }
        if let Some(value) = self.min_gap {
            config.min_gap = value;
        }
        if let Some(value) = self.short_threshold {
            config.short_threshold = value;
        }
        if let Some(value) = self.long_threshold {
            config.long_threshold = value;
        }
        if let Some(value) = self.max_anticipation {
            config.max_anticipation = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(OptimizeConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_speed_is_rejected() {
        let config = OptimizeConfig {
            chars_per_sec: 50.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chars_per_sec"));
    }

    #[test]
    fn cross_field_violations_are_reported_together() {
        let config = OptimizeConfig {
            min_duration: 2.0,
            max_duration: 3.0,
            short_threshold: 1.5,
            long_threshold: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = OptimizeConfig {
            chars_per_sec: 5.0,
            max_anticipation: 2.0,
            ..Default::default()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("chars_per_sec"));
        assert!(message.contains("max_anticipation"));
    }

    #[test]
    fn defaults_file_overrides_only_present_fields() {
        let defaults: Defaults =
            toml::from_str("chars_per_sec = 15.0\nlabel = \"tuned\"").expect("parse defaults");
        let mut config = OptimizeConfig::default();
        defaults.apply(&mut config);
        assert!((config.chars_per_sec - 15.0).abs() < 1e-9);
        assert!((config.min_gap - 0.05).abs() < 1e-9);
        assert_eq!(defaults.label.as_deref(), Some("tuned"));
    }

    #[test]
    fn missing_defaults_file_is_not_an_error() {
        let loaded = Defaults::load_from_path("/nonexistent/subpace/config.toml")
            .expect("missing file yields defaults");
        assert!(loaded.chars_per_sec.is_none());
    }
}
