use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

use crate::heuristics::DEFAULT_MIN_CONFIDENCE;

pub const DEFAULT_CONFIG_PATH: &str = ".config/receipt_scan.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Observations at or below this confidence are left out of extraction.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_endpoint() -> String {
    "http://localhost:8001/recognize".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            min_confidence: default_min_confidence(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "receipts/receipts.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_points_per_receipt")]
    pub points_per_receipt: i64,
    /// Same merchant + total inside this window is treated as a resubmission.
    #[serde(default = "default_duplicate_window_minutes")]
    pub duplicate_window_minutes: i64,
}

fn default_points_per_receipt() -> i64 {
    25
}

fn default_duplicate_window_minutes() -> i64 {
    60
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points_per_receipt: default_points_per_receipt(),
            duplicate_window_minutes: default_duplicate_window_minutes(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No config file — using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let cfg: Self = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.rewards.duplicate_window_minutes < 0 {
            return Err(format!(
                "rewards.duplicate_window_minutes must not be negative, got {}",
                self.rewards.duplicate_window_minutes
            )
            .into());
        }
        Ok(())
    }
}
