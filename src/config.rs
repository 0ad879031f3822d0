//! Configuration loaded from `wavebatch.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! The `GEMINI_API_KEY` environment variable takes precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::BatchError;
use crate::gemini::client::API_URL;

pub const CONFIG_FILE: &str = "wavebatch.toml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MAX_VARIATIONS: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Gemini API key.
    #[serde(default)]
    pub api_key: String,

    /// Scheme and host of the Gemini REST API. Tests point it at a mock.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Speech model used for every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Prebuilt voice name.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Sampling temperature sent with every request.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Pause between two requests, whatever the previous one returned.
    #[serde(default = "default_request_delay_secs")]
    pub request_delay_secs: u64,

    /// Spreadsheet column holding the text, as letters or a 0-based number.
    #[serde(default = "default_text_column")]
    pub text_column: String,

    /// Generations per row.
    #[serde(default = "default_variations")]
    pub variations: u32,

    /// Parent of the timestamped per-run output directories.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
}

fn default_api_base_url() -> String {
    API_URL.to_string()
}

fn default_model() -> String {
    "gemini-2.5-pro-preview-tts".to_string()
}

fn default_voice() -> String {
    "Zephyr".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_request_delay_secs() -> u64 {
    5
}

fn default_text_column() -> String {
    "C".to_string()
}

fn default_variations() -> u32 {
    1
}

fn default_output_root() -> PathBuf {
    PathBuf::from("voice_output")
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            voice: default_voice(),
            temperature: default_temperature(),
            request_delay_secs: default_request_delay_secs(),
            text_column: default_text_column(),
            variations: default_variations(),
            output_root: default_output_root(),
        }
    }
}

impl BatchConfig {
    /// Load `wavebatch.toml` from the current directory, or defaults if it
    /// does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        let config = if path.exists() {
            Self::parse_file(path)?
        } else {
            Self::default()
        };
        Ok(config.with_env_key())
    }

    /// Load an explicit config file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self::parse_file(path)?.with_env_key())
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str::<BatchConfig>(&contents)
            .map_err(BatchError::from)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    fn with_env_key(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.is_empty()
        {
            self.api_key = key;
        }
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if !(1..=MAX_VARIATIONS).contains(&self.variations) {
            return Err(BatchError::Config(format!(
                "variations must be between 1 and {MAX_VARIATIONS}, got {}",
                self.variations
            )));
        }
        if self.model.trim().is_empty() {
            return Err(BatchError::Config("model must not be empty".into()));
        }
        Ok(())
    }

    /// Checks that only matter once requests are about to be sent.
    pub fn require_api_key(&self) -> Result<(), BatchError> {
        if self.api_key.is_empty() {
            return Err(BatchError::Config(format!(
                "no API key: set {API_KEY_ENV} or api_key in {CONFIG_FILE}"
            )));
        }
        Ok(())
    }
}
