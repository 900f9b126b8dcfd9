use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Wayfarer assistant.
///
/// Loaded from `~/.wayfarer/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WayfarerConfig {
    pub general: GeneralConfig,
    pub chat: ChatSettings,
    pub media: MediaSettings,
    pub live: LiveSettings,
}

impl WayfarerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WayfarerConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the session database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Language code new sessions start in.
    pub default_language: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.wayfarer".to_string(),
            log_level: "info".to_string(),
            default_language: "en-US".to_string(),
        }
    }
}

/// Conversation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// A sustainability tip is surfaced after every N-th user turn.
    pub tip_stride: u32,
    /// Delay before the tip message lands, in milliseconds.
    pub tip_delay_ms: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            tip_stride: 5,
            tip_delay_ms: 500,
        }
    }
}

/// Media generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Interval between video job status checks, in seconds.
    pub video_poll_interval_secs: u64,
    /// Aspect ratio submitted with video jobs.
    pub video_aspect_ratio: String,
    /// Access token appended to playable video URLs.
    pub access_token: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            video_poll_interval_secs: 10,
            video_aspect_ratio: "16:9".to_string(),
            access_token: String::new(),
        }
    }
}

/// Live audio session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    /// Sample rate of microphone frames sent upstream, in Hz.
    pub input_sample_rate: u32,
    /// Sample rate of server audio payloads, in Hz.
    pub output_sample_rate: u32,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            input_sample_rate: 16_000,
            output_sample_rate: 24_000,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
