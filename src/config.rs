use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_MAX_AUTO_RETRIES, DEFAULT_PLAYBACK_SPEED,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_VOLUME, MAX_VOLUME,
    MIN_VOLUME,
};
use crate::player::types::ScalingMode;
use crate::utils::errors::ControllerError;

/// How subtitles reach the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleRenderMode {
    /// Let the platform pick
    #[default]
    Auto,
    /// Rendered by the native player
    Native,
    /// Cues are delivered as events and drawn by the presentation layer
    Overlay,
}

/// Options a player instance is initialized with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPlayerOptions {
    #[serde(default)]
    pub auto_play: bool,

    #[serde(default)]
    pub looping: bool,

    #[serde(default = "default_volume")]
    pub volume: f64,

    #[serde(default = "default_speed")]
    pub playback_speed: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_position_ms: Option<u64>,

    #[serde(default)]
    pub mix_with_others: bool,

    #[serde(default)]
    pub allow_background_playback: bool,

    #[serde(default = "default_true")]
    pub allow_pip: bool,

    #[serde(default)]
    pub auto_enter_pip_on_background: bool,

    #[serde(default = "default_true")]
    pub allow_casting: bool,

    #[serde(default = "default_true")]
    pub subtitles_enabled: bool,

    #[serde(default)]
    pub show_subtitles_by_default: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_subtitle_language: Option<String>,

    #[serde(default)]
    pub subtitle_render_mode: SubtitleRenderMode,

    #[serde(default = "default_true")]
    pub audio_tracks_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_audio_language: Option<String>,

    #[serde(default)]
    pub scaling_mode: ScalingMode,
}

/// Automatic recovery from network failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecoveryOptions {
    #[serde(default = "default_true")]
    pub auto_retry_enabled: bool,

    #[serde(default = "default_max_retries")]
    pub max_auto_retries: u32,

    #[serde(default = "default_base_delay")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub retry_max_delay_ms: u64,
}

/// File-backed configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: VideoPlayerOptions,

    #[serde(default)]
    pub recovery: ErrorRecoveryOptions,
}

impl VideoPlayerOptions {
    /// Check value ranges before anything reaches the native layer
    pub fn validate(&self) -> Result<(), ControllerError> {
        validate_volume(self.volume)?;
        validate_speed(self.playback_speed)?;
        Ok(())
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    pub fn with_preferred_subtitle_language(mut self, language: impl Into<String>) -> Self {
        self.preferred_subtitle_language = Some(language.into());
        self
    }
}

impl ErrorRecoveryOptions {
    pub fn disabled() -> Self {
        Self {
            auto_retry_enabled: false,
            ..Default::default()
        }
    }
}

pub(crate) fn validate_volume(volume: f64) -> Result<(), ControllerError> {
    if !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
        return Err(ControllerError::Validation(format!(
            "volume must be between {} and {}, got {}",
            MIN_VOLUME, MAX_VOLUME, volume
        )));
    }
    Ok(())
}

pub(crate) fn validate_speed(speed: f64) -> Result<(), ControllerError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ControllerError::Validation(format!(
            "playback speed must be greater than 0, got {}",
            speed
        )));
    }
    Ok(())
}

impl Config {
    /// Load from the default location, writing defaults when missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            debug!("Loading config from {:?}", config_path);
            let contents =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            let config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            info!("Config loaded successfully");
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }
}

impl Default for VideoPlayerOptions {
    fn default() -> Self {
        Self {
            auto_play: false,
            looping: false,
            volume: default_volume(),
            playback_speed: default_speed(),
            start_position_ms: None,
            mix_with_others: false,
            allow_background_playback: false,
            allow_pip: default_true(),
            auto_enter_pip_on_background: false,
            allow_casting: default_true(),
            subtitles_enabled: default_true(),
            show_subtitles_by_default: false,
            preferred_subtitle_language: None,
            subtitle_render_mode: SubtitleRenderMode::default(),
            audio_tracks_enabled: default_true(),
            preferred_audio_language: None,
            scaling_mode: ScalingMode::default(),
        }
    }
}

impl Default for ErrorRecoveryOptions {
    fn default() -> Self {
        Self {
            auto_retry_enabled: default_true(),
            max_auto_retries: default_max_retries(),
            retry_base_delay_ms: default_base_delay(),
            retry_max_delay_ms: default_max_delay(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_volume() -> f64 { DEFAULT_VOLUME }
fn default_speed() -> f64 { DEFAULT_PLAYBACK_SPEED }
fn default_max_retries() -> u32 { DEFAULT_MAX_AUTO_RETRIES }
fn default_base_delay() -> u64 { DEFAULT_RETRY_BASE_DELAY_MS }
fn default_max_delay() -> u64 { DEFAULT_RETRY_MAX_DELAY_MS }
