use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::classifier::{ErrorCategory, ErrorSeverity};
use super::types::{BufferingReason, PlaybackState};
use crate::models::{AudioTrack, SubtitleCue, SubtitleTrack, VideoQualityTrack};

/// Failure reported by the native layer, either as a bare message or with
/// structured classification fields.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
    pub code: Option<String>,
    pub category: Option<ErrorCategory>,
    pub severity: Option<ErrorSeverity>,
    pub max_retries: Option<u32>,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            category: None,
            severity: None,
            max_retries: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Whether the native layer supplied its own classification
    pub fn is_structured(&self) -> bool {
        self.category.is_some() || self.severity.is_some() || self.max_retries.is_some()
    }
}

/// One signal from the native player's event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    PlaybackStateChanged(PlaybackState),
    PositionChanged(Duration),
    DurationChanged(Duration),
    BufferedPositionChanged(Duration),
    VideoSizeChanged { width: u32, height: u32 },
    Error(PlatformError),
    PipStateChanged { is_active: bool },
    PlaybackCompleted,
    SubtitleTracksChanged(Vec<SubtitleTrack>),
    AudioTracksChanged(Vec<AudioTrack>),
    VideoQualityTracksChanged(Vec<VideoQualityTrack>),
    SelectedSubtitleChanged(Option<SubtitleTrack>),
    SelectedAudioChanged(Option<AudioTrack>),
    SelectedQualityChanged(Option<VideoQualityTrack>),
    PlaybackSpeedChanged(f64),
    VolumeChanged(f64),
    MetadataChanged {
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
        artwork_url: Option<String>,
    },
    /// `None` clears the current cue
    EmbeddedSubtitleCue(Option<SubtitleCue>),
    BackgroundPlaybackChanged { is_enabled: bool },
    FullscreenStateChanged { is_fullscreen: bool },
    CastingStateChanged { is_casting: bool },
    NetworkError { message: String },
    NetworkStateChanged { connected: bool },
    BufferingStarted { reason: BufferingReason },
    BufferingEnded,
    PlaybackRecovered { retries_used: u32 },
    PlaylistTrackChanged { index: usize },
}

impl PlayerEvent {
    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged(_) => "playback_state_changed",
            PlayerEvent::PositionChanged(_) => "position_changed",
            PlayerEvent::DurationChanged(_) => "duration_changed",
            PlayerEvent::BufferedPositionChanged(_) => "buffered_position_changed",
            PlayerEvent::VideoSizeChanged { .. } => "video_size_changed",
            PlayerEvent::Error(_) => "error",
            PlayerEvent::PipStateChanged { .. } => "pip_state_changed",
            PlayerEvent::PlaybackCompleted => "playback_completed",
            PlayerEvent::SubtitleTracksChanged(_) => "subtitle_tracks_changed",
            PlayerEvent::AudioTracksChanged(_) => "audio_tracks_changed",
            PlayerEvent::VideoQualityTracksChanged(_) => "video_quality_tracks_changed",
            PlayerEvent::SelectedSubtitleChanged(_) => "selected_subtitle_changed",
            PlayerEvent::SelectedAudioChanged(_) => "selected_audio_changed",
            PlayerEvent::SelectedQualityChanged(_) => "selected_quality_changed",
            PlayerEvent::PlaybackSpeedChanged(_) => "playback_speed_changed",
            PlayerEvent::VolumeChanged(_) => "volume_changed",
            PlayerEvent::MetadataChanged { .. } => "metadata_changed",
            PlayerEvent::EmbeddedSubtitleCue(_) => "embedded_subtitle_cue",
            PlayerEvent::BackgroundPlaybackChanged { .. } => "background_playback_changed",
            PlayerEvent::FullscreenStateChanged { .. } => "fullscreen_state_changed",
            PlayerEvent::CastingStateChanged { .. } => "casting_state_changed",
            PlayerEvent::NetworkError { .. } => "network_error",
            PlayerEvent::NetworkStateChanged { .. } => "network_state_changed",
            PlayerEvent::BufferingStarted { .. } => "buffering_started",
            PlayerEvent::BufferingEnded => "buffering_ended",
            PlayerEvent::PlaybackRecovered { .. } => "playback_recovered",
            PlayerEvent::PlaylistTrackChanged { .. } => "playlist_track_changed",
        }
    }

    /// High-frequency events that are only traced
    pub fn is_periodic(&self) -> bool {
        matches!(
            self,
            PlayerEvent::PositionChanged(_) | PlayerEvent::BufferedPositionChanged(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_detection() {
        assert!(!PlatformError::new("boom").is_structured());
        assert!(!PlatformError::new("boom").with_code("E1").is_structured());
        assert!(PlatformError::new("boom").with_max_retries(0).is_structured());
        assert!(
            PlatformError::new("boom")
                .with_category(ErrorCategory::Format)
                .is_structured()
        );
    }

    #[test]
    fn test_platform_error_display() {
        assert_eq!(PlatformError::new("Connection refused").to_string(), "Connection refused");
    }

    #[test]
    fn test_event_names() {
        assert_eq!(PlayerEvent::PlaybackCompleted.name(), "playback_completed");
        assert!(PlayerEvent::PositionChanged(Duration::ZERO).is_periodic());
        assert!(!PlayerEvent::BufferingEnded.is_periodic());
    }
}
