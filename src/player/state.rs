use chrono::TimeDelta;
use std::time::Duration;

use super::classifier::PlayerError;
use super::playlist;
use super::types::{BufferingReason, Lifecycle, PlaybackState, ScalingMode, VideoSize};
use crate::config::VideoPlayerOptions;
use crate::constants::{DEFAULT_PLAYBACK_SPEED, DEFAULT_VOLUME};
use crate::models::{
    AudioTrack, MediaMetadata, Playlist, SubtitleCue, SubtitleTrack, VideoQualityTrack,
};

/// Immutable snapshot of everything observers may know about a player.
///
/// The controller never mutates a published snapshot; every accepted event
/// or command produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub lifecycle: Lifecycle,
    pub playback_state: PlaybackState,

    pub position: Duration,
    pub duration: Duration,
    pub buffered_position: Duration,

    pub volume: f64,
    pub playback_speed: f64,
    pub is_looping: bool,
    pub is_fullscreen: bool,
    pub is_pip_active: bool,
    pub is_background_playback_enabled: bool,
    pub is_casting: bool,
    pub scaling_mode: ScalingMode,

    pub video_size: Option<VideoSize>,

    pub subtitle_tracks: Vec<SubtitleTrack>,
    pub audio_tracks: Vec<AudioTrack>,
    pub quality_tracks: Vec<VideoQualityTrack>,
    pub selected_subtitle_track: Option<SubtitleTrack>,
    pub selected_audio_track: Option<AudioTrack>,
    /// `None` means automatic quality selection
    pub selected_quality_track: Option<VideoQualityTrack>,

    pub current_embedded_cue: Option<SubtitleCue>,
    pub subtitle_offset: TimeDelta,

    pub error_message: Option<String>,
    pub last_error: Option<PlayerError>,

    pub network_retry_count: u32,
    pub is_recovering_from_error: bool,
    pub is_network_buffering: bool,
    pub buffering_reason: Option<BufferingReason>,

    pub playlist: Option<Playlist>,

    pub metadata: MediaMetadata,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            playback_state: PlaybackState::Uninitialized,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            buffered_position: Duration::ZERO,
            volume: DEFAULT_VOLUME,
            playback_speed: DEFAULT_PLAYBACK_SPEED,
            is_looping: false,
            is_fullscreen: false,
            is_pip_active: false,
            is_background_playback_enabled: false,
            is_casting: false,
            scaling_mode: ScalingMode::default(),
            video_size: None,
            subtitle_tracks: Vec::new(),
            audio_tracks: Vec::new(),
            quality_tracks: Vec::new(),
            selected_subtitle_track: None,
            selected_audio_track: None,
            selected_quality_track: None,
            current_embedded_cue: None,
            subtitle_offset: TimeDelta::zero(),
            error_message: None,
            last_error: None,
            network_retry_count: 0,
            is_recovering_from_error: false,
            is_network_buffering: false,
            buffering_reason: None,
            playlist: None,
            metadata: MediaMetadata::default(),
        }
    }
}

impl PlayerState {
    /// State right after a native player was created with `options`
    pub fn ready_with(&self, options: &VideoPlayerOptions) -> PlayerState {
        PlayerState {
            lifecycle: Lifecycle::Ready,
            playback_state: PlaybackState::Ready,
            volume: options.volume,
            playback_speed: options.playback_speed,
            is_looping: options.looping,
            scaling_mode: options.scaling_mode,
            ..self.for_new_media()
        }
    }

    /// Drop everything tied to the current media, keeping user preferences
    /// (volume, speed, looping, display modes, subtitle offset, playlist).
    pub fn for_new_media(&self) -> PlayerState {
        PlayerState {
            lifecycle: self.lifecycle,
            playback_state: self.playback_state,
            volume: self.volume,
            playback_speed: self.playback_speed,
            is_looping: self.is_looping,
            is_fullscreen: self.is_fullscreen,
            is_pip_active: self.is_pip_active,
            is_background_playback_enabled: self.is_background_playback_enabled,
            is_casting: self.is_casting,
            scaling_mode: self.scaling_mode,
            subtitle_offset: self.subtitle_offset,
            playlist: self.playlist.clone(),
            ..PlayerState::default()
        }
    }

    /// Enter the error state; keeps `error_message` and `last_error` in sync
    pub fn with_error(&self, error: PlayerError) -> PlayerState {
        PlayerState {
            playback_state: PlaybackState::Error,
            error_message: Some(error.message.clone()),
            last_error: Some(error),
            is_recovering_from_error: false,
            is_network_buffering: false,
            buffering_reason: None,
            ..self.clone()
        }
    }

    /// Move to `playback_state`, dropping error details when leaving `Error`
    pub fn with_playback_state(&self, playback_state: PlaybackState) -> PlayerState {
        let mut next = self.clone();
        next.playback_state = playback_state;
        if playback_state != PlaybackState::Error {
            next.error_message = None;
            next.last_error = None;
        }
        next
    }

    /// Terminal snapshot published by `dispose()`
    pub fn disposed(&self) -> PlayerState {
        PlayerState {
            lifecycle: Lifecycle::Disposed,
            playback_state: PlaybackState::Disposed,
            is_recovering_from_error: false,
            is_network_buffering: false,
            buffering_reason: None,
            ..self.clone()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    pub fn is_playing(&self) -> bool {
        self.playback_state == PlaybackState::Playing
    }

    pub fn has_error(&self) -> bool {
        self.playback_state == PlaybackState::Error
    }

    pub fn is_buffering(&self) -> bool {
        self.playback_state == PlaybackState::Buffering
    }

    /// Width over height of the last reported frame size
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.video_size.map(|size| size.aspect_ratio())
    }

    /// Played fraction in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.position)
    }

    /// The embedded cue, if it is active at the current position
    pub fn active_cue(&self) -> Option<&SubtitleCue> {
        self.current_embedded_cue
            .as_ref()
            .filter(|cue| cue.is_active_at(self.position, self.subtitle_offset))
    }

    pub fn playlist_index(&self) -> Option<usize> {
        self.playlist.as_ref().map(|playlist| playlist.index)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    pub fn has_next(&self) -> bool {
        self.playlist.as_ref().is_some_and(playlist::has_next)
    }

    pub fn has_previous(&self) -> bool {
        self.playlist.as_ref().is_some_and(playlist::has_previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::classifier::{ErrorCategory, ErrorSeverity};

    fn sample_error() -> PlayerError {
        PlayerError {
            message: "decoder crashed".to_string(),
            code: None,
            category: ErrorCategory::Decoder,
            severity: ErrorSeverity::Fatal,
            max_retries: 3,
        }
    }

    #[test]
    fn test_default_state() {
        let state = PlayerState::default();
        assert_eq!(state.lifecycle, Lifecycle::Uninitialized);
        assert_eq!(state.playback_state, PlaybackState::Uninitialized);
        assert_eq!(state.volume, 1.0);
        assert!(state.video_size.is_none());
        assert!(state.aspect_ratio().is_none());
    }

    #[test]
    fn test_error_invariant() {
        let state = PlayerState::default().with_error(sample_error());
        assert!(state.has_error());
        assert_eq!(state.error_message.as_deref(), Some("decoder crashed"));

        let recovered = state.with_playback_state(PlaybackState::Ready);
        assert!(recovered.error_message.is_none());
        assert!(recovered.last_error.is_none());
    }

    #[test]
    fn test_for_new_media_keeps_preferences() {
        let state = PlayerState {
            volume: 0.4,
            is_fullscreen: true,
            position: Duration::from_secs(30),
            subtitle_tracks: vec![SubtitleTrack::embedded("s1", Some("en"))],
            video_size: Some(VideoSize::new(640, 480)),
            ..PlayerState::default()
        };
        let fresh = state.for_new_media();
        assert_eq!(fresh.volume, 0.4);
        assert!(fresh.is_fullscreen);
        assert_eq!(fresh.position, Duration::ZERO);
        assert!(fresh.subtitle_tracks.is_empty());
        assert!(fresh.video_size.is_none());
    }

    #[test]
    fn test_progress_and_remaining() {
        let state = PlayerState {
            position: Duration::from_secs(30),
            duration: Duration::from_secs(120),
            ..PlayerState::default()
        };
        assert!((state.progress() - 0.25).abs() < f64::EPSILON);
        assert_eq!(state.remaining(), Duration::from_secs(90));

        let lagging = PlayerState {
            position: Duration::from_secs(130),
            duration: Duration::from_secs(120),
            ..PlayerState::default()
        };
        assert_eq!(lagging.progress(), 1.0);
        assert_eq!(lagging.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_active_cue_uses_offset() {
        let state = PlayerState {
            position: Duration::from_millis(10_500),
            current_embedded_cue: Some(SubtitleCue::new(
                "line",
                Duration::from_secs(10),
                Duration::from_secs(11),
            )),
            ..PlayerState::default()
        };
        assert!(state.active_cue().is_some());

        let shifted = PlayerState {
            subtitle_offset: TimeDelta::seconds(1),
            ..state
        };
        assert!(shifted.active_cue().is_none());
    }
}
