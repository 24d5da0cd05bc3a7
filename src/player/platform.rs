use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

use super::events::{PlatformError, PlayerEvent};
use super::types::{FullscreenOrientation, PipOptions, ScalingMode};
use crate::config::VideoPlayerOptions;
use crate::models::{
    AudioTrack, MediaMetadata, PlayerId, SubtitleSource, SubtitleTrack, VideoQualityTrack,
    VideoSource,
};

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Native media engine the controller drives.
///
/// Implementations are injected into the controller at construction. Every
/// command is keyed by the id returned from [`PlayerPlatform::create`].
#[async_trait]
pub trait PlayerPlatform: Send + Sync {
    async fn create(
        &self,
        source: &VideoSource,
        options: &VideoPlayerOptions,
    ) -> PlatformResult<PlayerId>;
    async fn dispose(&self, player_id: PlayerId) -> PlatformResult<()>;

    /// Ordered event stream for one player instance
    fn events(&self, player_id: PlayerId) -> BoxStream<'static, PlayerEvent>;

    async fn play(&self, player_id: PlayerId) -> PlatformResult<()>;
    async fn pause(&self, player_id: PlayerId) -> PlatformResult<()>;
    async fn stop(&self, player_id: PlayerId) -> PlatformResult<()>;
    async fn seek_to(&self, player_id: PlayerId, position: Duration) -> PlatformResult<()>;
    async fn set_volume(&self, player_id: PlayerId, volume: f64) -> PlatformResult<()>;
    async fn set_playback_speed(&self, player_id: PlayerId, speed: f64) -> PlatformResult<()>;
    async fn set_looping(&self, player_id: PlayerId, looping: bool) -> PlatformResult<()>;
    async fn set_scaling_mode(&self, player_id: PlayerId, mode: ScalingMode) -> PlatformResult<()>;

    /// `None` turns subtitles off
    async fn set_subtitle_track(
        &self,
        player_id: PlayerId,
        track: Option<&SubtitleTrack>,
    ) -> PlatformResult<()>;
    /// `None` restores the default audio track
    async fn set_audio_track(
        &self,
        player_id: PlayerId,
        track: Option<&AudioTrack>,
    ) -> PlatformResult<()>;

    async fn set_video_quality(
        &self,
        player_id: PlayerId,
        track: &VideoQualityTrack,
    ) -> PlatformResult<bool>;
    async fn get_video_qualities(&self, player_id: PlayerId)
    -> PlatformResult<Vec<VideoQualityTrack>>;
    async fn get_current_video_quality(
        &self,
        player_id: PlayerId,
    ) -> PlatformResult<Option<VideoQualityTrack>>;
    async fn is_quality_selection_supported(&self, player_id: PlayerId) -> PlatformResult<bool>;

    async fn set_background_playback(
        &self,
        player_id: PlayerId,
        enabled: bool,
    ) -> PlatformResult<bool>;
    async fn is_background_playback_supported(&self, player_id: PlayerId) -> PlatformResult<bool>;

    async fn set_media_metadata(
        &self,
        player_id: PlayerId,
        metadata: &MediaMetadata,
    ) -> PlatformResult<()>;

    async fn add_external_subtitle(
        &self,
        player_id: PlayerId,
        source: &SubtitleSource,
    ) -> PlatformResult<Option<SubtitleTrack>>;
    async fn remove_external_subtitle(
        &self,
        player_id: PlayerId,
        track_id: &str,
    ) -> PlatformResult<bool>;
    async fn get_external_subtitles(&self, player_id: PlayerId)
    -> PlatformResult<Vec<SubtitleTrack>>;

    async fn enter_pip(
        &self,
        player_id: PlayerId,
        options: Option<&PipOptions>,
    ) -> PlatformResult<bool>;
    async fn exit_pip(&self, player_id: PlayerId) -> PlatformResult<()>;
    async fn is_pip_supported(&self, player_id: PlayerId) -> PlatformResult<bool>;

    async fn enter_fullscreen(
        &self,
        player_id: PlayerId,
        orientation: Option<FullscreenOrientation>,
    ) -> PlatformResult<bool>;
    async fn exit_fullscreen(&self, player_id: PlayerId) -> PlatformResult<()>;

    async fn start_casting(&self, player_id: PlayerId) -> PlatformResult<()>;
    async fn stop_casting(&self, player_id: PlayerId) -> PlatformResult<()>;
    async fn is_casting_supported(&self, player_id: PlayerId) -> PlatformResult<bool>;
}
