//! Playback controller core: one authoritative [`PlayerState`] driven by
//! native player events and user commands, with error classification,
//! automatic network retry, playlist navigation and track selection.
//!
//! The native media engine is injected through [`PlayerPlatform`].

pub mod config;
pub mod constants;
pub mod models;
pub mod player;
pub mod utils;

pub use config::{Config, ErrorRecoveryOptions, SubtitleRenderMode, VideoPlayerOptions};
pub use models::{
    AudioTrack, MediaMetadata, PlayerId, Playlist, RepeatMode, SubtitleCue, SubtitleSource,
    SubtitleTrack, VideoQualityTrack, VideoSource,
};
pub use player::{
    PlatformError, PlaybackState, PlayerController, PlayerEvent, PlayerPlatform, PlayerState,
};
pub use utils::errors::{ControllerError, ControllerResult};
