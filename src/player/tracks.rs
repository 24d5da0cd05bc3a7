use tracing::debug;

use super::state::PlayerState;
use crate::config::VideoPlayerOptions;
use crate::models::{AudioTrack, SubtitleTrack};

/// Outcome of a tracks-changed event
#[derive(Debug, Clone, PartialEq)]
pub enum TrackUpdate<T> {
    /// Track handling is disabled; nothing is recorded
    Ignored,
    Recorded {
        tracks: Vec<T>,
        /// Track to select on the native player, if any
        auto_select: Option<T>,
    },
}

/// Track kinds the resolver can match by language
pub trait LanguageTagged {
    fn language_tag(&self) -> Option<&str>;
}

impl LanguageTagged for SubtitleTrack {
    fn language_tag(&self) -> Option<&str> {
        self.language()
    }
}

impl LanguageTagged for AudioTrack {
    fn language_tag(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// First track whose language equals `preferred` exactly
pub fn find_by_language<'a, T: LanguageTagged>(
    tracks: &'a [T],
    preferred: &str,
) -> Option<&'a T> {
    tracks
        .iter()
        .find(|track| track.language_tag() == Some(preferred))
}

fn resolve<T: LanguageTagged + Clone>(
    tracks: Vec<T>,
    enabled: bool,
    select_by_default: bool,
    preferred_language: Option<&str>,
    has_selection: bool,
) -> TrackUpdate<T> {
    if !enabled {
        return TrackUpdate::Ignored;
    }

    let auto_select = match preferred_language {
        Some(language) if select_by_default && !has_selection => {
            find_by_language(&tracks, language).cloned()
        }
        _ => None,
    };

    TrackUpdate::Recorded {
        tracks,
        auto_select,
    }
}

/// Subtitle tracks changed on the native player
pub fn resolve_subtitles(
    state: &PlayerState,
    tracks: Vec<SubtitleTrack>,
    options: &VideoPlayerOptions,
) -> TrackUpdate<SubtitleTrack> {
    let update = resolve(
        tracks,
        options.subtitles_enabled,
        options.show_subtitles_by_default,
        options.preferred_subtitle_language.as_deref(),
        state.selected_subtitle_track.is_some(),
    );
    if let TrackUpdate::Recorded {
        auto_select: Some(track),
        ..
    } = &update
    {
        debug!("Auto-selecting subtitle track {}", track.id());
    }
    update
}

/// Audio tracks changed; a preferred audio language acts as the
/// select-by-default switch
pub fn resolve_audio(
    state: &PlayerState,
    tracks: Vec<AudioTrack>,
    options: &VideoPlayerOptions,
) -> TrackUpdate<AudioTrack> {
    let preferred = options.preferred_audio_language.as_deref();
    let update = resolve(
        tracks,
        options.audio_tracks_enabled,
        preferred.is_some(),
        preferred,
        state.selected_audio_track.is_some(),
    );
    if let TrackUpdate::Recorded {
        auto_select: Some(track),
        ..
    } = &update
    {
        debug!("Auto-selecting audio track {}", track.id);
    }
    update
}
