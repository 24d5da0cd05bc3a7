//! Folding native events into the state snapshot.
//!
//! [`reconcile`] is a pure function: it never talks to the native player.
//! Anything that needs a native call comes back as an [`Effect`] which the
//! controller executes before handling the next event.

use std::time::Duration;
use tracing::{debug, trace, warn};

use super::classifier::{classify, classify_network, PlayerError};
use super::events::{PlatformError, PlayerEvent};
use super::playlist::{self, CompletionAction};
use super::retry::{on_recovered, RetryDecision, RetryPolicy};
use super::state::PlayerState;
use super::tracks::{resolve_audio, resolve_subtitles, TrackUpdate};
use super::types::{BufferingReason, PlaybackState, VideoSize};
use crate::config::VideoPlayerOptions;
use crate::constants::GENERIC_PLAYBACK_ERROR;
use crate::models::{AudioTrack, MediaMetadata, SubtitleTrack};

/// Native work requested by a reconciliation step
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SelectSubtitleTrack(SubtitleTrack),
    SelectAudioTrack(AudioTrack),
    /// Arm the backoff timer for retry number `attempt`
    ScheduleRetry { attempt: u32, delay: Duration },
    /// Run retry number `attempt` now, dropping any pending timer
    RetryNow { attempt: u32 },
    CancelRetry,
    /// Replace the native player with the playlist item at `index`
    LoadPlaylistItem { index: usize },
    /// Seek to the start and play again
    RestartCurrent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub state: PlayerState,
    pub effects: Vec<Effect>,
}

impl Reconciliation {
    fn state(state: PlayerState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with_effect(state: PlayerState, effect: Effect) -> Self {
        Self {
            state,
            effects: vec![effect],
        }
    }
}

/// Inputs the reconciler reads besides the state itself
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub options: &'a VideoPlayerOptions,
    pub policy: &'a RetryPolicy,
}

/// Fold one event into the next state.
///
/// A disposed state is terminal and is returned unchanged.
pub fn reconcile(
    state: &PlayerState,
    event: PlayerEvent,
    ctx: &ReconcileContext<'_>,
) -> Reconciliation {
    if state.is_disposed() {
        trace!("Ignoring {} after dispose", event.name());
        return Reconciliation::state(state.clone());
    }

    match event {
        PlayerEvent::PlaybackStateChanged(playback_state) => {
            on_playback_state(state, playback_state, ctx.policy)
        }
        PlayerEvent::PositionChanged(position) => Reconciliation::state(PlayerState {
            position,
            ..state.clone()
        }),
        PlayerEvent::DurationChanged(duration) => Reconciliation::state(PlayerState {
            duration,
            ..state.clone()
        }),
        PlayerEvent::BufferedPositionChanged(buffered_position) => {
            Reconciliation::state(PlayerState {
                buffered_position,
                ..state.clone()
            })
        }
        PlayerEvent::VideoSizeChanged { width, height } => Reconciliation::state(PlayerState {
            video_size: Some(VideoSize::new(width, height)),
            ..state.clone()
        }),
        PlayerEvent::Error(raw) => {
            let error = classify(&raw, ctx.policy.max_auto_retries);
            if error.is_auto_retryable() {
                on_network_failure(state, error, ctx.policy)
            } else {
                warn!("Playback error: {}", error);
                Reconciliation::with_effect(state.with_error(error), Effect::CancelRetry)
            }
        }
        PlayerEvent::NetworkError { message } => {
            let error = classify_network(&message, ctx.policy.max_auto_retries);
            on_network_failure(state, error, ctx.policy)
        }
        PlayerEvent::NetworkStateChanged { connected } => {
            if connected && state.is_recovering_from_error {
                debug!("Network is back, retrying immediately");
                Reconciliation::with_effect(
                    state.clone(),
                    Effect::RetryNow {
                        attempt: state.network_retry_count,
                    },
                )
            } else {
                Reconciliation::state(state.clone())
            }
        }
        PlayerEvent::PipStateChanged { is_active } => Reconciliation::state(PlayerState {
            is_pip_active: is_active,
            ..state.clone()
        }),
        PlayerEvent::FullscreenStateChanged { is_fullscreen } => {
            Reconciliation::state(PlayerState {
                is_fullscreen,
                ..state.clone()
            })
        }
        PlayerEvent::BackgroundPlaybackChanged { is_enabled } => {
            Reconciliation::state(PlayerState {
                is_background_playback_enabled: is_enabled,
                ..state.clone()
            })
        }
        PlayerEvent::CastingStateChanged { is_casting } => Reconciliation::state(PlayerState {
            is_casting,
            ..state.clone()
        }),
        PlayerEvent::PlaybackCompleted => on_completed(state),
        PlayerEvent::SubtitleTracksChanged(tracks) => {
            match resolve_subtitles(state, tracks, ctx.options) {
                TrackUpdate::Ignored => Reconciliation::state(state.clone()),
                TrackUpdate::Recorded {
                    tracks,
                    auto_select,
                } => Reconciliation {
                    state: PlayerState {
                        subtitle_tracks: tracks,
                        ..state.clone()
                    },
                    effects: auto_select
                        .map(Effect::SelectSubtitleTrack)
                        .into_iter()
                        .collect(),
                },
            }
        }
        PlayerEvent::AudioTracksChanged(tracks) => {
            match resolve_audio(state, tracks, ctx.options) {
                TrackUpdate::Ignored => Reconciliation::state(state.clone()),
                TrackUpdate::Recorded {
                    tracks,
                    auto_select,
                } => Reconciliation {
                    state: PlayerState {
                        audio_tracks: tracks,
                        ..state.clone()
                    },
                    effects: auto_select
                        .map(Effect::SelectAudioTrack)
                        .into_iter()
                        .collect(),
                },
            }
        }
        PlayerEvent::VideoQualityTracksChanged(quality_tracks) => {
            Reconciliation::state(PlayerState {
                quality_tracks,
                ..state.clone()
            })
        }
        PlayerEvent::SelectedSubtitleChanged(track) => Reconciliation::state(PlayerState {
            selected_subtitle_track: track,
            ..state.clone()
        }),
        PlayerEvent::SelectedAudioChanged(track) => Reconciliation::state(PlayerState {
            selected_audio_track: track,
            ..state.clone()
        }),
        PlayerEvent::SelectedQualityChanged(track) => Reconciliation::state(PlayerState {
            selected_quality_track: track,
            ..state.clone()
        }),
        PlayerEvent::PlaybackSpeedChanged(playback_speed) => Reconciliation::state(PlayerState {
            playback_speed,
            ..state.clone()
        }),
        PlayerEvent::VolumeChanged(volume) => Reconciliation::state(PlayerState {
            volume,
            ..state.clone()
        }),
        PlayerEvent::MetadataChanged {
            title,
            artist,
            album,
            artwork_url,
        } => {
            let update = MediaMetadata {
                title,
                artist,
                album,
                artwork_url,
            };
            Reconciliation::state(PlayerState {
                metadata: state.metadata.merged_with(&update),
                ..state.clone()
            })
        }
        PlayerEvent::EmbeddedSubtitleCue(cue) => Reconciliation::state(PlayerState {
            current_embedded_cue: cue,
            ..state.clone()
        }),
        PlayerEvent::BufferingStarted { reason } => {
            if state.has_error() {
                return Reconciliation::state(state.clone());
            }
            Reconciliation::state(PlayerState {
                playback_state: PlaybackState::Buffering,
                buffering_reason: Some(reason),
                is_network_buffering: state.is_network_buffering
                    || reason == BufferingReason::NetworkUnstable,
                ..state.clone()
            })
        }
        PlayerEvent::BufferingEnded => Reconciliation::state(PlayerState {
            is_network_buffering: false,
            buffering_reason: None,
            ..state.clone()
        }),
        PlayerEvent::PlaybackRecovered { retries_used } => {
            debug!("Playback recovered after {} retries", retries_used);
            Reconciliation::with_effect(on_recovered(state), Effect::CancelRetry)
        }
        PlayerEvent::PlaylistTrackChanged { index } => match &state.playlist {
            Some(list) if index < list.len() => Reconciliation::state(PlayerState {
                playlist: Some(playlist::move_to(list, index)),
                ..state.clone()
            }),
            _ => {
                warn!("Ignoring playlist track change to invalid index {}", index);
                Reconciliation::state(state.clone())
            }
        },
    }
}

fn on_playback_state(
    state: &PlayerState,
    playback_state: PlaybackState,
    policy: &RetryPolicy,
) -> Reconciliation {
    match playback_state {
        // Lifecycle states belong to the controller
        PlaybackState::Uninitialized | PlaybackState::Disposed => {
            debug!("Ignoring native report of {}", playback_state.as_str());
            Reconciliation::state(state.clone())
        }
        PlaybackState::Error => {
            if state.has_error() {
                return Reconciliation::state(state.clone());
            }
            let error = classify(
                &PlatformError::new(GENERIC_PLAYBACK_ERROR),
                policy.max_auto_retries,
            );
            Reconciliation::with_effect(state.with_error(error), Effect::CancelRetry)
        }
        PlaybackState::Playing if state.is_recovering_from_error => {
            debug!("Playback resumed while recovering");
            Reconciliation::with_effect(on_recovered(state), Effect::CancelRetry)
        }
        other => Reconciliation::state(state.with_playback_state(other)),
    }
}

fn on_network_failure(
    state: &PlayerState,
    error: PlayerError,
    policy: &RetryPolicy,
) -> Reconciliation {
    let (next, decision) = policy.on_network_error(state, error);
    let effect = match decision {
        RetryDecision::Retry { attempt, delay } => Effect::ScheduleRetry { attempt, delay },
        RetryDecision::GiveUp => Effect::CancelRetry,
    };
    Reconciliation::with_effect(next, effect)
}

fn on_completed(state: &PlayerState) -> Reconciliation {
    let Some(list) = &state.playlist else {
        return Reconciliation::state(state.with_playback_state(PlaybackState::Completed));
    };

    match playlist::on_completed(list) {
        CompletionAction::RestartCurrent => {
            Reconciliation::with_effect(state.clone(), Effect::RestartCurrent)
        }
        CompletionAction::Advance(index) => {
            debug!("Advancing playlist to item {}", index);
            Reconciliation::with_effect(state.clone(), Effect::LoadPlaylistItem { index })
        }
        CompletionAction::EndOfPlaylist => {
            debug!("Reached end of playlist");
            Reconciliation::state(state.with_playback_state(PlaybackState::Completed))
        }
    }
}
