use chrono::TimeDelta;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::capabilities::{self, Capability};
use super::classifier::classify;
use super::events::PlayerEvent;
use super::observers::StateObservers;
use super::platform::{PlatformResult, PlayerPlatform};
use super::playlist;
use super::reconciler::{reconcile, Effect, ReconcileContext};
use super::retry::{RetryPolicy, RetryScheduler};
use super::state::PlayerState;
use super::types::{FullscreenOrientation, Lifecycle, PipOptions, PlaybackState, ScalingMode};
use crate::config::{validate_speed, validate_volume, ErrorRecoveryOptions, VideoPlayerOptions};
use crate::models::{
    AudioTrack, ListenerId, MediaMetadata, PlayerId, Playlist, RepeatMode, SubtitleSource,
    SubtitleTrack, VideoQualityTrack, VideoSource,
};
use crate::utils::errors::{ControllerError, ControllerResult};

/// Messages consumed by the event loop, in arrival order
#[derive(Debug)]
enum LoopMessage {
    /// Event from the native player instance `player_id`
    Native {
        player_id: PlayerId,
        event: PlayerEvent,
    },
    /// Backoff timer for retry number `attempt` elapsed
    RetryDue { attempt: u32 },
}

/// The native player currently attached to the controller
#[derive(Default)]
struct Session {
    player_id: Option<PlayerId>,
    /// Last source a native player was successfully created from
    source: Option<VideoSource>,
    options: Arc<VideoPlayerOptions>,
    forwarder: Option<CancellationToken>,
}

struct Inner {
    platform: Arc<dyn PlayerPlatform>,
    policy: RetryPolicy,
    observers: StateObservers,
    session: Mutex<Session>,
    /// Serializes creating and replacing native players
    lifecycle_lock: tokio::sync::Mutex<()>,
    disposed: AtomicBool,
    shutdown: CancellationToken,
    retry_scheduler: Mutex<RetryScheduler>,
    loop_tx: mpsc::UnboundedSender<LoopMessage>,
    loop_rx: Mutex<Option<mpsc::UnboundedReceiver<LoopMessage>>>,
    shuffle_seed: AtomicU64,
}

/// Owns the player state and drives one native player at a time.
///
/// Cloning yields another handle to the same controller. Native events are
/// folded into the state by a single event loop task, strictly in arrival
/// order; commands may be issued concurrently from any task and update the
/// state once their native call completes (last write wins).
#[derive(Clone)]
pub struct PlayerController {
    inner: Arc<Inner>,
}

impl PlayerController {
    pub fn new(platform: Arc<dyn PlayerPlatform>) -> Self {
        Self::with_recovery(platform, ErrorRecoveryOptions::default())
    }

    pub fn with_recovery(
        platform: Arc<dyn PlayerPlatform>,
        recovery: ErrorRecoveryOptions,
    ) -> Self {
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        Self {
            inner: Arc::new(Inner {
                platform,
                policy: RetryPolicy::from(&recovery),
                observers: StateObservers::new(PlayerState::default()),
                session: Mutex::new(Session::default()),
                lifecycle_lock: tokio::sync::Mutex::new(()),
                disposed: AtomicBool::new(false),
                retry_scheduler: Mutex::new(RetryScheduler::new(shutdown.clone())),
                shutdown,
                loop_tx,
                loop_rx: Mutex::new(Some(loop_rx)),
                shuffle_seed: AtomicU64::new(0),
            }),
        }
    }

    // === Observation ===

    /// Latest published snapshot
    pub fn state(&self) -> Arc<PlayerState> {
        self.inner.observers.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PlayerState>> {
        self.inner.observers.subscribe()
    }

    /// Register a callback run after every accepted transition
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PlayerState) + Send + Sync + 'static,
    {
        self.inner.observers.add_listener(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.observers.remove_listener(id)
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.inner.current_player_id()
    }

    /// Options of the current (or last) native player
    pub fn options(&self) -> Arc<VideoPlayerOptions> {
        self.inner.current_options()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    // === Lifecycle ===

    /// Create the native player for `source`.
    ///
    /// Valid only once, from the uninitialized state. On native failure the
    /// classified error is published on the state and returned.
    pub async fn initialize(
        &self,
        source: VideoSource,
        options: VideoPlayerOptions,
    ) -> ControllerResult<PlayerId> {
        self.initialize_with(source, options, None).await
    }

    /// Initialize with a playlist; `initial_index` is clamped to the last item
    pub async fn initialize_with_playlist(
        &self,
        items: Vec<VideoSource>,
        initial_index: usize,
        options: VideoPlayerOptions,
    ) -> ControllerResult<PlayerId> {
        let playlist = Playlist::new(items, initial_index)
            .ok_or_else(|| ControllerError::precondition("playlist must not be empty"))?;
        let source = playlist
            .current()
            .cloned()
            .ok_or_else(|| ControllerError::precondition("playlist must not be empty"))?;
        self.initialize_with(source, options, Some(playlist)).await
    }

    async fn initialize_with(
        &self,
        source: VideoSource,
        options: VideoPlayerOptions,
        playlist: Option<Playlist>,
    ) -> ControllerResult<PlayerId> {
        let inner = &self.inner;
        let _guard = inner.lifecycle_lock.lock().await;

        inner.ensure_uninitialized()?;
        options.validate()?;
        inner.ensure_event_loop();

        info!("Initializing player with {}", source.describe());
        let auto_play = options.auto_play;
        let ready_options = options.clone();
        inner
            .attach_player(source, options, auto_play, move |state| PlayerState {
                playlist,
                ..state.ready_with(&ready_options)
            })
            .await
    }

    /// Replace the native player with a fresh one for the last loaded source
    pub async fn reinitialize(&self) -> ControllerResult<PlayerId> {
        let inner = &self.inner;
        if inner.is_disposed() {
            return Err(disposed_error());
        }
        let source = inner
            .lock_session()
            .source
            .clone()
            .ok_or_else(|| ControllerError::precondition("no source has been loaded"))?;

        info!("Reinitializing player with {}", source.describe());
        let resume = inner.should_resume(&inner.observers.current());
        inner.replace_native_player(source, resume).await
    }

    /// Release the native player. Repeated calls are no-ops.
    pub async fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::SeqCst) {
            trace!("Controller already disposed");
            return;
        }

        info!("Disposing player controller");
        inner.cancel_retry();
        let player_id = {
            let mut session = inner.lock_session();
            if let Some(forwarder) = session.forwarder.take() {
                forwarder.cancel();
            }
            session.player_id.take()
        };
        inner.observers.publish_terminal(|state| state.disposed());
        inner.shutdown.cancel();

        if let Some(player_id) = player_id {
            if let Err(err) = inner.platform.dispose(player_id).await {
                warn!("Failed to dispose native player {}: {}", player_id, err);
            }
        }
    }

    // === Transport ===

    pub async fn play(&self) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        trace!("Sending play to player {}", player_id);
        self.inner.platform.play(player_id).await?;
        Ok(())
    }

    pub async fn pause(&self) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        trace!("Sending pause to player {}", player_id);
        self.inner.platform.pause(player_id).await?;
        Ok(())
    }

    pub async fn stop(&self) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        trace!("Sending stop to player {}", player_id);
        self.inner.platform.stop(player_id).await?;
        Ok(())
    }

    pub async fn toggle_play_pause(&self) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        if self.state().is_playing() {
            self.pause().await
        } else {
            self.play().await
        }
    }

    pub async fn seek_to(&self, position: Duration) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        trace!("Seeking player {} to {:?}", player_id, position);
        self.inner.platform.seek_to(player_id, position).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                position,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Seek ahead by `delta`, never past the duration
    pub async fn seek_forward(&self, delta: Duration) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        let state = self.state();
        let target = state.position.saturating_add(delta).min(state.duration);
        self.seek_to(target).await
    }

    /// Seek back by `delta`, never before the start
    pub async fn seek_backward(&self, delta: Duration) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        let state = self.state();
        let target = state.position.saturating_sub(delta).min(state.duration);
        self.seek_to(target).await
    }

    // === Playback settings ===

    pub async fn set_volume(&self, volume: f64) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        validate_volume(volume)?;
        trace!("Setting volume of player {} to {}", player_id, volume);
        self.inner.platform.set_volume(player_id, volume).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                volume,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn set_playback_speed(&self, speed: f64) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        validate_speed(speed)?;
        trace!("Setting playback speed of player {} to {}", player_id, speed);
        self.inner.platform.set_playback_speed(player_id, speed).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                playback_speed: speed,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn set_looping(&self, looping: bool) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner.platform.set_looping(player_id, looping).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                is_looping: looping,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn set_scaling_mode(&self, mode: ScalingMode) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        trace!("Setting scaling mode of player {} to {}", player_id, mode.label());
        self.inner.platform.set_scaling_mode(player_id, mode).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                scaling_mode: mode,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn set_media_metadata(&self, metadata: MediaMetadata) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner
            .platform
            .set_media_metadata(player_id, &metadata)
            .await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                metadata,
                ..state.clone()
            })
        });
        Ok(())
    }

    // === Tracks ===

    /// Select a subtitle track; `None` turns subtitles off
    pub async fn set_subtitle_track(&self, track: Option<SubtitleTrack>) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner
            .platform
            .set_subtitle_track(player_id, track.as_ref())
            .await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                selected_subtitle_track: track,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn set_audio_track(&self, track: Option<AudioTrack>) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner
            .platform
            .set_audio_track(player_id, track.as_ref())
            .await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                selected_audio_track: track,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Shift subtitle timing; positive values show cues later
    pub async fn set_subtitle_offset(&self, offset: TimeDelta) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                subtitle_offset: offset,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn add_external_subtitle(
        &self,
        source: SubtitleSource,
    ) -> ControllerResult<Option<SubtitleTrack>> {
        let player_id = self.inner.ensure_ready()?;
        if !self.inner.current_options().subtitles_enabled {
            debug!("Subtitles disabled, not loading {}", source.uri);
            return Ok(None);
        }

        let added = self
            .inner
            .platform
            .add_external_subtitle(player_id, &source)
            .await?;
        if let Some(track) = &added {
            debug!("Added external subtitle {}", track.id());
            let track = track.clone();
            self.inner.update_state(|state| {
                let mut subtitle_tracks: Vec<SubtitleTrack> = state
                    .subtitle_tracks
                    .iter()
                    .filter(|existing| existing.id() != track.id())
                    .cloned()
                    .collect();
                subtitle_tracks.push(track);
                Some(PlayerState {
                    subtitle_tracks,
                    ..state.clone()
                })
            });
        }
        Ok(added)
    }

    pub async fn remove_external_subtitle(&self, track_id: &str) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        let removed = self
            .inner
            .platform
            .remove_external_subtitle(player_id, track_id)
            .await?;
        if removed {
            self.inner.update_state(|state| {
                let selected_subtitle_track = state
                    .selected_subtitle_track
                    .clone()
                    .filter(|selected| selected.id() != track_id);
                Some(PlayerState {
                    subtitle_tracks: state
                        .subtitle_tracks
                        .iter()
                        .filter(|track| track.id() != track_id)
                        .cloned()
                        .collect(),
                    selected_subtitle_track,
                    ..state.clone()
                })
            });
        }
        Ok(removed)
    }

    pub async fn get_external_subtitles(&self) -> ControllerResult<Vec<SubtitleTrack>> {
        let player_id = self.inner.ensure_ready()?;
        Ok(self.inner.platform.get_external_subtitles(player_id).await?)
    }

    // === Quality ===

    /// Returns whether the native player accepted the quality
    pub async fn set_video_quality(&self, track: VideoQualityTrack) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        trace!("Requesting quality {} on player {}", track.display_name(), player_id);
        let accepted = self
            .inner
            .platform
            .set_video_quality(player_id, &track)
            .await?;
        if accepted {
            self.inner.update_state(|state| {
                Some(PlayerState {
                    selected_quality_track: Some(track),
                    ..state.clone()
                })
            });
        }
        Ok(accepted)
    }

    pub async fn get_video_qualities(&self) -> ControllerResult<Vec<VideoQualityTrack>> {
        let player_id = self.inner.ensure_ready()?;
        Ok(self.inner.platform.get_video_qualities(player_id).await?)
    }

    pub async fn get_current_video_quality(&self) -> ControllerResult<Option<VideoQualityTrack>> {
        let player_id = self.inner.ensure_ready()?;
        Ok(self.inner.platform.get_current_video_quality(player_id).await?)
    }

    pub async fn is_quality_selection_supported(&self) -> ControllerResult<bool> {
        self.capability(Capability::QualitySelection).await
    }

    // === Display and capabilities ===

    pub async fn set_background_playback(&self, enabled: bool) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        if enabled && !self.inner.current_options().allow_background_playback {
            debug!("Background playback not allowed by options");
            return Ok(false);
        }
        let accepted = self
            .inner
            .platform
            .set_background_playback(player_id, enabled)
            .await?;
        if accepted {
            self.inner.update_state(|state| {
                Some(PlayerState {
                    is_background_playback_enabled: enabled,
                    ..state.clone()
                })
            });
        }
        Ok(accepted)
    }

    pub async fn is_background_playback_available(&self) -> ControllerResult<bool> {
        self.capability(Capability::BackgroundPlayback).await
    }

    pub async fn enter_pip(&self, options: Option<PipOptions>) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        if !self.inner.current_options().allow_pip {
            debug!("Picture-in-picture not allowed by options");
            return Ok(false);
        }
        let entered = self
            .inner
            .platform
            .enter_pip(player_id, options.as_ref())
            .await?;
        if entered {
            self.inner.update_state(|state| {
                Some(PlayerState {
                    is_pip_active: true,
                    ..state.clone()
                })
            });
        }
        Ok(entered)
    }

    pub async fn exit_pip(&self) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner.platform.exit_pip(player_id).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                is_pip_active: false,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn is_pip_available(&self) -> ControllerResult<bool> {
        self.capability(Capability::PictureInPicture).await
    }

    pub async fn enter_fullscreen(
        &self,
        orientation: Option<FullscreenOrientation>,
    ) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        let entered = self
            .inner
            .platform
            .enter_fullscreen(player_id, orientation)
            .await?;
        if entered {
            self.inner.update_state(|state| {
                Some(PlayerState {
                    is_fullscreen: true,
                    ..state.clone()
                })
            });
        }
        Ok(entered)
    }

    pub async fn exit_fullscreen(&self) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner.platform.exit_fullscreen(player_id).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                is_fullscreen: false,
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Returns whether the player is fullscreen afterwards
    pub async fn toggle_fullscreen(&self) -> ControllerResult<bool> {
        self.inner.ensure_ready()?;
        if self.state().is_fullscreen {
            self.exit_fullscreen().await?;
            Ok(false)
        } else {
            self.enter_fullscreen(None).await
        }
    }

    /// Returns `false` without a native call when casting is not allowed
    pub async fn start_casting(&self) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        if !self.inner.current_options().allow_casting {
            debug!("Casting not allowed by options");
            return Ok(false);
        }
        self.inner.platform.start_casting(player_id).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                is_casting: true,
                ..state.clone()
            })
        });
        Ok(true)
    }

    pub async fn stop_casting(&self) -> ControllerResult<()> {
        let player_id = self.inner.ensure_ready()?;
        self.inner.platform.stop_casting(player_id).await?;
        self.inner.update_state(|state| {
            Some(PlayerState {
                is_casting: false,
                ..state.clone()
            })
        });
        Ok(())
    }

    pub async fn is_casting_available(&self) -> ControllerResult<bool> {
        self.capability(Capability::Casting).await
    }

    async fn capability(&self, capability: Capability) -> ControllerResult<bool> {
        let player_id = self.inner.ensure_ready()?;
        let options = self.inner.current_options();
        Ok(capabilities::is_available(
            self.inner.platform.as_ref(),
            player_id,
            capability,
            &options,
        )
        .await?)
    }

    // === Playlist ===

    /// Advance to the next item. Returns `false` at the end of the playlist.
    pub async fn playlist_next(&self) -> ControllerResult<bool> {
        self.inner.ensure_ready()?;
        let state = self.state();
        let list = state.playlist.as_ref().ok_or_else(no_playlist_error)?;

        match playlist::next_index(list) {
            Some(index) => {
                let resume = self.inner.should_resume(&state);
                self.inner.load_playlist_item(index, resume).await?;
                Ok(true)
            }
            None => {
                debug!("End of playlist");
                self.inner.update_state(|state| {
                    Some(state.with_playback_state(PlaybackState::Completed))
                });
                Ok(false)
            }
        }
    }

    /// Go back one item. Returns `false` on the first item.
    pub async fn playlist_previous(&self) -> ControllerResult<bool> {
        self.inner.ensure_ready()?;
        let state = self.state();
        let list = state.playlist.as_ref().ok_or_else(no_playlist_error)?;

        match playlist::previous_index(list) {
            Some(index) => {
                let resume = self.inner.should_resume(&state);
                self.inner.load_playlist_item(index, resume).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn playlist_jump_to(&self, index: usize) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        let state = self.state();
        if state.playlist.is_none() {
            return Err(no_playlist_error());
        }
        let resume = self.inner.should_resume(&state);
        self.inner.load_playlist_item(index, resume).await?;
        Ok(())
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        if self.state().playlist.is_none() {
            return Err(no_playlist_error());
        }
        self.inner.update_state(|state| {
            state.playlist.as_ref().map(|list| PlayerState {
                playlist: Some(playlist::with_repeat_mode(list, mode)),
                ..state.clone()
            })
        });
        Ok(())
    }

    /// Toggle shuffled navigation; the stored item order never changes
    pub async fn set_shuffle(&self, enabled: bool) -> ControllerResult<()> {
        self.inner.ensure_ready()?;
        if self.state().playlist.is_none() {
            return Err(no_playlist_error());
        }
        let seed = self.inner.shuffle_seed.fetch_add(1, Ordering::Relaxed);
        self.inner.update_state(|state| {
            state.playlist.as_ref().map(|list| PlayerState {
                playlist: Some(playlist::with_shuffle(list, enabled, seed)),
                ..state.clone()
            })
        });
        Ok(())
    }

    // === Error recovery ===

    /// Re-issue play after an error.
    ///
    /// Returns `false` when not in the error state, when the error forbids
    /// retrying, or when the native play call fails again. Manual retries do
    /// not count against the automatic retry ceiling; success resets it.
    pub async fn retry(&self) -> ControllerResult<bool> {
        let inner = &self.inner;
        let player_id = inner.ensure_ready()?;
        let state = self.state();
        if !state.has_error() {
            debug!("Nothing to retry");
            return Ok(false);
        }
        if state
            .last_error
            .as_ref()
            .is_some_and(|error| !error.allows_retry())
        {
            info!("Current error does not allow retrying");
            return Ok(false);
        }

        inner.cancel_retry();
        trace!("Manual retry on player {}", player_id);
        match inner.platform.play(player_id).await {
            Ok(()) => {
                inner.update_state(|state| {
                    Some(PlayerState {
                        network_retry_count: 0,
                        is_recovering_from_error: false,
                        is_network_buffering: false,
                        buffering_reason: None,
                        ..state.with_playback_state(PlaybackState::Playing)
                    })
                });
                Ok(true)
            }
            Err(err) => {
                let error = classify(&err, inner.policy.max_auto_retries);
                warn!("Manual retry failed: {}", error);
                inner.update_state(|state| Some(state.with_error(error)));
                Ok(false)
            }
        }
    }

    /// Leave the error state without retrying
    pub fn clear_error(&self) -> ControllerResult<()> {
        let inner = &self.inner;
        if inner.is_disposed() {
            return Err(disposed_error());
        }
        inner.cancel_retry();
        inner.update_state(|state| {
            if !state.has_error() {
                return None;
            }
            let playback_state = if state.is_ready() {
                PlaybackState::Ready
            } else {
                PlaybackState::Uninitialized
            };
            Some(PlayerState {
                network_retry_count: 0,
                is_recovering_from_error: false,
                is_network_buffering: false,
                buffering_reason: None,
                ..state.with_playback_state(playback_state)
            })
        });
        Ok(())
    }

    /// Stop any pending automatic retry. Never fails.
    ///
    /// Buffering caused by the recovery itself becomes `Paused`, since
    /// nothing will resume playback anymore.
    pub fn cancel_auto_retry(&self) {
        let inner = &self.inner;
        if inner.cancel_retry() {
            debug!("Cancelled pending automatic retry");
        }
        inner.update_state(|state| {
            if !state.is_recovering_from_error {
                return None;
            }
            let playback_state = match state.playback_state {
                PlaybackState::Buffering => PlaybackState::Paused,
                other => other,
            };
            Some(PlayerState {
                playback_state,
                is_recovering_from_error: false,
                is_network_buffering: false,
                buffering_reason: None,
                ..state.clone()
            })
        });
    }

    /// Whether an automatic retry timer is armed
    pub fn has_pending_retry(&self) -> bool {
        self.inner.lock_scheduler().is_pending()
    }
}

impl Inner {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_scheduler(&self) -> MutexGuard<'_, RetryScheduler> {
        self.retry_scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn current_player_id(&self) -> Option<PlayerId> {
        self.lock_session().player_id
    }

    fn current_options(&self) -> Arc<VideoPlayerOptions> {
        self.lock_session().options.clone()
    }

    fn update_state<F>(&self, transition: F)
    where
        F: FnOnce(&PlayerState) -> Option<PlayerState>,
    {
        self.observers.update(transition);
    }

    /// Commands require a live native player
    fn ensure_ready(&self) -> ControllerResult<PlayerId> {
        if self.is_disposed() {
            return Err(disposed_error());
        }
        match self.current_player_id() {
            Some(player_id) if self.observers.current().is_ready() => Ok(player_id),
            _ => Err(ControllerError::precondition("controller is not initialized")),
        }
    }

    fn ensure_uninitialized(&self) -> ControllerResult<()> {
        if self.is_disposed() {
            return Err(disposed_error());
        }
        if self.current_player_id().is_some() || self.observers.current().is_ready() {
            return Err(ControllerError::precondition(
                "controller is already initialized",
            ));
        }
        Ok(())
    }

    fn should_resume(&self, state: &PlayerState) -> bool {
        self.current_options().auto_play
            || matches!(
                state.playback_state,
                PlaybackState::Playing | PlaybackState::Buffering
            )
    }

    // === Native player management ===

    /// Create a native player and make it current.
    ///
    /// Callers hold `lifecycle_lock`.
    async fn attach_player<F>(
        &self,
        source: VideoSource,
        options: VideoPlayerOptions,
        play: bool,
        ready_state: F,
    ) -> ControllerResult<PlayerId>
    where
        F: FnOnce(&PlayerState) -> PlayerState,
    {
        let description = source.describe();
        let player_id = match self.platform.create(&source, &options).await {
            Ok(player_id) => player_id,
            Err(err) => {
                let error = classify(&err, self.policy.max_auto_retries);
                warn!("Failed to create player for {}: {}", description, error);
                self.update_state(|state| {
                    Some(PlayerState {
                        lifecycle: Lifecycle::Uninitialized,
                        ..state.with_error(error.clone())
                    })
                });
                return Err(ControllerError::Playback(error));
            }
        };

        let start_position = options.start_position_ms.map(Duration::from_millis);
        let attached = {
            let mut session = self.lock_session();
            if self.is_disposed() {
                false
            } else {
                session.player_id = Some(player_id);
                session.source = Some(source);
                session.options = Arc::new(options);
                true
            }
        };
        if !attached {
            warn!("Controller disposed while creating player {}", player_id);
            if let Err(err) = self.platform.dispose(player_id).await {
                warn!("Failed to dispose native player {}: {}", player_id, err);
            }
            return Err(disposed_error());
        }

        self.update_state(|state| Some(ready_state(state)));
        let forwarder = self.spawn_forwarder(player_id);
        self.lock_session().forwarder = Some(forwarder);
        info!("Player {} ready for {}", player_id, description);

        if let Some(position) = start_position {
            trace!("Seeking player {} to start position {:?}", player_id, position);
            self.platform.seek_to(player_id, position).await?;
        }
        if play {
            trace!("Auto-playing player {}", player_id);
            self.platform.play(player_id).await?;
        }
        Ok(player_id)
    }

    /// Dispose the current native player and create a new one for `source`,
    /// carrying over the user's volume, speed, looping and scaling choices
    async fn replace_native_player(
        &self,
        source: VideoSource,
        resume: bool,
    ) -> ControllerResult<PlayerId> {
        let _guard = self.lifecycle_lock.lock().await;
        if self.is_disposed() {
            return Err(disposed_error());
        }

        self.cancel_retry();
        let (previous, options) = {
            let mut session = self.lock_session();
            if let Some(forwarder) = session.forwarder.take() {
                forwarder.cancel();
            }
            (session.player_id.take(), session.options.clone())
        };
        if let Some(previous) = previous {
            debug!("Disposing player {} before reload", previous);
            if let Err(err) = self.platform.dispose(previous).await {
                warn!("Failed to dispose native player {}: {}", previous, err);
            }
        }

        let current = self.observers.current();
        let options = VideoPlayerOptions {
            volume: current.volume,
            playback_speed: current.playback_speed,
            looping: current.is_looping,
            scaling_mode: current.scaling_mode,
            start_position_ms: None,
            ..(*options).clone()
        };
        self.attach_player(source, options, resume, |state| PlayerState {
            lifecycle: Lifecycle::Ready,
            playback_state: PlaybackState::Ready,
            ..state.for_new_media()
        })
        .await
    }

    async fn load_playlist_item(&self, index: usize, resume: bool) -> ControllerResult<PlayerId> {
        let state = self.observers.current();
        let list = state.playlist.as_ref().ok_or_else(no_playlist_error)?;
        let moved = playlist::jump_to(list, index)?;
        let source = moved.current().cloned().ok_or(ControllerError::Range {
            index,
            len: moved.len(),
        })?;

        info!("Loading playlist item {} of {}", index + 1, moved.len());
        self.update_state(|state| {
            Some(PlayerState {
                playlist: Some(moved),
                ..state.clone()
            })
        });
        self.replace_native_player(source, resume).await
    }

    // === Event loop ===

    fn ensure_event_loop(self: &Arc<Self>) {
        let receiver = self
            .loop_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(receiver) = receiver {
            tokio::spawn(run_event_loop(
                Arc::downgrade(self),
                receiver,
                self.shutdown.clone(),
            ));
        }
    }

    /// Pump one native player's events into the loop, tagged with its id
    fn spawn_forwarder(&self, player_id: PlayerId) -> CancellationToken {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        let mut events = self.platform.events(player_id);
        let loop_tx = self.loop_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    next = events.next() => match next {
                        Some(event) => {
                            if loop_tx.send(LoopMessage::Native { player_id, event }).is_err() {
                                break;
                            }
                        }
                        None => {
                            debug!("Event stream of player {} ended", player_id);
                            break;
                        }
                    },
                }
            }
        });
        token
    }

    async fn handle_message(&self, message: LoopMessage) {
        match message {
            LoopMessage::Native { player_id, event } => {
                if self.current_player_id() != Some(player_id) {
                    trace!("Dropping {} from stale player {}", event.name(), player_id);
                    return;
                }
                self.process_event(event).await;
            }
            LoopMessage::RetryDue { attempt } => {
                let state = self.observers.current();
                if self.is_disposed()
                    || !state.is_recovering_from_error
                    || state.network_retry_count != attempt
                {
                    debug!("Dropping stale retry #{}", attempt);
                    return;
                }
                if let Some(follow_up) = self.attempt_retry(attempt).await {
                    self.process_event(follow_up).await;
                }
            }
        }
    }

    /// Reconcile `event` and run its effects; events produced by effects are
    /// handled before the next loop message
    async fn process_event(&self, event: PlayerEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            if self.is_disposed() {
                return;
            }
            if event.is_periodic() {
                trace!("Reconciling {}", event.name());
            } else {
                debug!("Reconciling {}", event.name());
            }

            let options = self.current_options();
            let ctx = ReconcileContext {
                options: &options,
                policy: &self.policy,
            };
            let mut effects = Vec::new();
            self.observers.update(|state| {
                let reconciliation = reconcile(state, event, &ctx);
                effects = reconciliation.effects;
                Some(reconciliation.state)
            });

            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&self, effect: Effect) -> Option<PlayerEvent> {
        trace!("Executing {:?}", effect);
        match effect {
            Effect::SelectSubtitleTrack(track) => {
                let player_id = self.current_player_id()?;
                match self
                    .platform
                    .set_subtitle_track(player_id, Some(&track))
                    .await
                {
                    Ok(()) => self.update_state(|state| {
                        Some(PlayerState {
                            selected_subtitle_track: Some(track),
                            ..state.clone()
                        })
                    }),
                    Err(err) => warn!("Failed to select subtitle track {}: {}", track.id(), err),
                }
                None
            }
            Effect::SelectAudioTrack(track) => {
                let player_id = self.current_player_id()?;
                match self.platform.set_audio_track(player_id, Some(&track)).await {
                    Ok(()) => self.update_state(|state| {
                        Some(PlayerState {
                            selected_audio_track: Some(track),
                            ..state.clone()
                        })
                    }),
                    Err(err) => warn!("Failed to select audio track {}: {}", track.id, err),
                }
                None
            }
            Effect::ScheduleRetry { attempt, delay } => {
                let loop_tx = self.loop_tx.clone();
                self.lock_scheduler().schedule(delay, move || {
                    let _ = loop_tx.send(LoopMessage::RetryDue { attempt });
                });
                None
            }
            Effect::RetryNow { attempt } => {
                self.cancel_retry();
                self.attempt_retry(attempt).await
            }
            Effect::CancelRetry => {
                self.cancel_retry();
                None
            }
            Effect::LoadPlaylistItem { index } => {
                if let Err(err) = self.load_playlist_item(index, true).await {
                    warn!("Failed to advance playlist to item {}: {}", index, err);
                }
                None
            }
            Effect::RestartCurrent => {
                let player_id = self.current_player_id()?;
                match self.seek_and_play(player_id, Duration::ZERO).await {
                    Ok(()) => {
                        self.update_state(|state| {
                            Some(PlayerState {
                                position: Duration::ZERO,
                                ..state.clone()
                            })
                        });
                        None
                    }
                    Err(err) => Some(PlayerEvent::Error(err)),
                }
            }
        }
    }

    /// Cancel the retry timer. Returns whether one was pending.
    fn cancel_retry(&self) -> bool {
        self.lock_scheduler().cancel()
    }

    /// Resume from the last known position. The outcome is fed back as an
    /// event; a failure goes through the classifier like any native error,
    /// so only network failures count towards the next attempt.
    async fn attempt_retry(&self, attempt: u32) -> Option<PlayerEvent> {
        let player_id = self.current_player_id()?;
        let position = self.observers.current().position;
        info!("Retry #{}: resuming player {} at {:?}", attempt, player_id, position);

        match self.seek_and_play(player_id, position).await {
            Ok(()) => Some(PlayerEvent::PlaybackRecovered {
                retries_used: attempt,
            }),
            Err(err) => {
                warn!("Retry #{} failed: {}", attempt, err);
                Some(PlayerEvent::Error(err))
            }
        }
    }

    async fn seek_and_play(&self, player_id: PlayerId, position: Duration) -> PlatformResult<()> {
        self.platform.seek_to(player_id, position).await?;
        self.platform.play(player_id).await
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_event_loop(
    inner: Weak<Inner>,
    mut receiver: mpsc::UnboundedReceiver<LoopMessage>,
    shutdown: CancellationToken,
) {
    debug!("Player event loop started");
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = receiver.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        let Some(controller) = inner.upgrade() else {
            break;
        };
        controller.handle_message(message).await;
    }
    debug!("Player event loop stopped");
}

fn disposed_error() -> ControllerError {
    ControllerError::precondition("controller has been disposed")
}

fn no_playlist_error() -> ControllerError {
    ControllerError::precondition("no playlist is loaded")
}
