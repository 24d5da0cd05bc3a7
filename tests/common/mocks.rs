use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::{self, BoxStream, StreamExt};
use playback_core::config::VideoPlayerOptions;
use playback_core::models::{
    AudioTrack, MediaMetadata, PlayerId, SubtitleSource, SubtitleTrack, VideoQualityTrack,
    VideoSource,
};
use playback_core::player::platform::{PlatformResult, PlayerPlatform};
use playback_core::player::{
    FullscreenOrientation, PipOptions, PlatformError, PlayerEvent, ScalingMode,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One native call as seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(VideoSource),
    Dispose(PlayerId),
    Play(PlayerId),
    Pause(PlayerId),
    Stop(PlayerId),
    SeekTo(PlayerId, Duration),
    SetVolume(PlayerId, f64),
    SetPlaybackSpeed(PlayerId, f64),
    SetSubtitleTrack(PlayerId, Option<String>),
    SetAudioTrack(PlayerId, Option<String>),
    SetVideoQuality(PlayerId, String),
    SetBackgroundPlayback(PlayerId, bool),
    EnterPip(PlayerId),
    Other(&'static str, PlayerId),
}

impl Call {
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Call::Create(_) => None,
            Call::Dispose(id)
            | Call::Play(id)
            | Call::Pause(id)
            | Call::Stop(id)
            | Call::SeekTo(id, _)
            | Call::SetVolume(id, _)
            | Call::SetPlaybackSpeed(id, _)
            | Call::SetSubtitleTrack(id, _)
            | Call::SetAudioTrack(id, _)
            | Call::SetVideoQuality(id, _)
            | Call::SetBackgroundPlayback(id, _)
            | Call::EnterPip(id)
            | Call::Other(_, id) => Some(*id),
        }
    }
}

struct Failure {
    error: PlatformError,
    /// `None` fails every call
    remaining: Option<u32>,
}

/// Recording native platform with injectable failures and per-player event
/// senders
pub struct MockPlatform {
    next_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    senders: Mutex<HashMap<PlayerId, mpsc::UnboundedSender<PlayerEvent>>>,
    receivers: Mutex<HashMap<PlayerId, mpsc::UnboundedReceiver<PlayerEvent>>>,
    external_subtitles: Mutex<Vec<SubtitleTrack>>,
    qualities: Mutex<Vec<VideoQualityTrack>>,
    pub pip_supported: AtomicBool,
    pub casting_supported: AtomicBool,
    pub background_supported: AtomicBool,
    pub quality_supported: AtomicBool,
    /// Answer of the boolean setters
    pub accept_requests: AtomicBool,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            senders: Mutex::new(HashMap::new()),
            receivers: Mutex::new(HashMap::new()),
            external_subtitles: Mutex::new(Vec::new()),
            qualities: Mutex::new(vec![
                VideoQualityTrack::new("480p", 480, 1_500_000),
                VideoQualityTrack::new("1080p", 1080, 6_000_000),
            ]),
            pip_supported: AtomicBool::new(true),
            casting_supported: AtomicBool::new(true),
            background_supported: AtomicBool::new(true),
            quality_supported: AtomicBool::new(true),
            accept_requests: AtomicBool::new(true),
        }
    }

    /// Make every call to `method` fail until cleared
    pub fn inject_error(&self, method: &'static str, error: PlatformError) {
        self.failures.lock().unwrap().insert(
            method,
            Failure {
                error,
                remaining: None,
            },
        );
    }

    /// Make the next `times` calls to `method` fail
    pub fn inject_error_times(&self, method: &'static str, error: PlatformError, times: u32) {
        self.failures.lock().unwrap().insert(
            method,
            Failure {
                error,
                remaining: Some(times),
            },
        );
    }

    pub fn clear_error(&self, method: &'static str) {
        self.failures.lock().unwrap().remove(method);
    }

    /// Push an event into a player's stream. Returns false if nobody listens.
    pub fn emit(&self, player_id: PlayerId, event: PlayerEvent) -> bool {
        match self.senders.lock().unwrap().get(&player_id) {
            Some(sender) => sender.unbounded_send(event).is_ok(),
            None => false,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call, method: &'static str) -> PlatformResult<()> {
        self.calls.lock().unwrap().push(call);

        let mut failures = self.failures.lock().unwrap();
        let Some(failure) = failures.get_mut(method) else {
            return Ok(());
        };
        let error = failure.error.clone();
        match failure.remaining.as_mut() {
            None => Err(error),
            Some(remaining) => {
                *remaining -= 1;
                if *remaining == 0 {
                    failures.remove(method);
                }
                Err(error)
            }
        }
    }

    fn other(&self, method: &'static str, player_id: PlayerId) -> PlatformResult<()> {
        self.record(Call::Other(method, player_id), method)
    }

    fn accepts(&self) -> bool {
        self.accept_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerPlatform for MockPlatform {
    async fn create(
        &self,
        source: &VideoSource,
        _options: &VideoPlayerOptions,
    ) -> PlatformResult<PlayerId> {
        self.record(Call::Create(source.clone()), "create")?;

        let player_id = PlayerId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = mpsc::unbounded();
        self.senders.lock().unwrap().insert(player_id, sender);
        self.receivers.lock().unwrap().insert(player_id, receiver);
        Ok(player_id)
    }

    async fn dispose(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.record(Call::Dispose(player_id), "dispose")?;
        self.senders.lock().unwrap().remove(&player_id);
        Ok(())
    }

    fn events(&self, player_id: PlayerId) -> BoxStream<'static, PlayerEvent> {
        match self.receivers.lock().unwrap().remove(&player_id) {
            Some(receiver) => receiver.boxed(),
            None => stream::empty::<PlayerEvent>().boxed(),
        }
    }

    async fn play(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.record(Call::Play(player_id), "play")
    }

    async fn pause(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.record(Call::Pause(player_id), "pause")
    }

    async fn stop(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.record(Call::Stop(player_id), "stop")
    }

    async fn seek_to(&self, player_id: PlayerId, position: Duration) -> PlatformResult<()> {
        self.record(Call::SeekTo(player_id, position), "seek_to")
    }

    async fn set_volume(&self, player_id: PlayerId, volume: f64) -> PlatformResult<()> {
        self.record(Call::SetVolume(player_id, volume), "set_volume")
    }

    async fn set_playback_speed(&self, player_id: PlayerId, speed: f64) -> PlatformResult<()> {
        self.record(Call::SetPlaybackSpeed(player_id, speed), "set_playback_speed")
    }

    async fn set_looping(&self, player_id: PlayerId, _looping: bool) -> PlatformResult<()> {
        self.other("set_looping", player_id)
    }

    async fn set_scaling_mode(
        &self,
        player_id: PlayerId,
        _mode: ScalingMode,
    ) -> PlatformResult<()> {
        self.other("set_scaling_mode", player_id)
    }

    async fn set_subtitle_track(
        &self,
        player_id: PlayerId,
        track: Option<&SubtitleTrack>,
    ) -> PlatformResult<()> {
        self.record(
            Call::SetSubtitleTrack(player_id, track.map(|track| track.id().to_string())),
            "set_subtitle_track",
        )
    }

    async fn set_audio_track(
        &self,
        player_id: PlayerId,
        track: Option<&AudioTrack>,
    ) -> PlatformResult<()> {
        self.record(
            Call::SetAudioTrack(player_id, track.map(|track| track.id.clone())),
            "set_audio_track",
        )
    }

    async fn set_video_quality(
        &self,
        player_id: PlayerId,
        track: &VideoQualityTrack,
    ) -> PlatformResult<bool> {
        self.record(
            Call::SetVideoQuality(player_id, track.id.clone()),
            "set_video_quality",
        )?;
        Ok(self.accepts())
    }

    async fn get_video_qualities(
        &self,
        player_id: PlayerId,
    ) -> PlatformResult<Vec<VideoQualityTrack>> {
        self.other("get_video_qualities", player_id)?;
        Ok(self.qualities.lock().unwrap().clone())
    }

    async fn get_current_video_quality(
        &self,
        player_id: PlayerId,
    ) -> PlatformResult<Option<VideoQualityTrack>> {
        self.other("get_current_video_quality", player_id)?;
        Ok(self.qualities.lock().unwrap().last().cloned())
    }

    async fn is_quality_selection_supported(&self, player_id: PlayerId) -> PlatformResult<bool> {
        self.other("is_quality_selection_supported", player_id)?;
        Ok(self.quality_supported.load(Ordering::SeqCst))
    }

    async fn set_background_playback(
        &self,
        player_id: PlayerId,
        enabled: bool,
    ) -> PlatformResult<bool> {
        self.record(
            Call::SetBackgroundPlayback(player_id, enabled),
            "set_background_playback",
        )?;
        Ok(self.accepts())
    }

    async fn is_background_playback_supported(&self, player_id: PlayerId) -> PlatformResult<bool> {
        self.other("is_background_playback_supported", player_id)?;
        Ok(self.background_supported.load(Ordering::SeqCst))
    }

    async fn set_media_metadata(
        &self,
        player_id: PlayerId,
        _metadata: &MediaMetadata,
    ) -> PlatformResult<()> {
        self.other("set_media_metadata", player_id)
    }

    async fn add_external_subtitle(
        &self,
        player_id: PlayerId,
        source: &SubtitleSource,
    ) -> PlatformResult<Option<SubtitleTrack>> {
        self.other("add_external_subtitle", player_id)?;
        let mut subtitles = self.external_subtitles.lock().unwrap();
        let track = SubtitleTrack::External(playback_core::models::ExternalSubtitle {
            id: format!("ext-{}", subtitles.len() + 1),
            label: source.label.clone(),
            language: source.language.clone(),
            uri: source.uri.clone(),
            format: source.format,
            is_default: source.is_default,
        });
        subtitles.push(track.clone());
        Ok(Some(track))
    }

    async fn remove_external_subtitle(
        &self,
        player_id: PlayerId,
        track_id: &str,
    ) -> PlatformResult<bool> {
        self.other("remove_external_subtitle", player_id)?;
        let mut subtitles = self.external_subtitles.lock().unwrap();
        let before = subtitles.len();
        subtitles.retain(|track| track.id() != track_id);
        Ok(subtitles.len() != before)
    }

    async fn get_external_subtitles(
        &self,
        player_id: PlayerId,
    ) -> PlatformResult<Vec<SubtitleTrack>> {
        self.other("get_external_subtitles", player_id)?;
        Ok(self.external_subtitles.lock().unwrap().clone())
    }

    async fn enter_pip(
        &self,
        player_id: PlayerId,
        _options: Option<&PipOptions>,
    ) -> PlatformResult<bool> {
        self.record(Call::EnterPip(player_id), "enter_pip")?;
        Ok(self.accepts())
    }

    async fn exit_pip(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.other("exit_pip", player_id)
    }

    async fn is_pip_supported(&self, player_id: PlayerId) -> PlatformResult<bool> {
        self.other("is_pip_supported", player_id)?;
        Ok(self.pip_supported.load(Ordering::SeqCst))
    }

    async fn enter_fullscreen(
        &self,
        player_id: PlayerId,
        _orientation: Option<FullscreenOrientation>,
    ) -> PlatformResult<bool> {
        self.other("enter_fullscreen", player_id)?;
        Ok(self.accepts())
    }

    async fn exit_fullscreen(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.other("exit_fullscreen", player_id)
    }

    async fn start_casting(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.other("start_casting", player_id)
    }

    async fn stop_casting(&self, player_id: PlayerId) -> PlatformResult<()> {
        self.other("stop_casting", player_id)
    }

    async fn is_casting_supported(&self, player_id: PlayerId) -> PlatformResult<bool> {
        self.other("is_casting_supported", player_id)?;
        Ok(self.casting_supported.load(Ordering::SeqCst))
    }
}
