#![allow(dead_code)]

pub mod mocks;

use playback_core::config::{ErrorRecoveryOptions, VideoPlayerOptions};
use playback_core::models::{PlayerId, VideoSource};
use playback_core::player::{PlayerController, PlayerState};
use playback_core::utils::try_init_tracing;
use std::sync::Arc;
use std::time::Duration;

pub use mocks::{Call, MockPlatform};

/// Upper bound for waiting on the event loop
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_logging() {
    try_init_tracing("playback_core=debug");
}

pub fn network_source() -> VideoSource {
    VideoSource::network("https://cdn.example.com/movie/master.m3u8")
}

pub fn playlist_sources(count: usize) -> Vec<VideoSource> {
    (0..count)
        .map(|i| VideoSource::network(format!("https://cdn.example.com/episode-{}.m3u8", i + 1)))
        .collect()
}

/// Recovery options whose timers never fire during a test
pub fn slow_recovery(max_auto_retries: u32) -> ErrorRecoveryOptions {
    ErrorRecoveryOptions {
        max_auto_retries,
        retry_base_delay_ms: 3_600_000,
        retry_max_delay_ms: 3_600_000,
        ..Default::default()
    }
}

pub struct TestPlayer {
    pub platform: Arc<MockPlatform>,
    pub controller: PlayerController,
}

impl TestPlayer {
    pub fn new() -> Self {
        Self::with_recovery(ErrorRecoveryOptions::default())
    }

    pub fn with_recovery(recovery: ErrorRecoveryOptions) -> Self {
        init_logging();
        let platform = Arc::new(MockPlatform::new());
        let controller = PlayerController::with_recovery(platform.clone(), recovery);
        Self {
            platform,
            controller,
        }
    }

    /// Initialize with a network source and default options
    pub async fn ready(self) -> (Self, PlayerId) {
        self.ready_with(VideoPlayerOptions::default()).await
    }

    pub async fn ready_with(self, options: VideoPlayerOptions) -> (Self, PlayerId) {
        let player_id = self
            .controller
            .initialize(network_source(), options)
            .await
            .expect("initialize should succeed");
        (self, player_id)
    }

    /// Emit an event on the current player's stream
    pub fn emit(&self, event: playback_core::player::PlayerEvent) {
        let player_id = self.controller.player_id().expect("no active player");
        assert!(self.platform.emit(player_id, event), "event stream closed");
    }

    pub async fn wait_for<F>(&self, predicate: F) -> Arc<PlayerState>
    where
        F: Fn(&PlayerState) -> bool,
    {
        wait_for_state(&self.controller, predicate).await
    }
}

/// Wait until a published state satisfies `predicate`
pub async fn wait_for_state<F>(controller: &PlayerController, predicate: F) -> Arc<PlayerState>
where
    F: Fn(&PlayerState) -> bool,
{
    let mut receiver = controller.subscribe();
    let result =
        tokio::time::timeout(WAIT_TIMEOUT, receiver.wait_for(|state| predicate(state))).await;
    match result {
        Ok(Ok(state)) => Arc::clone(&state),
        _ => panic!(
            "timed out waiting for state, last state: {:?}",
            controller.state()
        ),
    }
}

/// Let spawned tasks drain their queues
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Poll `condition` until it holds, for effects that do not publish state
pub async fn eventually<F>(condition: F)
where
    F: Fn() -> bool,
{
    let result = tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached in time");
}
