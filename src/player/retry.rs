use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::classifier::PlayerError;
use super::state::PlayerState;
use super::types::{BufferingReason, PlaybackState};
use crate::config::ErrorRecoveryOptions;
use crate::constants::RETRIES_EXHAUSTED_MESSAGE;

/// Automatic retry behaviour for network failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub auto_retry_enabled: bool,
    /// Ceiling for consecutive automatic retries
    pub max_auto_retries: u32,
    /// Delay before the first retry; doubled for each later one
    pub base_delay_ms: u64,
    /// Caps exponential growth
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&ErrorRecoveryOptions::default())
    }
}

impl From<&ErrorRecoveryOptions> for RetryPolicy {
    fn from(options: &ErrorRecoveryOptions) -> Self {
        Self {
            auto_retry_enabled: options.auto_retry_enabled,
            max_auto_retries: options.max_auto_retries,
            base_delay_ms: options.retry_base_delay_ms,
            max_delay_ms: options.retry_max_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule retry number `attempt` (1-based) after `delay`
    Retry { attempt: u32, delay: Duration },
    /// Ceiling reached or auto-retry disabled
    GiveUp,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// Formula: min(base_delay * 2^(attempt - 1), max_delay)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(exponent))
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Ceiling that applies to `error`; a per-error budget can only lower it
    pub fn ceiling_for(&self, error: &PlayerError) -> u32 {
        self.max_auto_retries.min(error.max_retries)
    }

    /// Decide what to do about a network failure given the current state.
    ///
    /// The ceiling is checked before every attempt, so a retry that fails
    /// again can never loop past it.
    pub fn decide(&self, state: &PlayerState, error: &PlayerError) -> RetryDecision {
        if !self.auto_retry_enabled {
            return RetryDecision::GiveUp;
        }
        if state.network_retry_count >= self.ceiling_for(error) {
            return RetryDecision::GiveUp;
        }
        let attempt = state.network_retry_count + 1;
        RetryDecision::Retry {
            attempt,
            delay: self.delay_for_attempt(attempt),
        }
    }

    /// Fold a network failure into the state.
    pub fn on_network_error(
        &self,
        state: &PlayerState,
        error: PlayerError,
    ) -> (PlayerState, RetryDecision) {
        let decision = self.decide(state, &error);
        let next = match decision {
            RetryDecision::Retry { attempt, delay } => {
                info!(
                    "Network error '{}', scheduling retry #{} after {:?}",
                    error.message, attempt, delay
                );
                PlayerState {
                    playback_state: PlaybackState::Buffering,
                    network_retry_count: attempt,
                    is_recovering_from_error: true,
                    is_network_buffering: true,
                    buffering_reason: Some(BufferingReason::NetworkUnstable),
                    error_message: None,
                    last_error: None,
                    ..state.clone()
                }
            }
            RetryDecision::GiveUp => {
                if self.auto_retry_enabled && state.network_retry_count > 0 {
                    warn!(
                        "Giving up after {} retries: {}",
                        state.network_retry_count, error.message
                    );
                    let message = format!("{} ({})", RETRIES_EXHAUSTED_MESSAGE, error.message);
                    state.with_error(PlayerError { message, ..error })
                } else {
                    debug!("Automatic retry unavailable for '{}'", error.message);
                    state.with_error(error)
                }
            }
        };
        (next, decision)
    }
}

/// Reset retry bookkeeping after playback resumed. Idempotent.
pub fn on_recovered(state: &PlayerState) -> PlayerState {
    let playback_state = match state.playback_state {
        PlaybackState::Buffering if state.is_network_buffering => PlaybackState::Playing,
        PlaybackState::Error => PlaybackState::Playing,
        other => other,
    };
    PlayerState {
        network_retry_count: 0,
        is_recovering_from_error: false,
        is_network_buffering: false,
        buffering_reason: None,
        ..state.with_playback_state(playback_state)
    }
}

/// A single pending retry timer.
///
/// Scheduling replaces any pending timer; cancellation is idempotent and
/// also happens when the parent token (the controller) is cancelled.
#[derive(Debug)]
pub struct RetryScheduler {
    parent: CancellationToken,
    pending: Option<(CancellationToken, JoinHandle<()>)>,
}

impl RetryScheduler {
    pub fn new(parent: CancellationToken) -> Self {
        Self {
            parent,
            pending: None,
        }
    }

    /// Run `on_due` after `delay` unless cancelled first
    pub fn schedule<F>(&mut self, delay: Duration, on_due: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let token = self.parent.child_token();
        let timer_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = timer_token.cancelled() => {
                    debug!("Retry timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    on_due();
                }
            }
        });
        self.pending = Some((token, handle));
    }

    /// Cancel the pending timer. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((token, handle)) => {
                let was_pending = !handle.is_finished();
                token.cancel();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|(token, handle)| !token.is_cancelled() && !handle.is_finished())
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
