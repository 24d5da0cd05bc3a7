use thiserror::Error;

use crate::player::classifier::PlayerError;
use crate::player::events::PlatformError;

/// Errors returned by controller commands.
///
/// Precondition, validation and range errors are raised before any native
/// call is made and are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Operation not allowed in the current lifecycle state
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Argument outside its accepted range
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Playlist index outside `[0, len)`
    #[error("Index {index} out of range for playlist of length {len}")]
    Range { index: usize, len: usize },

    /// The native layer rejected the call
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Classified playback failure (e.g. player creation)
    #[error("Playback error: {0}")]
    Playback(PlayerError),
}

impl ControllerError {
    pub fn precondition(message: impl Into<String>) -> Self {
        ControllerError::Precondition(message.into())
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, ControllerError::Precondition(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ControllerError::Validation(_))
    }

    pub fn is_range(&self) -> bool {
        matches!(self, ControllerError::Range { .. })
    }

    /// Errors raised locally, without reaching the native layer
    pub fn is_local(&self) -> bool {
        self.is_precondition() || self.is_validation() || self.is_range()
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
