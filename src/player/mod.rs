pub mod capabilities;
pub mod classifier;
pub mod controller;
pub mod events;
pub mod observers;
pub mod platform;
pub mod playlist;
pub mod reconciler;
pub mod retry;
pub mod state;
pub mod tracks;
pub mod types;

pub use capabilities::Capability;
pub use classifier::{classify, ErrorCategory, ErrorSeverity, PlayerError};
pub use controller::PlayerController;
pub use events::{PlatformError, PlayerEvent};
pub use platform::{PlatformResult, PlayerPlatform};
pub use reconciler::{reconcile, Effect, ReconcileContext, Reconciliation};
pub use retry::{RetryDecision, RetryPolicy, RetryScheduler};
pub use state::PlayerState;
pub use types::{
    BufferingReason, FullscreenOrientation, Lifecycle, PipOptions, PlaybackState, ScalingMode,
    VideoSize,
};
