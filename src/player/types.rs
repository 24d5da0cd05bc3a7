/// Common types shared by the controller, the reconciler and the native boundary
use serde::{Deserialize, Serialize};

/// Controller lifecycle. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Ready,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Ready,
    Playing,
    Paused,
    Buffering,
    Completed,
    Error,
    Disposed,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Uninitialized => "uninitialized",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Completed => "completed",
            PlaybackState::Error => "error",
            PlaybackState::Disposed => "disposed",
        }
    }
}

/// Why playback is currently stalled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferingReason {
    Initial,
    Seeking,
    InsufficientBandwidth,
    NetworkUnstable,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Letterbox to fit the whole frame
    #[default]
    Fit,
    /// Crop to fill the view
    Fill,
    /// Stretch ignoring the aspect ratio
    Stretch,
}

impl ScalingMode {
    pub fn label(&self) -> &'static str {
        match self {
            ScalingMode::Fit => "Fit",
            ScalingMode::Fill => "Fill",
            ScalingMode::Stretch => "Stretch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FullscreenOrientation {
    Portrait,
    Landscape,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PipOptions {
    /// Window aspect ratio; defaults to the video's
    pub aspect_ratio: Option<f64>,
    pub auto_enter_on_background: bool,
}

/// Decoded frame dimensions as reported by the native player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height; 0.0 when the height is unknown
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let size = VideoSize::new(1920, 1080);
        assert!((size.aspect_ratio() - 16.0 / 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aspect_ratio_zero_height() {
        let ratio = VideoSize::new(1920, 0).aspect_ratio();
        assert_eq!(ratio, 0.0);
        assert!(ratio.is_finite());
    }
}
