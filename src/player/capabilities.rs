use tracing::trace;

use super::events::PlatformError;
use super::platform::PlayerPlatform;
use crate::config::VideoPlayerOptions;
use crate::models::PlayerId;

/// Features that depend on both the device and the user's options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    PictureInPicture,
    BackgroundPlayback,
    Casting,
    QualitySelection,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::PictureInPicture => "picture_in_picture",
            Capability::BackgroundPlayback => "background_playback",
            Capability::Casting => "casting",
            Capability::QualitySelection => "quality_selection",
        }
    }

    /// Whether the options permit this capability at all
    pub fn allowed_by(&self, options: &VideoPlayerOptions) -> bool {
        match self {
            Capability::PictureInPicture => options.allow_pip,
            Capability::BackgroundPlayback => options.allow_background_playback,
            Capability::Casting => options.allow_casting,
            Capability::QualitySelection => true,
        }
    }
}

/// Combine the options flag with the device's answer.
///
/// A disallowed capability returns `false` without querying the platform.
pub async fn is_available(
    platform: &dyn PlayerPlatform,
    player_id: PlayerId,
    capability: Capability,
    options: &VideoPlayerOptions,
) -> Result<bool, PlatformError> {
    if !capability.allowed_by(options) {
        trace!("{} disabled by options", capability.as_str());
        return Ok(false);
    }

    let supported = match capability {
        Capability::PictureInPicture => platform.is_pip_supported(player_id).await?,
        Capability::BackgroundPlayback => {
            platform.is_background_playback_supported(player_id).await?
        }
        Capability::Casting => platform.is_casting_supported(player_id).await?,
        Capability::QualitySelection => platform.is_quality_selection_supported(player_id).await?,
    };
    trace!("{} supported by platform: {}", capability.as_str(), supported);
    Ok(supported)
}
