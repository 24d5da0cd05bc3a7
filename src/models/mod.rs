mod identifiers;
pub mod metadata;
pub mod playlist;
pub mod source;
pub mod tracks;

pub use identifiers::{ListenerId, PlayerId};
pub use metadata::MediaMetadata;
pub use playlist::{Playlist, RepeatMode, ShuffleOrder};
pub use source::{PlaylistFormat, VideoSource};
pub use tracks::{
    AudioTrack, EmbeddedSubtitle, ExternalSubtitle, SubtitleCue, SubtitleFormat, SubtitleSource,
    SubtitleTrack, VideoQualityTrack,
};
