use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Subtitle file formats understood by the native renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ssa,
    Ass,
    Ttml,
}

impl SubtitleFormat {
    pub fn from_extension(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let (_, extension) = path.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "srt" => Some(SubtitleFormat::Srt),
            "vtt" | "webvtt" => Some(SubtitleFormat::Vtt),
            "ssa" => Some(SubtitleFormat::Ssa),
            "ass" => Some(SubtitleFormat::Ass),
            "ttml" | "dfxp" | "xml" => Some(SubtitleFormat::Ttml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedSubtitle {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSubtitle {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    pub uri: String,
    pub format: Option<SubtitleFormat>,
    #[serde(default)]
    pub is_default: bool,
}

/// A subtitle track, either muxed into the media or loaded from a separate file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubtitleTrack {
    Embedded(EmbeddedSubtitle),
    External(ExternalSubtitle),
}

impl SubtitleTrack {
    pub fn embedded(id: impl Into<String>, language: Option<&str>) -> Self {
        SubtitleTrack::Embedded(EmbeddedSubtitle {
            id: id.into(),
            label: None,
            language: language.map(str::to_string),
            is_default: false,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            SubtitleTrack::Embedded(track) => &track.id,
            SubtitleTrack::External(track) => &track.id,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            SubtitleTrack::Embedded(track) => track.language.as_deref(),
            SubtitleTrack::External(track) => track.language.as_deref(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            SubtitleTrack::Embedded(track) => track.label.as_deref(),
            SubtitleTrack::External(track) => track.label.as_deref(),
        }
    }

    pub fn is_default(&self) -> bool {
        match self {
            SubtitleTrack::Embedded(track) => track.is_default,
            SubtitleTrack::External(track) => track.is_default,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, SubtitleTrack::External(_))
    }
}

/// Request to load a subtitle file next to the media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSource {
    pub uri: String,
    pub format: Option<SubtitleFormat>,
    pub label: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl SubtitleSource {
    /// Build a source, detecting the format from the file extension
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let format = SubtitleFormat::from_extension(&uri);
        Self {
            uri,
            format,
            label: None,
            language: None,
            is_default: false,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub id: String,
    pub label: Option<String>,
    pub language: Option<String>,
    pub channel_count: Option<u32>,
    #[serde(default)]
    pub is_default: bool,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            id: id.into(),
            label: None,
            language: language.map(str::to_string),
            channel_count: None,
            is_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoQualityTrack {
    pub id: String,
    pub label: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bitrate: Option<u64>,
    pub frame_rate: Option<f64>,
}

impl VideoQualityTrack {
    pub fn new(id: impl Into<String>, height: u32, bitrate: u64) -> Self {
        Self {
            id: id.into(),
            label: None,
            width: None,
            height: Some(height),
            bitrate: Some(bitrate),
            frame_rate: None,
        }
    }

    /// Display name such as "1080p" falling back to the id
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match self.height {
            Some(height) => format!("{}p", height),
            None => self.id.clone(),
        }
    }
}

/// A subtitle line extracted from the media container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub text: String,
    pub start: Duration,
    pub end: Duration,
}

impl SubtitleCue {
    pub fn new(text: impl Into<String>, start: Duration, end: Duration) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Whether the cue should be shown at `position` once `offset` is applied.
    ///
    /// A positive offset delays subtitles, so the cue window is shifted later.
    pub fn is_active_at(&self, position: Duration, offset: TimeDelta) -> bool {
        let position_ms = i64::try_from(position.as_millis()).unwrap_or(i64::MAX);
        let start_ms = i64::try_from(self.start.as_millis()).unwrap_or(i64::MAX);
        let end_ms = i64::try_from(self.end.as_millis()).unwrap_or(i64::MAX);
        let offset_ms = offset.num_milliseconds();

        let start = start_ms.saturating_add(offset_ms);
        let end = end_ms.saturating_add(offset_ms);
        position_ms >= start && position_ms < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_format_from_extension() {
        assert_eq!(
            SubtitleFormat::from_extension("movie.en.SRT"),
            Some(SubtitleFormat::Srt)
        );
        assert_eq!(
            SubtitleFormat::from_extension("https://cdn/sub.vtt?sig=abc"),
            Some(SubtitleFormat::Vtt)
        );
        assert_eq!(SubtitleFormat::from_extension("noext"), None);
    }

    #[test]
    fn test_subtitle_track_accessors() {
        let track = SubtitleTrack::External(ExternalSubtitle {
            id: "ext-1".to_string(),
            label: Some("English".to_string()),
            language: Some("en".to_string()),
            uri: "subs.srt".to_string(),
            format: Some(SubtitleFormat::Srt),
            is_default: false,
        });
        assert_eq!(track.id(), "ext-1");
        assert_eq!(track.language(), Some("en"));
        assert_eq!(track.label(), Some("English"));
        assert!(track.is_external());
    }

    #[test]
    fn test_cue_activity_with_offset() {
        let cue = SubtitleCue::new("hello", Duration::from_secs(10), Duration::from_secs(12));

        assert!(cue.is_active_at(Duration::from_secs(11), TimeDelta::zero()));
        assert!(!cue.is_active_at(Duration::from_secs(12), TimeDelta::zero()));

        // Delayed by two seconds: the cue now covers 12s..14s
        let delay = TimeDelta::seconds(2);
        assert!(!cue.is_active_at(Duration::from_secs(11), delay));
        assert!(cue.is_active_at(Duration::from_secs(13), delay));

        // Advanced by two seconds: 8s..10s
        let advance = TimeDelta::seconds(-2);
        assert!(cue.is_active_at(Duration::from_secs(9), advance));
    }

    #[test]
    fn test_quality_display_name() {
        let track = VideoQualityTrack::new("q1", 1080, 5_000_000);
        assert_eq!(track.display_name(), "1080p");
    }
}
