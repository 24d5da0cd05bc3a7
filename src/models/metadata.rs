use serde::{Deserialize, Serialize};

/// Now-playing information shown by system media controls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
}

impl MediaMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.artwork_url.is_none()
    }

    /// Overlay the fields present in `update`, keeping the rest
    pub fn merged_with(&self, update: &MediaMetadata) -> MediaMetadata {
        MediaMetadata {
            title: update.title.clone().or_else(|| self.title.clone()),
            artist: update.artist.clone().or_else(|| self.artist.clone()),
            album: update.album.clone().or_else(|| self.album.clone()),
            artwork_url: update
                .artwork_url
                .clone()
                .or_else(|| self.artwork_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_last_writer_wins_per_field() {
        let base = MediaMetadata {
            title: Some("Old".to_string()),
            artist: Some("Artist".to_string()),
            ..Default::default()
        };
        let merged = base.merged_with(&MediaMetadata::titled("New"));
        assert_eq!(merged.title.as_deref(), Some("New"));
        assert_eq!(merged.artist.as_deref(), Some("Artist"));
        assert!(!merged.is_empty());
    }
}
