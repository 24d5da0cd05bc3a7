use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Where the media for a player instance comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoSource {
    /// Remote stream (progressive, HLS or DASH)
    Network {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// File on the local filesystem
    File { path: PathBuf },
    /// Resource bundled with the application
    Asset { asset_path: String },
    /// Remote playlist manifest (M3U/PLS), expanded by the native layer
    Playlist {
        url: String,
        #[serde(default)]
        format: Option<PlaylistFormat>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistFormat {
    M3u,
    Pls,
}

impl PlaylistFormat {
    /// Guess the manifest format from a URL or path extension
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "m3u" | "m3u8" => Some(PlaylistFormat::M3u),
            "pls" => Some(PlaylistFormat::Pls),
            _ => None,
        }
    }
}

impl VideoSource {
    pub fn network(url: impl Into<String>) -> Self {
        VideoSource::Network {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        VideoSource::File { path: path.into() }
    }

    pub fn asset(asset_path: impl Into<String>) -> Self {
        VideoSource::Asset {
            asset_path: asset_path.into(),
        }
    }

    pub fn playlist(url: impl Into<String>) -> Self {
        let url = url.into();
        let format = PlaylistFormat::from_url(&url);
        VideoSource::Playlist { url, format }
    }

    /// Whether playback depends on network availability
    pub fn is_remote(&self) -> bool {
        match self {
            VideoSource::Network { .. } | VideoSource::Playlist { .. } => true,
            VideoSource::File { .. } | VideoSource::Asset { .. } => false,
        }
    }

    /// Short human readable description used in logs
    pub fn describe(&self) -> String {
        match self {
            VideoSource::Network { url, .. } => format!("network:{}", url),
            VideoSource::File { path } => format!("file:{}", path.display()),
            VideoSource::Asset { asset_path } => format!("asset:{}", asset_path),
            VideoSource::Playlist { url, .. } => format!("playlist:{}", url),
        }
    }
}
