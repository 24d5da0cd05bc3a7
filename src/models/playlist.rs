use super::VideoSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Stop after the last item
    #[default]
    None,
    /// Wrap around to the first item
    All,
    /// Replay the current item when it completes
    One,
}

/// Presentation order used while shuffle is enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleOrder {
    /// Seed the permutation was generated from
    pub seed: u64,
    /// Item indices in play order
    pub order: Vec<usize>,
}

impl ShuffleOrder {
    /// Position of `index` inside the shuffled order
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&i| i == index)
    }
}

/// Ordered list of sources with the current position.
///
/// Shuffling never reorders `items`; it only attaches a [`ShuffleOrder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub items: Vec<VideoSource>,
    pub index: usize,
    pub repeat_mode: RepeatMode,
    pub shuffle: Option<ShuffleOrder>,
}

impl Playlist {
    /// Create a playlist positioned at `initial_index`, clamped to the last item.
    ///
    /// Returns `None` when `items` is empty.
    pub fn new(items: Vec<VideoSource>, initial_index: usize) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let index = initial_index.min(items.len() - 1);
        Some(Self {
            items,
            index,
            repeat_mode: RepeatMode::None,
            shuffle: None,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    pub fn current(&self) -> Option<&VideoSource> {
        self.items.get(self.index)
    }

    pub fn get(&self, index: usize) -> Option<&VideoSource> {
        self.items.get(index)
    }

    /// Items in the order they will be played
    pub fn play_order(&self) -> Vec<usize> {
        match &self.shuffle {
            Some(shuffle) => shuffle.order.clone(),
            None => (0..self.items.len()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(count: usize) -> Vec<VideoSource> {
        (0..count)
            .map(|i| VideoSource::network(format!("https://example.com/{}.mp4", i)))
            .collect()
    }

    #[test]
    fn test_new_clamps_initial_index() {
        let playlist = Playlist::new(sources(3), 10).unwrap();
        assert_eq!(playlist.index, 2);
        assert_eq!(playlist.repeat_mode, RepeatMode::None);
        assert!(!playlist.is_shuffled());
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(Playlist::new(Vec::new(), 0).is_none());
    }

    #[test]
    fn test_play_order_follows_shuffle() {
        let mut playlist = Playlist::new(sources(3), 0).unwrap();
        assert_eq!(playlist.play_order(), vec![0, 1, 2]);

        playlist.shuffle = Some(ShuffleOrder {
            seed: 7,
            order: vec![0, 2, 1],
        });
        assert_eq!(playlist.play_order(), vec![0, 2, 1]);
        assert_eq!(playlist.shuffle.as_ref().unwrap().position_of(2), Some(1));
    }
}
