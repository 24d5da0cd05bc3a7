//! Playlist navigation.
//!
//! Everything here is a pure function over a [`Playlist`] value. Callers
//! apply the returned index or playlist to the state snapshot and reload
//! the native player themselves.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::models::{Playlist, RepeatMode, ShuffleOrder};
use crate::utils::errors::ControllerError;

/// What happens when the current item finishes playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    /// Repeat mode `One`: play the same item again
    RestartCurrent,
    /// Load the item at this index
    Advance(usize),
    /// Nothing left to play
    EndOfPlaylist,
}

/// Index of the item after the current one in play order.
///
/// Wraps to the start only with [`RepeatMode::All`]; `One` does not affect
/// manual navigation.
pub fn next_index(playlist: &Playlist) -> Option<usize> {
    let order = playlist.play_order();
    let position = current_position(playlist, &order)?;

    if position + 1 < order.len() {
        order.get(position + 1).copied()
    } else if playlist.repeat_mode == RepeatMode::All {
        order.first().copied()
    } else {
        None
    }
}

/// Index of the item before the current one. Never wraps backwards.
pub fn previous_index(playlist: &Playlist) -> Option<usize> {
    let order = playlist.play_order();
    let position = current_position(playlist, &order)?;
    if position == 0 {
        return None;
    }
    order.get(position - 1).copied()
}

pub fn has_next(playlist: &Playlist) -> bool {
    next_index(playlist).is_some()
}

pub fn has_previous(playlist: &Playlist) -> bool {
    previous_index(playlist).is_some()
}

/// Validate `index` and return the playlist positioned there
pub fn jump_to(playlist: &Playlist, index: usize) -> Result<Playlist, ControllerError> {
    if index >= playlist.len() {
        return Err(ControllerError::Range {
            index,
            len: playlist.len(),
        });
    }
    Ok(move_to(playlist, index))
}

/// Reposition without bounds checking beyond clamping
pub fn move_to(playlist: &Playlist, index: usize) -> Playlist {
    let index = index.min(playlist.len().saturating_sub(1));
    Playlist {
        index,
        ..playlist.clone()
    }
}

/// Decide the automatic advance after the current item completes
pub fn on_completed(playlist: &Playlist) -> CompletionAction {
    if playlist.repeat_mode == RepeatMode::One {
        return CompletionAction::RestartCurrent;
    }
    match next_index(playlist) {
        Some(index) => CompletionAction::Advance(index),
        None => CompletionAction::EndOfPlaylist,
    }
}

pub fn with_repeat_mode(playlist: &Playlist, repeat_mode: RepeatMode) -> Playlist {
    Playlist {
        repeat_mode,
        ..playlist.clone()
    }
}

/// Enable or disable shuffle.
///
/// Enabling builds a fresh permutation from `seed` with the current item
/// first, so playback continues from where it is. Enabling while already
/// shuffled keeps the existing order. Disabling restores list order.
pub fn with_shuffle(playlist: &Playlist, enabled: bool, seed: u64) -> Playlist {
    let shuffle = match (enabled, &playlist.shuffle) {
        (true, Some(existing)) => Some(existing.clone()),
        (true, None) => Some(shuffle_order(playlist.len(), playlist.index, seed)),
        (false, _) => None,
    };
    Playlist {
        shuffle,
        ..playlist.clone()
    }
}

/// Deterministic permutation of `0..len` starting with `current`
pub fn shuffle_order(len: usize, current: usize, seed: u64) -> ShuffleOrder {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rest: Vec<usize> = (0..len).filter(|&i| i != current).collect();
    rest.shuffle(&mut rng);

    let mut order = Vec::with_capacity(len);
    if current < len {
        order.push(current);
    }
    order.extend(rest);

    debug!("Built shuffle order {:?} from seed {}", order, seed);
    ShuffleOrder { seed, order }
}

fn current_position(playlist: &Playlist, order: &[usize]) -> Option<usize> {
    order.iter().position(|&i| i == playlist.index)
}
