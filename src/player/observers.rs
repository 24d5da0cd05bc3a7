use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::trace;

use super::state::PlayerState;
use crate::models::ListenerId;

pub type StateListener = Arc<dyn Fn(&PlayerState) + Send + Sync>;

/// Owner of the published [`PlayerState`].
///
/// Snapshots are replaced wholesale through a watch channel; callback
/// listeners are notified from a copy of the listener list, so listeners may
/// add or remove listeners while being notified. Once a disposed snapshot
/// has been published, further updates are ignored.
pub struct StateObservers {
    sender: watch::Sender<Arc<PlayerState>>,
    listeners: Mutex<Vec<(ListenerId, StateListener)>>,
    next_listener_id: AtomicI64,
}

impl StateObservers {
    pub fn new(initial: PlayerState) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self {
            sender,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicI64::new(1),
        }
    }

    pub fn current(&self) -> Arc<PlayerState> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PlayerState>> {
        self.sender.subscribe()
    }

    pub fn add_listener(&self, listener: StateListener) -> ListenerId {
        let id = ListenerId::new(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, listener));
        trace!("Added state listener {}", id);
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    /// Derive the next snapshot from the current one and publish it.
    ///
    /// `transition` returns `None` to leave the state untouched. Returns the
    /// published snapshot, or `None` when nothing changed.
    pub fn update<F>(&self, transition: F) -> Option<Arc<PlayerState>>
    where
        F: FnOnce(&PlayerState) -> Option<PlayerState>,
    {
        let mut published = None;
        self.sender.send_if_modified(|current| {
            if current.is_disposed() {
                return false;
            }
            match transition(&**current) {
                Some(next) if next != **current => {
                    let next = Arc::new(next);
                    *current = next.clone();
                    published = Some(next);
                    true
                }
                _ => false,
            }
        });

        if let Some(state) = &published {
            self.notify(state);
        }
        published
    }

    /// Publish the terminal snapshot. Only the first call has an effect.
    pub fn publish_terminal<F>(&self, transition: F) -> Option<Arc<PlayerState>>
    where
        F: FnOnce(&PlayerState) -> PlayerState,
    {
        let mut published = None;
        self.sender.send_if_modified(|current| {
            if current.is_disposed() {
                return false;
            }
            let next = Arc::new(transition(&**current));
            *current = next.clone();
            published = Some(next);
            true
        });

        if let Some(state) = &published {
            self.notify(state);
        }
        published
    }

    fn notify(&self, state: &PlayerState) {
        let listeners: Vec<StateListener> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(state);
        }
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, StateListener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::types::PlaybackState;
    use std::sync::atomic::AtomicUsize;

    fn with_volume(volume: f64) -> impl FnOnce(&PlayerState) -> Option<PlayerState> {
        move |state| {
            Some(PlayerState {
                volume,
                ..state.clone()
            })
        }
    }

    #[test]
    fn test_update_publishes_new_snapshot() {
        let observers = StateObservers::new(PlayerState::default());
        let mut receiver = observers.subscribe();
        let before = observers.current();

        observers.update(with_volume(0.5)).unwrap();

        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().volume, 0.5);
        assert_eq!(before.volume, 1.0);
    }

    #[test]
    fn test_unchanged_state_is_not_published() {
        let observers = StateObservers::new(PlayerState::default());
        let receiver = observers.subscribe();

        assert!(observers.update(|state| Some(state.clone())).is_none());
        assert!(observers.update(|_| None).is_none());
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn test_listeners_notified_and_removed() {
        let observers = StateObservers::new(PlayerState::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let id = observers.add_listener(Arc::new(move |_: &PlayerState| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        observers.update(with_volume(0.3));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(observers.remove_listener(id));
        assert!(!observers.remove_listener(id));
        observers.update(with_volume(0.4));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_register_during_notification() {
        let observers = Arc::new(StateObservers::new(PlayerState::default()));

        let inner = observers.clone();
        observers.add_listener(Arc::new(move |_: &PlayerState| {
            inner.add_listener(Arc::new(|_: &PlayerState| {}));
        }));

        observers.update(with_volume(0.2));
        assert_eq!(observers.listener_count(), 2);
    }

    #[test]
    fn test_disposed_state_is_frozen() {
        let observers = StateObservers::new(PlayerState::default());
        assert!(observers.publish_terminal(|state| state.disposed()).is_some());
        assert!(observers.publish_terminal(|state| state.disposed()).is_none());

        assert!(observers.update(with_volume(0.1)).is_none());
        let state = observers.current();
        assert_eq!(state.playback_state, PlaybackState::Disposed);
        assert_eq!(state.volume, 1.0);
    }
}
