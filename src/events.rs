//! Key change listeners
//!
//! A [`ListenerRegistry`] tracks which listeners care about which keys of one
//! config file and delivers change notifications to them. The subscriber
//! table and its key index share one lock, which is never held while a
//! callback runs, so listeners may subscribe, unsubscribe or trigger further
//! notifications from inside a callback.

use crate::dispatch::Delivery;
use log::debug;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Something that wants to hear about changed config keys
pub trait ConfigListener: Send + Sync {
    /// `key` was changed (or is being replayed by `load_all`)
    fn on_config_changed(&self, key: &str);
}

impl<F> ConfigListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_config_changed(&self, key: &str) {
        self(key);
    }
}

/// Identifies one subscription within a [`ListenerRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Groups the subscriptions made through one handle
///
/// Subscribing the same listener twice merges only within one owner, and
/// [`ListenerRegistry::unsubscribe_owner`] removes exactly that owner's
/// subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Owner of subscriptions made directly on the registry
    pub const SHARED: OwnerId = OwnerId(0);
}

struct Subscriber {
    owner: OwnerId,
    callback: Arc<dyn ConfigListener>,
    keys: BTreeSet<String>,
}

#[derive(Default)]
struct ListenerState {
    subscribers: HashMap<ListenerId, Subscriber>,
    by_key: HashMap<String, Vec<ListenerId>>,
}

impl ListenerState {
    fn is_subscribed(&self, id: ListenerId, key: &str) -> bool {
        self.subscribers
            .get(&id)
            .is_some_and(|subscriber| subscriber.keys.contains(key))
    }

    fn add_keys(&mut self, id: ListenerId, keys: Vec<String>) {
        let Some(subscriber) = self.subscribers.get_mut(&id) else {
            return;
        };
        for key in keys {
            if subscriber.keys.insert(key.clone()) {
                self.by_key.entry(key).or_default().push(id);
            }
        }
    }

    fn remove_key(&mut self, id: ListenerId, key: &str) {
        if let Some(ids) = self.by_key.get_mut(key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_key.remove(key);
            }
        }
    }
}

/// Per-key subscriber sets for one config file
pub struct ListenerRegistry {
    file_name: String,
    state: Arc<Mutex<ListenerState>>,
    next_id: AtomicU64,
    next_owner: AtomicU64,
    delivery: Delivery,
}

impl ListenerRegistry {
    pub fn new(file_name: impl Into<String>, delivery: Delivery) -> Self {
        Self {
            file_name: file_name.into(),
            state: Arc::new(Mutex::new(ListenerState::default())),
            next_id: AtomicU64::new(1),
            next_owner: AtomicU64::new(1),
            delivery,
        }
    }

    /// A fresh owner tag for one handle's subscriptions
    pub fn new_owner(&self) -> OwnerId {
        OwnerId(self.next_owner.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe `listener` to `keys` under [`OwnerId::SHARED`]
    pub fn subscribe<I, K>(&self, listener: Arc<dyn ConfigListener>, keys: I) -> ListenerId
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.subscribe_owned(OwnerId::SHARED, listener, keys)
    }

    /// Subscribe `listener` to `keys` on behalf of `owner`
    ///
    /// Passing a listener that `owner` already subscribed adds the keys to
    /// that subscription and returns the same id. The same listener under a
    /// different owner gets a separate subscription.
    pub fn subscribe_owned<I, K>(
        &self,
        owner: OwnerId,
        listener: Arc<dyn ConfigListener>,
        keys: I,
    ) -> ListenerId
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let target = Arc::as_ptr(&listener).cast::<()>();

        let mut state = self.state.lock();
        let existing = state
            .subscribers
            .iter()
            .find(|(_, subscriber)| {
                subscriber.owner == owner
                    && Arc::as_ptr(&subscriber.callback).cast::<()>() == target
            })
            .map(|(id, _)| *id);

        let id = existing.unwrap_or_else(|| {
            let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
            state.subscribers.insert(
                id,
                Subscriber {
                    owner,
                    callback: listener,
                    keys: BTreeSet::new(),
                },
            );
            id
        });
        debug!("{}: listener {id:?} ({owner:?}) tracks {keys:?}", self.file_name);
        state.add_keys(id, keys);
        id
    }

    /// Add keys to an existing subscription; returns false for an unknown id
    pub fn track<I, K>(&self, id: ListenerId, keys: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut state = self.state.lock();
        if !state.subscribers.contains_key(&id) {
            return false;
        }
        state.add_keys(id, keys.into_iter().map(Into::into).collect());
        true
    }

    /// Stop delivering `keys` to a listener; the subscription itself stays
    pub fn untrack<I, K>(&self, id: ListenerId, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut state = self.state.lock();
        for key in keys {
            let key = key.as_ref();
            let removed = state
                .subscribers
                .get_mut(&id)
                .is_some_and(|subscriber| subscriber.keys.remove(key));
            if removed {
                state.remove_key(id, key);
            }
        }
    }

    /// Remove a listener from every key
    ///
    /// Returns false if it was not subscribed. Calls already in progress
    /// finish, but no further call reaches the listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.subscribers.remove(&id);
            if let Some(subscriber) = &removed {
                for key in &subscriber.keys {
                    state.remove_key(id, key);
                }
            }
            removed
        };
        // the callback may own handles; drop it outside the lock
        let Some(_subscriber) = removed else {
            return false;
        };
        debug!("{}: listener {id:?} unsubscribed", self.file_name);
        true
    }

    /// Remove every subscription made by `owner`; returns how many there were
    pub fn unsubscribe_owner(&self, owner: OwnerId) -> usize {
        let removed: Vec<(ListenerId, Subscriber)> = {
            let mut state = self.state.lock();
            let ids: Vec<ListenerId> = state
                .subscribers
                .iter()
                .filter(|(_, subscriber)| subscriber.owner == owner)
                .map(|(id, _)| *id)
                .collect();
            let mut removed = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(subscriber) = state.subscribers.remove(&id) {
                    for key in &subscriber.keys {
                        state.remove_key(id, key);
                    }
                    removed.push((id, subscriber));
                }
            }
            removed
        };
        if !removed.is_empty() {
            debug!(
                "{}: {owner:?} dropped {} listener(s)",
                self.file_name,
                removed.len()
            );
        }
        removed.len()
    }

    /// Tell every listener tracking `key` that it changed
    ///
    /// Returns the number of listeners notified (or queued for notification).
    pub fn notify(&self, key: &str) -> usize {
        let targets: Vec<(ListenerId, Arc<dyn ConfigListener>)> = {
            let state = self.state.lock();
            state
                .by_key
                .get(key)
                .into_iter()
                .flatten()
                .filter_map(|id| {
                    state
                        .subscribers
                        .get(id)
                        .map(|subscriber| (*id, Arc::clone(&subscriber.callback)))
                })
                .collect()
        };

        let count = targets.len();
        for (id, callback) in targets {
            self.deliver(id, callback, key);
        }
        count
    }

    /// Replay every key a listener tracks to that listener alone
    pub fn load_all(&self, id: ListenerId) -> usize {
        let Some((callback, keys)) = self.subscription(id) else {
            return 0;
        };
        let count = keys.len();
        for key in keys {
            self.deliver(id, Arc::clone(&callback), &key);
        }
        count
    }

    /// Keys a listener currently tracks
    pub fn subscribed_keys(&self, id: ListenerId) -> Vec<String> {
        self.subscription(id)
            .map(|(_, keys)| keys)
            .unwrap_or_default()
    }

    /// Number of listeners tracking `key`
    pub fn listener_count(&self, key: &str) -> usize {
        self.state.lock().by_key.get(key).map_or(0, Vec::len)
    }

    /// Whether `id` is still subscribed
    pub fn contains(&self, id: ListenerId) -> bool {
        self.state.lock().subscribers.contains_key(&id)
    }

    fn subscription(&self, id: ListenerId) -> Option<(Arc<dyn ConfigListener>, Vec<String>)> {
        let state = self.state.lock();
        state.subscribers.get(&id).map(|subscriber| {
            (
                Arc::clone(&subscriber.callback),
                subscriber.keys.iter().cloned().collect(),
            )
        })
    }

    /// Run one callback, skipping it if the listener stopped tracking `key`
    /// by the time it would run
    fn deliver(&self, id: ListenerId, callback: Arc<dyn ConfigListener>, key: &str) {
        let state: Weak<Mutex<ListenerState>> = Arc::downgrade(&self.state);
        let key = key.to_string();
        self.delivery.run(Box::new(move || {
            let subscribed = state
                .upgrade()
                .is_some_and(|state| state.lock().is_subscribed(id, &key));
            if subscribed {
                callback.on_config_changed(&key);
            }
        }));
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ListenerRegistry")
            .field("file_name", &self.file_name)
            .field("listeners", &state.subscribers.len())
            .field("delivery", &self.delivery)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
