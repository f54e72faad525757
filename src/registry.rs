//! Reference-counted table of shared per-file resources
//!
//! A [`ResourceRegistry`] maps a file identity to at most one live resource.
//! Each [`acquire`](ResourceRegistry::acquire) hands out the shared resource
//! together with a [`ReleaseToken`]; the resource is built on the first
//! acquire and finalized when the last token is released.
//!
//! Two levels of locking keep unrelated files independent:
//!
//! - the map lock is held only to find, insert or remove a file's slot
//! - each slot has its own lock that serializes acquire and release for that
//!   file, including the resource factory and the final flush

use crate::error::Result;
use crate::notice::NoticeSink;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A resource shared by every holder of the same file id
pub trait SharedResource: Send + Sync + 'static {
    /// Called once, under the slot lock, when the last reference goes away
    ///
    /// # Errors
    ///
    /// The error is returned from [`ReleaseToken::release`] or, when the token
    /// is dropped, handed to the registry's [`NoticeSink`].
    fn on_last_release(&self) -> Result<()>;
}

struct Entry<R> {
    resource: Arc<R>,
    refs: usize,
}

struct Slot<R> {
    entry: Mutex<Option<Entry<R>>>,
}

impl<R> Slot<R> {
    fn empty() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }
}

/// Table of live resources keyed by file id
pub struct ResourceRegistry<R: SharedResource> {
    slots: Mutex<HashMap<String, Arc<Slot<R>>>>,
    notice: Arc<dyn NoticeSink>,
}

impl<R: SharedResource> ResourceRegistry<R> {
    pub fn new(notice: Arc<dyn NoticeSink>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            notice,
        }
    }

    /// Get the live resource for `file_id`, building it with `factory` if
    /// there is none
    ///
    /// # Errors
    ///
    /// Returns the factory's error; nothing is registered in that case.
    pub fn acquire<F>(self: &Arc<Self>, file_id: &str, factory: F) -> Result<(Arc<R>, ReleaseToken<R>)>
    where
        F: FnOnce() -> Result<R>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(
                slots
                    .entry(file_id.to_string())
                    .or_insert_with(|| Arc::new(Slot::empty())),
            )
        };

        let mut entry = slot.entry.lock();
        let resource = match entry.as_mut() {
            Some(live) => {
                live.refs += 1;
                debug!("{file_id}: {} references", live.refs);
                Arc::clone(&live.resource)
            }
            None => match factory() {
                Ok(resource) => {
                    debug!("{file_id}: created shared resource");
                    let resource = Arc::new(resource);
                    *entry = Some(Entry {
                        resource: Arc::clone(&resource),
                        refs: 1,
                    });
                    resource
                }
                Err(e) => {
                    drop(entry);
                    self.remove_if_unused(file_id, &slot);
                    return Err(e);
                }
            },
        };
        drop(entry);

        let token = ReleaseToken {
            registry: Arc::clone(self),
            file_id: file_id.to_string(),
            slot,
            released: false,
        };
        Ok((resource, token))
    }

    /// Number of outstanding references to `file_id`
    pub fn ref_count(&self, file_id: &str) -> usize {
        let Some(slot) = self.slots.lock().get(file_id).cloned() else {
            return 0;
        };
        let entry = slot.entry.lock();
        entry.as_ref().map_or(0, |live| live.refs)
    }

    /// File ids with a live resource, sorted
    ///
    /// Slot locks are taken after the map lock is released, so a file that
    /// is loading or flushing delays this call but not other files.
    pub fn open_files(&self) -> Vec<String> {
        let slots: Vec<(String, Arc<Slot<R>>)> = self
            .slots
            .lock()
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();
        let mut files: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| slot.entry.lock().is_some())
            .map(|(id, _)| id)
            .collect();
        files.sort();
        files
    }

    fn release_slot(&self, file_id: &str, slot: &Arc<Slot<R>>) -> Result<()> {
        let result = {
            let mut entry = slot.entry.lock();
            let Some(live) = entry.as_mut() else {
                return Ok(());
            };
            live.refs -= 1;
            if live.refs > 0 {
                debug!("{file_id}: {} references", live.refs);
                return Ok(());
            }

            debug!("{file_id}: last reference released");
            let result = live.resource.on_last_release();
            *entry = None;
            result
        };

        self.remove_if_unused(file_id, slot);
        result
    }

    fn duplicate_slot(&self, file_id: &str, slot: &Arc<Slot<R>>) {
        let mut entry = slot.entry.lock();
        if let Some(live) = entry.as_mut() {
            live.refs += 1;
            debug!("{file_id}: {} references", live.refs);
        }
    }

    /// Drop the slot from the map if it holds no resource and nobody besides
    /// the caller is about to lock it
    fn remove_if_unused(&self, file_id: &str, slot: &Arc<Slot<R>>) {
        let mut slots = self.slots.lock();
        let unused = slots.get(file_id).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && Arc::strong_count(slot) <= 2
                && slot.entry.lock().is_none()
        });
        if unused {
            slots.remove(file_id);
        }
    }
}

/// One reference to a registry resource, released when dropped
///
/// Call [`release`](Self::release) to observe the final error instead of
/// routing it to the [`NoticeSink`].
#[must_use = "dropping the token releases the resource immediately"]
pub struct ReleaseToken<R: SharedResource> {
    registry: Arc<ResourceRegistry<R>>,
    file_id: String,
    slot: Arc<Slot<R>>,
    released: bool,
}

impl<R: SharedResource> ReleaseToken<R> {
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Add another reference to the same live resource
    pub fn duplicate(&self) -> Self {
        self.registry.duplicate_slot(&self.file_id, &self.slot);
        Self {
            registry: Arc::clone(&self.registry),
            file_id: self.file_id.clone(),
            slot: Arc::clone(&self.slot),
            released: false,
        }
    }

    /// Release this reference now
    ///
    /// # Errors
    ///
    /// Returns the resource's finalization error if this was the last
    /// reference.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.registry.release_slot(&self.file_id, &self.slot)
    }
}

impl<R: SharedResource> Drop for ReleaseToken<R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.registry.release_slot(&self.file_id, &self.slot) {
            self.registry.notice.save_failed(&self.file_id, &e);
        }
    }
}

impl<R: SharedResource> std::fmt::Debug for ReleaseToken<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseToken")
            .field("file_id", &self.file_id)
            .field("released", &self.released)
            .finish()
    }
}
