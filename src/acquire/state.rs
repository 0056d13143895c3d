//! Per-item lifecycle tracking.
//!
//! Each item moves `Idle -> Checking -> Downloading -> Consuming -> Idle`.
//! Every run ends back in `Idle`, including a failed one; the failure
//! itself is reported through the run's outcome. Entries are keyed by [`ItemKey`] so state follows the
//! item, not its position in a list. A generation number per run lets a
//! caller abandon an in-flight run; the abandoned run can then no longer
//! write state or trigger a consume.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::asset::ItemKey;

/// Observable state of one item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemState {
    #[default]
    Idle,
    /// Waiting on the quota check.
    Checking,
    /// Bytes are streaming; `percent` is known once a total was declared.
    Downloading { percent: Option<u8> },
    /// Acquired; recording usage.
    Consuming,
}

impl ItemState {
    /// True while a run owns the item.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Checking | Self::Downloading { .. } | Self::Consuming
        )
    }
}

#[derive(Debug)]
struct Slot {
    state: ItemState,
    generation: u64,
}

/// Concurrent map of item states.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct ItemTracker {
    slots: Arc<DashMap<ItemKey, Slot>>,
    generations: Arc<AtomicU64>,
}

impl ItemTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `key`; unknown items are idle.
    #[must_use]
    pub fn state(&self, key: &ItemKey) -> ItemState {
        self.slots
            .get(key)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    /// Number of items with a run in progress.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.slots.iter().filter(|s| s.state.is_busy()).count()
    }

    /// Starts a run for `key`, moving it to [`ItemState::Checking`].
    ///
    /// Returns `None` while another run for the same key is in progress.
    #[must_use]
    pub fn begin(&self, key: &ItemKey) -> Option<ItemTicket> {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = Slot {
            state: ItemState::Checking,
            generation,
        };
        match self.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().state.is_busy() {
                    return None;
                }
                occupied.insert(slot);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
            }
        }
        Some(ItemTicket {
            tracker: self.clone(),
            key: key.clone(),
            generation,
            finished: false,
        })
    }

    /// Resets `key` to idle and invalidates any run in progress for it.
    pub fn abandon(&self, key: &ItemKey) {
        self.slots.remove(key);
    }

    fn set_if_current(&self, key: &ItemKey, generation: u64, state: ItemState) -> bool {
        match self.slots.get_mut(key) {
            Some(mut slot) if slot.generation == generation => {
                slot.state = state;
                true
            }
            _ => false,
        }
    }

    fn is_current(&self, key: &ItemKey, generation: u64) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.generation == generation)
    }

    fn clear_if_current(&self, key: &ItemKey, generation: u64) {
        self.slots
            .remove_if(key, |_, slot| slot.generation == generation);
    }
}

/// Ownership of one run for one item.
///
/// Dropping an unfinished ticket returns the item to idle, so a cancelled
/// future never leaves an item stuck busy.
#[derive(Debug)]
pub struct ItemTicket {
    tracker: ItemTracker,
    key: ItemKey,
    generation: u64,
    finished: bool,
}

impl ItemTicket {
    /// Key this ticket runs for.
    #[must_use]
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    /// False once the run was abandoned or superseded.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.tracker.is_current(&self.key, self.generation)
    }

    /// Moves the item to `state`. Returns false if the run is no longer current.
    pub fn set(&self, state: ItemState) -> bool {
        self.tracker
            .set_if_current(&self.key, self.generation, state)
    }

    /// Ends the run and returns the item to idle, dropping its slot.
    pub fn finish(mut self) {
        self.finished = true;
        self.tracker.clear_if_current(&self.key, self.generation);
    }
}

impl Drop for ItemTicket {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.clear_if_current(&self.key, self.generation);
        }
    }
}
