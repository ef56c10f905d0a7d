//! Producer side of the record handoff: staging register + ring buffer
//!
//! The newest record always sits in the staging register. Pushing another
//! record moves the staged one into `ring[write_index]` and advances the
//! index modulo capacity. Staging, ring and index are guarded by one lock
//! and updated as a unit.
//!
//! An empty record counts as a vacant staging register: it is never archived.
//!
//! Draining is done by an external consumer through [`HandoffQueue::with_slots`].
//! Nothing here protects an unread slot from being overwritten once the
//! producer wraps around.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::time::Duration;

/// Where a pushed record ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Staging register was empty; the ring was not touched
    Staged,
    /// Previously staged record was archived at `slot`
    Archived { slot: usize },
}

/// Lock-guarded contents of the handoff queue
#[derive(Debug)]
pub struct HandoffSlots {
    staging: Option<String>,
    ring: Vec<Option<String>>,
    write_index: usize,
}

impl HandoffSlots {
    fn new(capacity: usize) -> Self {
        Self {
            staging: None,
            ring: vec![None; capacity],
            write_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    pub fn staged(&self) -> Option<&str> {
        self.staging.as_deref().filter(|s| !s.is_empty())
    }

    /// Remove the staged record
    pub fn take_staged(&mut self) -> Option<String> {
        self.staging.take().filter(|s| !s.is_empty())
    }

    pub fn slot(&self, index: usize) -> Option<&str> {
        self.ring.get(index).and_then(|s| s.as_deref())
    }

    /// Remove the record archived at `index`
    pub fn take_slot(&mut self, index: usize) -> Option<String> {
        self.ring.get_mut(index).and_then(Option::take)
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Restore a persisted write index. Out-of-range values are clamped to 0
    /// on the next archive.
    pub fn set_write_index(&mut self, index: usize) {
        self.write_index = index;
    }

    /// Number of occupied ring slots
    pub fn occupied(&self) -> usize {
        self.ring.iter().filter(|s| s.is_some()).count()
    }

    fn clamp_index(&self, index: usize) -> usize {
        if index >= self.ring.len() { 0 } else { index }
    }

    fn push(&mut self, record: String) -> PushOutcome {
        let displaced = self.staging.replace(record).filter(|s| !s.is_empty());
        let Some(displaced) = displaced else {
            return PushOutcome::Staged;
        };

        let slot = self.clamp_index(self.write_index);
        if slot != self.write_index {
            log::warn!(
                "Handoff write index {} out of range (capacity {}), reset to 0",
                self.write_index,
                self.ring.len()
            );
        }
        log::debug!("Handoff archive slot {} <- {}", slot, displaced);
        self.ring[slot] = Some(displaced);
        self.write_index = self.clamp_index(slot + 1);
        PushOutcome::Archived { slot }
    }
}

/// Staging register and ring buffer behind one coordination lock
pub struct HandoffQueue {
    slots: Mutex<HandoffSlots>,
    capacity: usize,
    lock_timeout: Duration,
}

impl HandoffQueue {
    /// Create a queue with `capacity` ring slots
    pub fn new(capacity: usize, lock_timeout: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidParameter(
                "handoff capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            slots: Mutex::new(HandoffSlots::new(capacity)),
            capacity,
            lock_timeout,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a record
    ///
    /// Waits at most the configured lock timeout for the coordination lock;
    /// on timeout the record is not queued and [`Error::LockTimeout`] is
    /// returned.
    pub fn push(&self, record: impl Into<String>) -> Result<PushOutcome> {
        let record = record.into();
        let mut slots = self.acquire()?;
        Ok(slots.push(record))
    }

    /// Run `f` with exclusive access to staging, ring and write index
    pub fn with_slots<R>(&self, f: impl FnOnce(&mut HandoffSlots) -> R) -> Result<R> {
        let mut slots = self.acquire()?;
        Ok(f(&mut slots))
    }

    fn acquire(&self) -> Result<parking_lot::MutexGuard<'_, HandoffSlots>> {
        self.slots
            .try_lock_for(self.lock_timeout)
            .ok_or(Error::LockTimeout {
                waited_ms: self.lock_timeout.as_millis() as u64,
            })
    }
}
