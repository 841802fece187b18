//! A globally-locked arena: one [`crate::single::BumpArena`] behind a
//! `Mutex`, safe to share across threads at the cost of serializing every
//! allocation.

use std::ptr::NonNull;
use std::sync::Mutex;

use crate::error::PoolError;
use crate::pool::Pool;
use crate::single::BumpArena;

/// A thread-safe arena. Every method, including size queries, takes the
/// lock: `capacity()`/`used()` are cheap reads in [`BumpArena`], but a
/// caller observing them through a shared `&LockedArena` should see a
/// value that was actually consistent at some instant, not a racing read
/// of an atomic that could interleave with an in-progress allocation.
///
/// A poisoned mutex (a prior panic while a thread held the lock mid-bump)
/// is treated as an unrecoverable environmental failure, the same stance
/// taken toward VM errors: every method panics via `.lock().unwrap()`
/// rather than attempting to recover a possibly half-updated arena.
pub struct LockedArena {
    inner: Mutex<BumpArena>,
}

impl LockedArena {
    /// Reserve `capacity` bytes and wrap the resulting arena in a mutex.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        Ok(Self {
            inner: Mutex::new(BumpArena::new(capacity)?),
        })
    }
}

impl Pool for LockedArena {
    fn allocate_aligned(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, PoolError> {
        self.inner.lock().unwrap().allocate_aligned(size, alignment)
    }

    fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity()
    }

    fn used(&self) -> usize {
        self.inner.lock().unwrap().used()
    }

    fn alignment_fragmentation(&self) -> usize {
        self.inner.lock().unwrap().alignment_fragmentation()
    }

    fn identity(&self) -> usize {
        &self.inner as *const _ as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_allocations_never_overlap() {
        let arena = Arc::new(LockedArena::new(1_000_000).unwrap());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let arena = Arc::clone(&arena);
            handles.push(thread::spawn(move || {
                let mut regions = Vec::new();
                for _ in 0..500 {
                    let ptr = arena.allocate_aligned(64, 8).unwrap();
                    regions.push(ptr.as_ptr() as usize);
                }
                regions
            }));
        }

        let mut all: Vec<usize> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        let before = all.len();
        all.dedup();
        assert_eq!(all.len(), before, "two threads received overlapping allocations");
        assert_eq!(arena.used(), 8 * 500 * 64);
    }

    #[test]
    fn exhaustion_is_reported_once_capacity_is_gone() {
        let arena = LockedArena::new(100).unwrap();
        arena.allocate_aligned(100, 1).unwrap();
        assert!(arena.allocate_aligned(1, 1).is_err());
    }
}
