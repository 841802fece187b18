//! A per-thread arena: each thread that touches the pool gets its own
//! private [`crate::single::BumpArena`], reserved lazily on first use.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PoolError;
use crate::pool::Pool;
use crate::single::BumpArena;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static REGISTRY: RefCell<HashMap<u64, BumpArena>> = RefCell::new(HashMap::new());
}

/// A pool that hands every thread its own private arena.
///
/// Cloning the handle (via `Clone`, derived through the `id`) lets multiple
/// threads share one logical pool while each still allocates from its own
/// private backing arena. `used()` and `alignment_fragmentation()` report
/// only the calling thread's own arena, never a sum across threads; a thread
/// that has not yet allocated sees `used() == 0` regardless of how much
/// other threads have consumed. `capacity()` is the per-thread figure passed
/// to [`PerThreadArena::new`], not a total across threads either.
#[derive(Clone, Copy)]
pub struct PerThreadArena {
    id: u64,
    per_thread_capacity: usize,
}

impl PerThreadArena {
    /// Note: `capacity` here is the capacity given to *each* thread's arena,
    /// reserved only when that thread first allocates from this pool, not
    /// an up-front reservation multiplied across threads.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        debug_assert!(capacity > 0);
        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            per_thread_capacity: capacity,
        })
    }

    fn with_arena<R>(&self, f: impl FnOnce(&BumpArena) -> R) -> R {
        REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            let arena = registry.entry(self.id).or_insert_with(|| {
                BumpArena::new(self.per_thread_capacity).unwrap_or_else(|err| {
                    log::error!(
                        "per-thread arena {} failed to reserve {} bytes: {err}",
                        self.id,
                        self.per_thread_capacity
                    );
                    panic!("per-thread arena reservation failed: {err}");
                })
            });
            f(arena)
        })
    }
}

impl Pool for PerThreadArena {
    fn allocate_aligned(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, PoolError> {
        self.with_arena(|arena| arena.allocate_aligned(size, alignment))
    }

    fn capacity(&self) -> usize {
        self.per_thread_capacity
    }

    fn used(&self) -> usize {
        self.with_arena(|arena| arena.used())
    }

    fn alignment_fragmentation(&self) -> usize {
        self.with_arena(|arena| arena.alignment_fragmentation())
    }

    fn identity(&self) -> usize {
        self.id as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn each_thread_gets_an_independent_arena() {
        let pool = PerThreadArena::new(1024).unwrap();

        let pool_a = pool;
        let handle = thread::spawn(move || {
            pool_a.allocate_aligned(512, 1).unwrap();
            pool_a.used()
        });
        let used_on_other_thread = handle.join().unwrap();
        assert_eq!(used_on_other_thread, 512);

        // This thread's own arena is untouched by the other thread's use.
        assert_eq!(pool.used(), 0);
        pool.allocate_aligned(100, 1).unwrap();
        assert_eq!(pool.used(), 100);
    }

    #[test]
    fn two_distinct_pools_have_distinct_identity() {
        let a = PerThreadArena::new(64).unwrap();
        let b = PerThreadArena::new(64).unwrap();
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn exhaustion_is_per_thread_local() {
        let pool = PerThreadArena::new(100).unwrap();
        pool.allocate_aligned(100, 1).unwrap();
        assert!(pool.allocate_aligned(1, 1).is_err());

        let handle = thread::spawn(move || pool.allocate_aligned(100, 1).is_ok());
        assert!(handle.join().unwrap());
    }
}
