//! Construction and dispatch across the three arena variants.
//!
//! Mirrors the cheap-to-create, no-pooling-of-instances factory pattern:
//! creating an [`AnyPool`] does exactly one reservation (or, for
//! [`PoolKind::PerThread`], defers even that), and dropping it releases the
//! reservation. There is no registry of live pools to manage.

use std::ptr::NonNull;

use crate::error::PoolError;
use crate::locked::LockedArena;
use crate::per_thread::PerThreadArena;
use crate::pool::Pool;
use crate::single::BumpArena;

/// Which concurrency variant a pool should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolKind {
    /// A single [`BumpArena`], not `Sync`. Fastest, single-thread only.
    SingleThreaded,
    /// A [`LockedArena`]: one arena shared across threads behind a mutex.
    #[default]
    ThreadSafe,
    /// A [`PerThreadArena`]: every thread gets its own private arena.
    PerThread,
}

/// Parameters for creating a pool via [`AnyPool::create_with_config`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Total capacity in bytes (per-thread capacity, for [`PoolKind::PerThread`]).
    pub capacity: usize,
    /// Which concurrency variant to build.
    pub kind: PoolKind,
}

impl PoolConfig {
    /// A thread-safe pool of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            kind: PoolKind::default(),
        }
    }

    /// Set the concurrency variant.
    pub fn with_kind(mut self, kind: PoolKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A pool of one of the three concurrency variants, dispatched by a tag
/// rather than a trait object, so callers who know their variant up front
/// never pay for a vtable indirection through [`Pool`].
pub enum AnyPool {
    SingleThreaded(BumpArena),
    ThreadSafe(LockedArena),
    PerThread(PerThreadArena),
}

impl AnyPool {
    /// Create a thread-safe pool of the given capacity. Equivalent to
    /// `AnyPool::create_with_config(PoolConfig::new(capacity))`.
    pub fn create(capacity: usize) -> Result<Self, PoolError> {
        Self::create_with_config(PoolConfig::new(capacity))
    }

    /// Create a pool per `config`.
    pub fn create_with_config(config: PoolConfig) -> Result<Self, PoolError> {
        if config.capacity == 0 {
            return Err(PoolError::InvalidCapacity {
                requested: config.capacity,
            });
        }
        Ok(match config.kind {
            PoolKind::SingleThreaded => AnyPool::SingleThreaded(BumpArena::new(config.capacity)?),
            PoolKind::ThreadSafe => AnyPool::ThreadSafe(LockedArena::new(config.capacity)?),
            PoolKind::PerThread => AnyPool::PerThread(PerThreadArena::new(config.capacity)?),
        })
    }
}

impl Pool for AnyPool {
    fn allocate_aligned(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, PoolError> {
        match self {
            AnyPool::SingleThreaded(arena) => arena.allocate_aligned(size, alignment),
            AnyPool::ThreadSafe(arena) => arena.allocate_aligned(size, alignment),
            AnyPool::PerThread(arena) => arena.allocate_aligned(size, alignment),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            AnyPool::SingleThreaded(arena) => arena.capacity(),
            AnyPool::ThreadSafe(arena) => arena.capacity(),
            AnyPool::PerThread(arena) => arena.capacity(),
        }
    }

    fn used(&self) -> usize {
        match self {
            AnyPool::SingleThreaded(arena) => arena.used(),
            AnyPool::ThreadSafe(arena) => arena.used(),
            AnyPool::PerThread(arena) => arena.used(),
        }
    }

    fn alignment_fragmentation(&self) -> usize {
        match self {
            AnyPool::SingleThreaded(arena) => arena.alignment_fragmentation(),
            AnyPool::ThreadSafe(arena) => arena.alignment_fragmentation(),
            AnyPool::PerThread(arena) => arena.alignment_fragmentation(),
        }
    }

    fn identity(&self) -> usize {
        match self {
            AnyPool::SingleThreaded(arena) => arena.identity(),
            AnyPool::ThreadSafe(arena) => arena.identity(),
            AnyPool::PerThread(arena) => arena.identity(),
        }
    }
}
