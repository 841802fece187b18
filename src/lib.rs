//! bump-pool: a bump-allocating arena memory pool backed by a single
//! contiguous virtual-address reservation with lazy physical page
//! commitment.
//!
//! A pool reserves its full capacity as address space up front but only
//! commits physical pages as allocations actually demand them, doubling
//! the commit-ahead amount (bounded by the reservation) each time the
//! bump cursor catches up to what's committed. Individual allocations are
//! never freed; the whole pool is released at once when it is dropped.
//!
//! Three concurrency variants share one [`Pool`] trait:
//!
//! - [`single::BumpArena`] — unsynchronized, fastest, `Send` but not `Sync`.
//! - [`locked::LockedArena`] — one arena behind a `Mutex`, shared across threads.
//! - [`per_thread::PerThreadArena`] — a private arena per thread that touches it.
//!
//! [`factory::AnyPool`] picks one of the three at runtime from a
//! [`factory::PoolConfig`]. [`allocator::PoolAllocator`] adapts any `Pool`
//! into an `allocator_api2::alloc::Allocator`, so standard generic
//! containers can be backed by an arena.
//!
//! # Example
//!
//! ```rust
//! use bump_pool::{AnyPool, Pool};
//!
//! let pool = AnyPool::create(1 << 20).unwrap();
//! let ptr = pool.allocate_aligned(64, 8).unwrap();
//! assert_eq!(ptr.as_ptr() as usize % 8, 0);
//! assert_eq!(pool.used(), 64);
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod factory;
pub mod locked;
pub mod per_thread;
pub mod pool;
pub mod single;
pub mod vm;

pub use allocator::PoolAllocator;
pub use error::PoolError;
pub use factory::{AnyPool, PoolConfig, PoolKind};
pub use locked::LockedArena;
pub use per_thread::PerThreadArena;
pub use pool::Pool;
pub use single::BumpArena;
