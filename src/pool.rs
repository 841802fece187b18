//! The abstract pool contract shared by every arena variant.

use std::ptr::NonNull;

use crate::error::PoolError;

/// A bump-allocating memory pool.
///
/// Implemented by [`crate::single::BumpArena`], [`crate::locked::LockedArena`],
/// [`crate::per_thread::PerThreadArena`], and the dispatching
/// [`crate::factory::AnyPool`]. There is no deallocation method: individual
/// objects are never freed, only the pool as a whole, by dropping it.
pub trait Pool {
    /// Allocate `size` bytes aligned to `alignment` (which need not be a
    /// power of two). Fails with [`PoolError::OutOfCapacity`] if the request
    /// cannot fit, or [`PoolError::VmCommitFailed`] if committing more
    /// physical pages was necessary and failed.
    fn allocate_aligned(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, PoolError>;

    /// Allocate `size` bytes with no alignment requirement (alignment 1).
    fn allocate(&self, size: usize) -> Result<NonNull<u8>, PoolError> {
        self.allocate_aligned(size, 1)
    }

    /// The pool's total capacity in bytes. Never changes.
    fn capacity(&self) -> usize;

    /// Bytes currently handed out, including alignment-skip bytes.
    fn used(&self) -> usize;

    /// Cumulative bytes wasted to alignment skips across all allocations.
    fn alignment_fragmentation(&self) -> usize;

    /// A value unique to this pool instance, used for identity equality.
    /// Two different pools never return the same value; the same pool
    /// always returns the same value for its entire lifetime.
    fn identity(&self) -> usize;
}
