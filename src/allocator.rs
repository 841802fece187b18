//! Adapts any [`Pool`] into an [`allocator_api2::alloc::Allocator`], so
//! generic containers (`allocator_api2::vec::Vec`, `Box`, etc.) can be
//! backed by an arena instead of the system heap.

use std::alloc::Layout;
use std::marker::PhantomData;
use std::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::error::PoolError;
use crate::pool::Pool;

/// A handle to a borrowed [`Pool`], typed for `T` only to carry alignment
/// and size information through the `Allocator` trait; it allocates raw
/// bytes and has no knowledge of `T`'s value.
///
/// `PoolAllocator` never deallocates: arenas are freed as a whole when the
/// underlying pool is dropped, so [`Allocator::deallocate`] is a no-op.
/// Dropping a container backed by one is therefore cheap but does not
/// reclaim arena space for reuse.
pub struct PoolAllocator<'pool, T> {
    pool: NonNull<dyn Pool + 'pool>,
    _marker: PhantomData<fn() -> T>,
}

impl<'pool, T> PoolAllocator<'pool, T> {
    /// Build an allocator borrowing `pool`.
    ///
    /// # Safety
    ///
    /// The caller must ensure `pool` outlives every value allocated through
    /// this `PoolAllocator` (and any container built from it). There is no
    /// lifetime enforced by the type beyond `'pool` on construction, since
    /// `NonNull` does not itself borrow-check.
    pub unsafe fn new(pool: &'pool dyn Pool) -> Self {
        Self {
            pool: NonNull::from(pool),
            _marker: PhantomData,
        }
    }

    /// Reinterpret this allocator as one for a different element type,
    /// backed by the same pool.
    pub fn rebind<U>(&self) -> PoolAllocator<'pool, U> {
        PoolAllocator {
            pool: self.pool,
            _marker: PhantomData,
        }
    }

    /// Allocate space for a single `T` and move `value` into it, returning
    /// an owning pointer the caller is responsible for dropping in place.
    pub fn emplace(&self, value: T) -> Result<NonNull<T>, PoolError> {
        let layout = Layout::new::<T>();
        let raw = unsafe { self.pool.as_ref() }.allocate_aligned(layout.size(), layout.align())?;
        let typed = raw.cast::<T>();
        unsafe {
            typed.as_ptr().write(value);
        }
        Ok(typed)
    }
}

impl<'pool, T> Clone for PoolAllocator<'pool, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'pool, T> Copy for PoolAllocator<'pool, T> {}

impl<'pool, T> PartialEq for PoolAllocator<'pool, T> {
    fn eq(&self, other: &Self) -> bool {
        unsafe { self.pool.as_ref().identity() == other.pool.as_ref().identity() }
    }
}

impl<'pool, T> Eq for PoolAllocator<'pool, T> {}

// SAFETY: the underlying pool is only ever touched through `&dyn Pool`
// methods, all of which take `&self`; `PoolAllocator` carries no
// unsynchronized mutable state of its own.
unsafe impl<'pool, T> Allocator for PoolAllocator<'pool, T> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let pool = unsafe { self.pool.as_ref() };
        let ptr = pool
            .allocate_aligned(layout.size(), layout.align())
            .map_err(|_| AllocError)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // Arenas never free individual allocations; the whole pool is
        // released together when it is dropped.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::single::BumpArena;
    use allocator_api2::vec::Vec as PoolVec;

    #[test]
    fn emplace_writes_the_value() {
        let arena = BumpArena::new(4096).unwrap();
        let allocator = unsafe { PoolAllocator::<u64>::new(&arena) };
        let ptr = allocator.emplace(42u64).unwrap();
        assert_eq!(unsafe { ptr.as_ptr().read() }, 42);
    }

    #[test]
    fn backs_a_growable_vec() {
        let arena = BumpArena::new(1 << 20).unwrap();
        let allocator = unsafe { PoolAllocator::<u32>::new(&arena) };
        let mut values: PoolVec<u32, _> = PoolVec::new_in(allocator);
        for i in 0..1000u32 {
            values.push(i);
        }
        assert_eq!(values.len(), 1000);
        assert_eq!(values[999], 999);
        assert!(arena.used() > 0);
    }

    #[test]
    fn two_allocators_over_distinct_pools_are_not_equal() {
        let a = BumpArena::new(64).unwrap();
        let b = BumpArena::new(64).unwrap();
        let alloc_a = unsafe { PoolAllocator::<u8>::new(&a) };
        let alloc_b = unsafe { PoolAllocator::<u8>::new(&b) };
        assert_ne!(alloc_a, alloc_b);
        assert_eq!(alloc_a, alloc_a.rebind::<u16>().rebind::<u8>());
    }
}
