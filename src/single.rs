//! The core bump arena: a single reservation with two cursors dividing it
//! into used, committed-unused, and reserved-uncommitted regions.
//!
//! ```text
//! low address  ---uuuuuuuuuuuuuuuuuuuuuuccccccccccccccccccccccrrrrrrrrrrrrrrrrr---  high address
//!                  ^                     ^                     ^
//!                  buffer          first_committed_unused  first_uncommitted
//! u = in use, c = committed (not in use), r = reserved (not committed)
//! ```
//!
//! `BumpArena` is deliberately not `Sync`: its cursors live in [`Cell`],
//! which makes sharing a `&BumpArena` across threads a compile error rather
//! than a documented footgun. Callers who want concurrent access reach for
//! [`crate::locked::LockedArena`] or [`crate::per_thread::PerThreadArena`]
//! instead, both of which hold a `BumpArena` by value.

use std::cell::Cell;
use std::ptr::NonNull;

use crate::config;
use crate::error::PoolError;
use crate::pool::Pool;
use crate::vm;

/// A single, unsynchronized bump-allocating arena.
pub struct BumpArena {
    total_capacity: usize,
    /// `buffer + total_capacity` rounded up to the next page boundary: the
    /// true end of what the OS actually reserved, since `vm::reserve` gets
    /// page-rounded under the hood even when `total_capacity` isn't a
    /// multiple of the page size. Commits are clipped against this, never
    /// against `buffer_end()`, so `first_uncommitted` stays page-aligned.
    reserved_end: usize,
    commit_ahead_bytes: usize,
    buffer: NonNull<u8>,
    first_committed_unused: Cell<usize>,
    first_uncommitted: Cell<usize>,
    bytes_in_use: Cell<usize>,
    alignment_fragmentation: Cell<usize>,
}

// `Cell<usize>` is `Send`, and `NonNull<u8>`/`usize` are trivially `Send`
// once we assert exclusive ownership of the reservation; `BumpArena` is
// intentionally *not* `Sync` (the default, since `Cell` isn't `Sync`), which
// is what lets a caller move one into another thread (for `PerThreadArena`)
// but never share a `&BumpArena` across threads.
unsafe impl Send for BumpArena {}

impl BumpArena {
    /// Reserve `capacity` bytes of address space and commit the initial
    /// `min(capacity, commit_ahead_bytes)` of it.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        debug_assert!(capacity > 0);

        let buffer = vm::reserve(capacity)?;
        let page_size = vm::page_size();
        let commit_ahead_bytes = config::commit_ahead_bytes(page_size);
        let reserved_end = buffer.as_ptr() as usize + config::round_up_pow2(capacity, page_size);

        // The initial commit must itself be page-aligned; round up so we
        // never ask the VM layer to commit a fractional page. Rounding up
        // `min(capacity, commit_ahead_bytes)` can never exceed `reserved_end`,
        // since that's exactly `round_up_pow2(capacity, page_size)` and
        // round-up is monotonic in its first argument.
        let initial_commit =
            config::round_up_pow2(capacity.min(commit_ahead_bytes), page_size);

        if initial_commit > 0 {
            vm::commit(buffer, initial_commit)?;
        }

        Ok(Self {
            total_capacity: capacity,
            reserved_end,
            commit_ahead_bytes,
            buffer,
            first_committed_unused: Cell::new(buffer.as_ptr() as usize),
            first_uncommitted: Cell::new(buffer.as_ptr() as usize + initial_commit),
            bytes_in_use: Cell::new(0),
            alignment_fragmentation: Cell::new(0),
        })
    }

    #[inline]
    fn buffer_end(&self) -> usize {
        self.buffer.as_ptr() as usize + self.total_capacity
    }

    /// The core allocation algorithm (see SPEC_FULL.md §4.1).
    pub fn allocate_aligned(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, PoolError> {
        debug_assert!(alignment >= 1);

        // Step 1: cheap capacity pre-check, ignoring alignment skip.
        let bytes_in_use = self.bytes_in_use.get();
        if self.total_capacity - bytes_in_use < size {
            log::warn!(
                "arena exhausted: requested {size} bytes, {} bytes free",
                self.total_capacity - bytes_in_use
            );
            return Err(PoolError::OutOfCapacity {
                requested: size,
                remaining: self.total_capacity - bytes_in_use,
            });
        }

        let first_committed_unused = self.first_committed_unused.get();

        // Step 2: alignment skip.
        let skip = if alignment.is_power_of_two() {
            (alignment - (first_committed_unused & (alignment - 1))) & (alignment - 1)
        } else {
            (alignment - (first_committed_unused % alignment)) % alignment
        };

        // Step 3: commit-ahead target.
        let to_commit_ahead = config::round_up_pow2(
            skip.saturating_add(2 * size),
            self.commit_ahead_bytes,
        );

        // Step 4: commit more physical pages if the lookahead would run
        // past what's already committed.
        let first_uncommitted = self.first_uncommitted.get();
        if first_committed_unused + to_commit_ahead > first_uncommitted {
            let to_commit = if first_uncommitted + to_commit_ahead > self.reserved_end {
                self.reserved_end - first_uncommitted
            } else {
                to_commit_ahead
            };

            if to_commit > 0 {
                // SAFETY: `first_uncommitted` is page-aligned by invariant,
                // and `to_commit` is derived to keep the new uncommitted
                // boundary within the reservation.
                let commit_base = unsafe {
                    NonNull::new_unchecked(first_uncommitted as *mut u8)
                };
                vm::commit(commit_base, to_commit)?;
                self.first_uncommitted.set(first_uncommitted + to_commit);
            }
        }

        // Step 5: final capacity check — alignment skip may have pushed us
        // over even though the cheap step-1 gate passed.
        let new_pointer = first_committed_unused + skip + size;
        if new_pointer > self.buffer_end() {
            log::warn!(
                "arena exhausted by alignment skip: requested {size} bytes at align {alignment}, {} bytes free",
                self.total_capacity - bytes_in_use
            );
            return Err(PoolError::OutOfCapacity {
                requested: size,
                remaining: self.total_capacity - bytes_in_use,
            });
        }

        // Step 6: bookkeeping.
        self.first_committed_unused.set(new_pointer);
        self.bytes_in_use.set(bytes_in_use + skip + size);
        self.alignment_fragmentation
            .set(self.alignment_fragmentation.get() + skip);

        // Step 7: post-condition asserts.
        debug_assert!(
            self.bytes_in_use.get() != self.total_capacity
                || self.first_committed_unused.get() == self.buffer_end()
        );
        debug_assert!(self.first_committed_unused.get() <= self.first_uncommitted.get());
        debug_assert!(self.first_uncommitted.get() <= self.reserved_end);

        // SAFETY: `first_committed_unused + skip` is within
        // `[buffer, buffer + total_capacity)`, checked above.
        Ok(unsafe { NonNull::new_unchecked((first_committed_unused + skip) as *mut u8) })
    }
}

impl Pool for BumpArena {
    fn allocate_aligned(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, PoolError> {
        BumpArena::allocate_aligned(self, size, alignment)
    }

    fn capacity(&self) -> usize {
        self.total_capacity
    }

    fn used(&self) -> usize {
        self.bytes_in_use.get()
    }

    fn alignment_fragmentation(&self) -> usize {
        self.alignment_fragmentation.get()
    }

    fn identity(&self) -> usize {
        self as *const Self as usize
    }
}

impl Drop for BumpArena {
    fn drop(&mut self) {
        let reserved_size = self.reserved_end - self.buffer.as_ptr() as usize;
        if let Err(err) = vm::release(self.buffer, reserved_size) {
            log::error!("failed to release arena reservation: {err}");
            std::process::abort();
        }
    }
}
