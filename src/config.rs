//! Tunable constants for the arena pool.
//!
//! These are the knobs the factory and the bump arena read at construction
//! time. There is no file- or environment-variable-based configuration —
//! this is a library, not a service — so this module is the entire
//! configuration surface.

/// Floor for `commit_ahead_bytes`: commits below this granularity are
/// dominated by syscall overhead rather than by the memory actually touched.
pub const MIN_COMMIT_AHEAD_BYTES: usize = 1024 * 1024;

/// Fallback page size used only if the platform's page-size query ever
/// returns zero (defensive; every supported OS reports a real value).
pub const FALLBACK_PAGE_SIZE: usize = 4096;

/// Round `value` up to the next multiple of `granularity`.
///
/// `granularity` must be a power of two (true for both page sizes and
/// `commit_ahead_bytes`, which is derived from one).
#[inline]
pub const fn round_up_pow2(value: usize, granularity: usize) -> usize {
    debug_assert!(granularity.is_power_of_two());
    (value + granularity - 1) & !(granularity - 1)
}

/// Compute `commit_ahead_bytes` for a given page size: `max(page_size, 1 MiB)`
/// rounded up to a power of two.
#[inline]
pub fn commit_ahead_bytes(page_size: usize) -> usize {
    page_size.max(MIN_COMMIT_AHEAD_BYTES).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_exact_multiple_is_unchanged() {
        assert_eq!(round_up_pow2(4096, 4096), 4096);
    }

    #[test]
    fn round_up_rounds_to_next_granularity() {
        assert_eq!(round_up_pow2(1, 4096), 4096);
        assert_eq!(round_up_pow2(4097, 4096), 8192);
    }

    #[test]
    fn commit_ahead_respects_floor_and_pow2() {
        assert_eq!(commit_ahead_bytes(4096), MIN_COMMIT_AHEAD_BYTES);
        // A hypothetical 2 MiB page size should win over the 1 MiB floor.
        assert_eq!(commit_ahead_bytes(2 * 1024 * 1024), 2 * 1024 * 1024);
    }
}
