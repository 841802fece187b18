//! Error taxonomy for the arena pool.
//!
//! Plain enum with a hand-written `Display`/`std::error::Error` impl, in the
//! same style as the VM-failure error type this crate's allocation core is
//! grounded on, rather than a derive-macro crate.

use std::fmt;

/// Errors the pool's public surface can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The request would exceed the pool's total capacity.
    OutOfCapacity {
        /// Bytes requested by the failing call.
        requested: usize,
        /// Bytes free in the pool at the time of the request.
        remaining: usize,
    },
    /// The factory was asked to create a pool with a non-positive capacity.
    InvalidCapacity {
        /// The capacity that was rejected.
        requested: usize,
    },
    /// The initial virtual-address reservation failed.
    VmReserveFailed,
    /// A commit of additional physical pages failed.
    VmCommitFailed,
    /// Releasing the reservation back to the OS failed.
    VmReleaseFailed,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::OutOfCapacity {
                requested,
                remaining,
            } => write!(
                f,
                "out of capacity: {requested} bytes requested, but pool only has {remaining} bytes free"
            ),
            PoolError::InvalidCapacity { requested } => write!(
                f,
                "invalid capacity: {requested} bytes requested, capacity must be strictly positive"
            ),
            PoolError::VmReserveFailed => write!(f, "failed to reserve virtual address space"),
            PoolError::VmCommitFailed => write!(f, "failed to commit physical pages"),
            PoolError::VmReleaseFailed => write!(f, "failed to release virtual address reservation"),
        }
    }
}

impl std::error::Error for PoolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_capacity_message_names_both_quantities() {
        let err = PoolError::OutOfCapacity {
            requested: 100,
            remaining: 42,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn invalid_capacity_message_names_requested() {
        let err = PoolError::InvalidCapacity { requested: 0 };
        assert!(err.to_string().contains('0'));
    }
}
