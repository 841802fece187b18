use std::sync::Arc;
use std::thread;

use allocator_api2::vec::Vec as PoolVec;
use bump_pool::{AnyPool, BumpArena, LockedArena, PerThreadArena, Pool, PoolAllocator, PoolConfig, PoolKind};

#[test]
fn use_at_once_small_allocation() {
    let pool = BumpArena::new(4096).unwrap();
    let ptr = pool.allocate(4096).unwrap();
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0x11, 4096) };
    assert_eq!(pool.used(), pool.capacity());
}

#[test]
fn use_at_once_large_allocation_spans_many_pages() {
    let size = 32 * 1024 * 1024;
    let pool = BumpArena::new(size).unwrap();
    let ptr = pool.allocate(size).unwrap();
    unsafe {
        std::ptr::write_bytes(ptr.as_ptr(), 0x22, size);
        assert_eq!(ptr.as_ptr().add(size - 1).read(), 0x22);
    }
}

#[test]
fn chunked_fill_consumes_exact_capacity() {
    let pool = BumpArena::new(1 << 16).unwrap();
    let mut total = 0usize;
    while let Ok(ptr) = pool.allocate_aligned(128, 16) {
        unsafe { ptr.as_ptr().write(0) };
        total += 128;
    }
    assert_eq!(total, pool.used());
    assert!(pool.capacity() - pool.used() < 128);
}

#[test]
fn exhaustion_then_smaller_allocation_still_succeeds() {
    let pool = BumpArena::new(1024).unwrap();
    pool.allocate(1000).unwrap();
    assert!(pool.allocate(1000).is_err());
    pool.allocate(24).unwrap();
    assert_eq!(pool.used(), 1024);
    assert!(pool.allocate(1).is_err());
}

#[test]
fn alignment_perturbation_never_misaligns_a_pointer() {
    let pool = BumpArena::new(1 << 12).unwrap();
    for alignment in [1usize, 2, 4, 8, 16, 32, 64, 128] {
        let ptr = pool.allocate_aligned(7, alignment).unwrap();
        assert_eq!(ptr.as_ptr() as usize % alignment, 0);
    }
}

#[test]
fn per_thread_pool_keeps_threads_isolated() {
    let pool = Arc::new(PerThreadArena::new(4096).unwrap());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            pool.allocate(1024).unwrap();
            pool.used()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1024);
    }
    // The joining (main) thread never allocated, so its own private arena
    // is still untouched.
    assert_eq!(pool.used(), 0);
}

#[test]
fn locked_pool_serializes_concurrent_allocators() {
    let pool = Arc::new(LockedArena::new(1 << 20).unwrap());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            let mut ptrs = Vec::new();
            for _ in 0..200 {
                ptrs.push(pool.allocate_aligned(32, 8).unwrap().as_ptr() as usize);
            }
            ptrs
        }));
    }
    let mut all: Vec<usize> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    all.sort_unstable();
    let count = all.len();
    all.dedup();
    assert_eq!(all.len(), count);
    assert_eq!(pool.used(), 8 * 200 * 32);
}

#[test]
fn factory_dispatches_to_the_requested_kind() {
    let single = AnyPool::create_with_config(
        PoolConfig::new(1024).with_kind(PoolKind::SingleThreaded),
    )
    .unwrap();
    assert!(matches!(single, AnyPool::SingleThreaded(_)));

    let locked =
        AnyPool::create_with_config(PoolConfig::new(1024).with_kind(PoolKind::ThreadSafe)).unwrap();
    assert!(matches!(locked, AnyPool::ThreadSafe(_)));

    let per_thread =
        AnyPool::create_with_config(PoolConfig::new(1024).with_kind(PoolKind::PerThread)).unwrap();
    assert!(matches!(per_thread, AnyPool::PerThread(_)));
}

#[test]
fn generic_container_backed_by_an_arena() {
    let pool = BumpArena::new(1 << 20).unwrap();
    let allocator = unsafe { PoolAllocator::<u64>::new(&pool) };
    let mut values: PoolVec<u64, _> = PoolVec::new_in(allocator);
    for i in 0..10_000u64 {
        values.push(i * i);
    }
    assert_eq!(values.len(), 10_000);
    assert_eq!(values[9999], 9999 * 9999);
    assert!(pool.used() >= 10_000 * std::mem::size_of::<u64>());
}

#[test]
fn zero_capacity_is_rejected_at_the_factory() {
    assert!(AnyPool::create(0).is_err());
}

#[test]
fn exhaustion_emits_a_warn_log_record() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pool = BumpArena::new(64).unwrap();
    pool.allocate(64).unwrap();
    // Exhausted; the pool logs a `log::warn!` record on this call (see
    // `BumpArena::allocate_aligned`'s step-1 precheck) before returning
    // `PoolError::OutOfCapacity`. Run with `RUST_LOG=warn` to observe it.
    assert!(pool.allocate(1).is_err());
}
