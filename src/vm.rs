//! Platform-specific virtual memory backend.
//!
//! This module is the pool's only point of contact with the operating
//! system. It exposes five operations — reserve, commit, release, page
//! size, and containing-page — and nothing else. Every arena variant is
//! built entirely on top of these.
//!
//! - **Linux**: `mmap`/`mprotect`/`munmap` via `rustix`.
//! - **macOS**: `mach_vm_allocate`/`mach_vm_protect`/`mach_vm_deallocate` via
//!   `mach2`.
//! - **Other Unix**: `mmap`/`mprotect`/`munmap` via `libc`.
//! - **Windows**: `VirtualAlloc`/`VirtualFree` via `windows-sys`.

use std::ptr::NonNull;

use crate::error::PoolError;

/// Reserve `size` bytes of page-aligned virtual address space.
///
/// The returned range has no physical backing and no access rights —
/// touching it before a [`commit`] call is undefined behavior.
pub fn reserve(size: usize) -> Result<NonNull<u8>, PoolError> {
    debug_assert!(size > 0);
    match sys::reserve(size) {
        Ok(ptr) => Ok(ptr),
        Err(()) => {
            log::error!("vm: failed to reserve {size} bytes of address space");
            Err(PoolError::VmReserveFailed)
        }
    }
}

/// Commit `[base, base + size)`, making it readable and writable.
///
/// `base` and `size` must both be page-aligned. Idempotent: committing an
/// already-committed range is not an error.
pub fn commit(base: NonNull<u8>, size: usize) -> Result<(), PoolError> {
    debug_assert_eq!(base.as_ptr() as usize % page_size(), 0);
    debug_assert_eq!(size % page_size(), 0);
    if size == 0 {
        return Ok(());
    }
    match sys::commit(base, size) {
        Ok(()) => Ok(()),
        Err(()) => {
            log::error!("vm: failed to commit {size} bytes at {base:p}");
            Err(PoolError::VmCommitFailed)
        }
    }
}

/// Release an entire reservation (and any commits within it) back to the OS.
pub fn release(base: NonNull<u8>, size: usize) -> Result<(), PoolError> {
    match sys::release(base, size) {
        Ok(()) => Ok(()),
        Err(()) => {
            log::error!("vm: failed to release {size} bytes at {base:p}");
            Err(PoolError::VmReleaseFailed)
        }
    }
}

/// The system page size, in bytes. Always a power of two.
///
/// Falls back to [`crate::config::FALLBACK_PAGE_SIZE`] on the (never
/// observed in practice, but defensively handled) case that the platform
/// query reports zero.
#[inline]
pub fn page_size() -> usize {
    let reported = sys::page_size();
    if reported == 0 {
        log::warn!(
            "vm: platform page size query returned 0, falling back to {} bytes",
            crate::config::FALLBACK_PAGE_SIZE
        );
        crate::config::FALLBACK_PAGE_SIZE
    } else {
        reported
    }
}

/// Round `pointer` down to the start of its containing page.
#[inline]
pub fn containing_page(pointer: usize) -> usize {
    let mask = !(page_size() - 1);
    pointer & mask
}

#[cfg(target_os = "linux")]
mod sys {
    use rustix::mm::{mmap_anonymous, mprotect, munmap, MapFlags, MprotectFlags, ProtFlags};
    use std::ffi::c_void;
    use std::ptr::{self, NonNull};

    pub(super) fn reserve(size: usize) -> Result<NonNull<u8>, ()> {
        unsafe {
            mmap_anonymous(
                ptr::null_mut(),
                size,
                ProtFlags::empty(),
                MapFlags::PRIVATE | MapFlags::NORESERVE,
            )
        }
        .map(|p| unsafe { NonNull::new_unchecked(p as *mut u8) })
        .map_err(|_| ())
    }

    pub(super) fn commit(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        unsafe {
            mprotect(
                base.as_ptr() as *mut c_void,
                size,
                MprotectFlags::READ | MprotectFlags::WRITE,
            )
        }
        .map_err(|_| ())
    }

    pub(super) fn release(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        unsafe { munmap(base.as_ptr() as *mut c_void, size) }.map_err(|_| ())
    }

    pub(super) fn page_size() -> usize {
        rustix::param::page_size()
    }
}

#[cfg(target_vendor = "apple")]
mod sys {
    use mach2::kern_return::KERN_SUCCESS;
    use mach2::traps::mach_task_self;
    use mach2::vm::{mach_vm_allocate, mach_vm_deallocate, mach_vm_protect};
    use mach2::vm_prot::{VM_PROT_NONE, VM_PROT_READ, VM_PROT_WRITE};
    use mach2::vm_statistics::VM_FLAGS_ANYWHERE;
    use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t};
    use std::ptr::NonNull;

    pub(super) fn reserve(size: usize) -> Result<NonNull<u8>, ()> {
        let task = unsafe { mach_task_self() };
        let mut address: mach_vm_address_t = 0;
        let vm_size = size as mach_vm_size_t;

        let ret = unsafe { mach_vm_allocate(task, &mut address, vm_size, VM_FLAGS_ANYWHERE) };
        if ret != KERN_SUCCESS {
            return Err(());
        }

        // `mach_vm_allocate` hands back read/write memory; downgrade to no
        // access until a matching `commit` call upgrades it again.
        let ret = unsafe { mach_vm_protect(task, address, vm_size, 0, VM_PROT_NONE) };
        if ret != KERN_SUCCESS {
            unsafe {
                let _ = mach_vm_deallocate(task, address, vm_size);
            }
            return Err(());
        }

        NonNull::new(address as *mut u8).ok_or(())
    }

    pub(super) fn commit(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        let task = unsafe { mach_task_self() };
        let ret = unsafe {
            mach_vm_protect(
                task,
                base.as_ptr() as mach_vm_address_t,
                size as mach_vm_size_t,
                0,
                VM_PROT_READ | VM_PROT_WRITE,
            )
        };
        if ret == KERN_SUCCESS {
            Ok(())
        } else {
            Err(())
        }
    }

    pub(super) fn release(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        let task = unsafe { mach_task_self() };
        let ret = unsafe {
            mach_vm_deallocate(task, base.as_ptr() as mach_vm_address_t, size as mach_vm_size_t)
        };
        if ret == KERN_SUCCESS {
            Ok(())
        } else {
            Err(())
        }
    }

    pub(super) fn page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }
}

#[cfg(all(unix, not(target_os = "linux"), not(target_vendor = "apple")))]
mod sys {
    use libc::{
        mmap, mprotect, munmap, MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ,
        PROT_WRITE,
    };
    use std::ffi::c_void;
    use std::ptr::{self, NonNull};

    pub(super) fn reserve(size: usize) -> Result<NonNull<u8>, ()> {
        let ptr = unsafe {
            mmap(
                ptr::null_mut(),
                size,
                PROT_NONE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            )
        };
        if ptr == MAP_FAILED {
            Err(())
        } else {
            NonNull::new(ptr as *mut u8).ok_or(())
        }
    }

    pub(super) fn commit(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        let rc = unsafe {
            mprotect(
                base.as_ptr() as *mut c_void,
                size,
                PROT_READ | PROT_WRITE,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(())
        }
    }

    pub(super) fn release(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        let rc = unsafe { munmap(base.as_ptr() as *mut c_void, size) };
        if rc == 0 {
            Ok(())
        } else {
            Err(())
        }
    }

    pub(super) fn page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }
}

#[cfg(windows)]
mod sys {
    use std::ptr::NonNull;
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS,
        PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::GetSystemInfo;

    pub(super) fn reserve(size: usize) -> Result<NonNull<u8>, ()> {
        let ptr = unsafe {
            VirtualAlloc(std::ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS)
        };
        NonNull::new(ptr as *mut u8).ok_or(())
    }

    pub(super) fn commit(base: NonNull<u8>, size: usize) -> Result<(), ()> {
        let ptr = unsafe {
            VirtualAlloc(
                base.as_ptr() as *const _,
                size,
                MEM_COMMIT,
                PAGE_READWRITE,
            )
        };
        if ptr.is_null() {
            Err(())
        } else {
            Ok(())
        }
    }

    pub(super) fn release(base: NonNull<u8>, _size: usize) -> Result<(), ()> {
        // `VirtualFree` with MEM_RELEASE requires size 0 and frees the
        // entire reservation that `VirtualAlloc` originally returned.
        let ok = unsafe { VirtualFree(base.as_ptr() as *mut _, 0, MEM_RELEASE) };
        if ok != 0 {
            Ok(())
        } else {
            Err(())
        }
    }

    pub(super) fn page_size() -> usize {
        unsafe {
            let mut info = std::mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwPageSize as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two_and_nonzero() {
        let ps = page_size();
        assert!(ps > 0);
        assert!(ps.is_power_of_two());
    }

    #[test]
    fn containing_page_rounds_down() {
        let ps = page_size();
        assert_eq!(containing_page(0), 0);
        assert_eq!(containing_page(ps), ps);
        assert_eq!(containing_page(ps + 1), ps);
        assert_eq!(containing_page(2 * ps - 1), ps);
    }

    #[test]
    fn reserve_commit_release_round_trip() {
        let ps = page_size();
        let size = ps * 4;
        let base = reserve(size).expect("reserve");
        commit(base, ps).expect("commit");
        unsafe {
            base.as_ptr().write(0x42);
            assert_eq!(base.as_ptr().read(), 0x42);
        }
        release(base, size).expect("release");
    }
}
