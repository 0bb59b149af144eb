//! # Allocator & Memory Accounting
//!
//! A scoped dynamic allocator that charges every allocation to an owner [`Tag`] and
//! tracks live bytes per tag. This module does not itself manage physical memory for
//! the default pool — it accounts allocations made through the platform's global
//! allocator (`alloc::alloc`) — but it can also own dedicated memory regions
//! (`region_register`) for pools that must not compete with the default heap, for
//! example external SDRAM.
//!
//! An owned, instantiable struct rather than a module-level `static`: callers
//! construct one as part of assembling a kernel context (see the crate-level docs)
//! rather than reaching for a singleton, which is what lets every test in this crate
//! run against its own isolated instance.

extern crate alloc;

use alloc::alloc::{alloc_zeroed, dealloc};
use alloc::collections::BTreeMap;
use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use crate::error::{Error, Result};
use crate::err;

const TARGET: &str = "mem";

/// Owner class an allocation is charged to. The `id` is stable for the life of its
/// owner (a module, filesystem, network stack, or program instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    Kernel,
    Module(u32),
    Filesystem(u32),
    Network(u32),
    Program(u32),
}

/// An owned allocation. Opaque to callers: the pointer is never exposed, only moved
/// back into [`MemoryAllocator::free`] or [`MemoryAllocator::reallocate`].
#[derive(Debug)]
pub struct AllocHandle {
    ptr: NonNull<u8>,
    layout: Layout,
    tag: Tag,
    region: Option<&'static str>,
}

// SAFETY: the handle owns its allocation exclusively until freed; it carries no
// interior mutability of its own.
unsafe impl Send for AllocHandle {}

impl AllocHandle {
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Read-only view of the allocated bytes.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// Mutable view of the allocated bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

fn scalar_layout(size: usize) -> Layout {
    // Zero-size allocations are legal (read/write of n=0 is a defined boundary case
    // elsewhere in the crate); round up to 1 byte so the layout is always valid.
    Layout::from_size_align(size.max(1), core::mem::align_of::<u128>())
        .expect("size overflow computing allocation layout")
}

pub struct MemoryAllocator {
    usage: Mutex<BTreeMap<Tag, usize>>,
    regions: Mutex<BTreeMap<&'static str, slab_allocator_rs::LockedHeap>>,
    leaked_bytes: AtomicUsize,
}

impl MemoryAllocator {
    pub const fn new() -> Self {
        MemoryAllocator {
            usage: Mutex::new(BTreeMap::new()),
            regions: Mutex::new(BTreeMap::new()),
            leaked_bytes: AtomicUsize::new(0),
        }
    }

    /// Declare an extra memory region that can subsequently back allocations routed
    /// to it by name via [`MemoryAllocator::allocate_in`].
    ///
    /// # Safety
    /// `base..base+size` must be a valid, exclusively-owned, `'static` memory range
    /// that nothing else will read or write for the life of the allocator.
    pub unsafe fn region_register(&self, name: &'static str, base: usize, size: usize) {
        let heap = unsafe { slab_allocator_rs::LockedHeap::new(base, size) };
        self.regions.lock().insert(name, heap);
        crate::log_info!(TARGET, "registered memory region '{}' ({} bytes)", name, size);
    }

    pub fn allocate(&self, tag: Tag, size: usize) -> Result<AllocHandle> {
        let layout = scalar_layout(size);
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| err!(OutOfMemory, TARGET))?;
        self.charge(tag, layout.size());
        Ok(AllocHandle { ptr, layout, tag, region: None })
    }

    pub fn allocate_in(&self, region: &'static str, tag: Tag, size: usize) -> Result<AllocHandle> {
        let layout = scalar_layout(size);
        let mut regions = self.regions.lock();
        let heap = regions.get_mut(region).ok_or_else(|| err!(NotFound, TARGET, "no such region"))?;
        let raw = unsafe { heap.alloc(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| err!(OutOfMemory, TARGET))?;
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, layout.size()) };
        drop(regions);
        self.charge(tag, layout.size());
        Ok(AllocHandle { ptr, layout, tag, region: Some(region) })
    }

    /// Resize in place or move; preserves the lesser of old and new byte counts.
    ///
    /// `handle` is left untouched if the new allocation fails, so a transient
    /// `OutOfMemory` never costs the caller their existing allocation.
    pub fn reallocate(&self, tag: Tag, handle: &mut AllocHandle, new_size: usize) -> Result<()> {
        if handle.tag != tag {
            return Err(err!(PermissionDenied, TARGET, "tag does not own this allocation"));
        }
        let old_len = handle.layout.size();
        let region = handle.region;
        let mut new_handle = match region {
            None => self.allocate(tag, new_size)?,
            Some(name) => self.allocate_in(name, tag, new_size)?,
        };
        let copy_len = old_len.min(new_size);
        new_handle.as_mut_slice()[..copy_len].copy_from_slice(&handle.as_slice()[..copy_len]);
        let old = core::mem::replace(handle, new_handle);
        self.free(tag, old)?;
        Ok(())
    }

    /// Release `handle`. `tag` must match the tag recorded at allocation time.
    ///
    /// In debug builds a mismatch fails the call outright (`PermissionDenied`) and
    /// leaves the allocation intact; in release builds it is treated as a silent
    /// leak tracked by [`MemoryAllocator::leaked_bytes`] so a misbehaving caller in
    /// the field cannot be tricked into freeing another owner's memory.
    pub fn free(&self, tag: Tag, handle: AllocHandle) -> Result<()> {
        self.free_inner(tag, handle, cfg!(debug_assertions))
    }

    fn free_inner(&self, tag: Tag, handle: AllocHandle, strict: bool) -> Result<()> {
        if handle.tag != tag {
            if strict {
                return Err(err!(PermissionDenied, TARGET, "tag does not own this allocation"));
            }
            self.leaked_bytes.fetch_add(handle.layout.size(), Ordering::Relaxed);
            crate::log_warn!(TARGET, "leaked {} bytes freed under the wrong tag", handle.layout.size());
            core::mem::forget(handle);
            return Ok(());
        }
        match handle.region {
            None => unsafe { dealloc(handle.ptr.as_ptr(), handle.layout) },
            Some(name) => {
                let mut regions = self.regions.lock();
                if let Some(heap) = regions.get_mut(name) {
                    unsafe { heap.dealloc(handle.ptr.as_ptr(), handle.layout) };
                }
            }
        }
        self.uncharge(tag, handle.layout.size());
        core::mem::forget(handle);
        Ok(())
    }

    pub fn usage(&self, tag: Tag) -> usize {
        self.usage.lock().get(&tag).copied().unwrap_or(0)
    }

    /// Sum of per-tag counters; equals total live heap bytes charged through this
    /// allocator (invariant §8.4).
    pub fn total_usage(&self) -> usize {
        self.usage.lock().values().sum()
    }

    pub fn leaked_bytes(&self) -> usize {
        self.leaked_bytes.load(Ordering::Relaxed)
    }

    fn charge(&self, tag: Tag, bytes: usize) {
        *self.usage.lock().entry(tag).or_insert(0) += bytes;
        crate::log_trace!(TARGET, "charged {} bytes to {:?}", bytes, tag);
    }

    fn uncharge(&self, tag: Tag, bytes: usize) {
        if let Some(count) = self.usage.lock().get_mut(&tag) {
            *count -= bytes;
        }
        crate::log_trace!(TARGET, "released {} bytes from {:?}", bytes, tag);
    }

    /// Test-only hook exercising the release-mode "silent leak" path without needing
    /// an actual release build.
    #[cfg(test)]
    pub fn free_lenient(&self, tag: Tag, handle: AllocHandle) -> Result<()> {
        self.free_inner(tag, handle, false)
    }
}

impl Default for MemoryAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocHandle {
    fn drop(&mut self) {
        // A handle dropped without going through `free`/`free_lenient` is a bug in
        // the owner, not in the allocator: the bytes are genuinely unrecoverable
        // without a back-reference to the allocator that produced them. Surface it
        // loudly rather than silently double-accounting.
        crate::log_error!(TARGET, "allocation of {} bytes under {:?} dropped without being freed", self.layout.size(), self.tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_zeroed_and_charged() {
        let a = MemoryAllocator::new();
        let h = a.allocate(Tag::Module(7), 1024).unwrap();
        assert!(h.as_slice().iter().all(|&b| b == 0));
        assert_eq!(a.usage(Tag::Module(7)), 1024);
        assert_eq!(a.usage(Tag::Module(8)), 0);
        a.free(Tag::Module(7), h).unwrap();
        assert_eq!(a.usage(Tag::Module(7)), 0);
    }

    #[test]
    fn free_with_wrong_tag_fails_in_debug_and_keeps_usage() {
        let a = MemoryAllocator::new();
        let h = a.allocate(Tag::Module(1), 16).unwrap();
        let err = a.free(Tag::Module(2), h).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PermissionDenied);
        assert_eq!(a.usage(Tag::Module(1)), 16);
    }

    #[test]
    fn free_with_wrong_tag_is_a_silent_leak_in_lenient_mode() {
        let a = MemoryAllocator::new();
        let h = a.allocate(Tag::Module(1), 16).unwrap();
        a.free_lenient(Tag::Module(2), h).unwrap();
        // The allocation is neither released nor attributed to either tag; it is
        // tracked purely as a leak diagnostic.
        assert_eq!(a.usage(Tag::Module(1)), 16);
        assert_eq!(a.leaked_bytes(), 16);
    }

    #[test]
    fn reallocate_preserves_lesser_of_old_and_new_bytes() {
        let a = MemoryAllocator::new();
        let mut h = a.allocate(Tag::Kernel, 4).unwrap();
        h.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);

        a.reallocate(Tag::Kernel, &mut h, 8).unwrap();
        assert_eq!(&h.as_slice()[..4], &[1, 2, 3, 4]);
        assert_eq!(a.usage(Tag::Kernel), 8);

        a.reallocate(Tag::Kernel, &mut h, 2).unwrap();
        assert_eq!(&h.as_slice()[..2], &[1, 2]);
        assert_eq!(a.usage(Tag::Kernel), 2);
        a.free(Tag::Kernel, h).unwrap();
    }

    #[test]
    fn reallocate_with_wrong_tag_leaves_handle_untouched() {
        let a = MemoryAllocator::new();
        let mut h = a.allocate(Tag::Kernel, 4).unwrap();
        let err = a.reallocate(Tag::Module(1), &mut h, 8).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PermissionDenied);
        assert_eq!(h.size(), 4);
        a.free(Tag::Kernel, h).unwrap();
    }

    #[test]
    fn region_register_backs_tagged_allocations() {
        let a = MemoryAllocator::new();
        let mut buf = alloc::vec![0u8; 4096].into_boxed_slice();
        let base = buf.as_mut_ptr() as usize;
        let leaked: &'static mut [u8] = alloc::boxed::Box::leak(buf);
        unsafe { a.region_register("sdram", base, leaked.len()) };

        let h = a.allocate_in("sdram", Tag::Filesystem(3), 128).unwrap();
        assert_eq!(a.usage(Tag::Filesystem(3)), 128);
        a.free(Tag::Filesystem(3), h).unwrap();
        assert_eq!(a.usage(Tag::Filesystem(3)), 0);
    }

    #[test]
    fn allocate_in_unknown_region_is_not_found() {
        let a = MemoryAllocator::new();
        let err = a.allocate_in("nope", Tag::Kernel, 16).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn zero_size_allocation_succeeds() {
        let a = MemoryAllocator::new();
        let h = a.allocate(Tag::Kernel, 0).unwrap();
        assert_eq!(h.as_slice().len(), 0);
        a.free(Tag::Kernel, h).unwrap();
    }
}
