//! # memcall
//!
//! Cross-platform wrapper for the page-level memory calls `saferstring` builds on:
//! - page allocation and release
//! - page protection changes
//! - locking pages into RAM so they are not swapped to disk
//!
//! The calls are exposed through [`Region`], an owned run of whole pages that
//! wipes and releases itself on drop.

mod error;
mod types;

#[cfg(target_family = "unix")]
mod unix;
#[cfg(target_family = "unix")]
use unix as platform;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as platform;

use log::warn;
use std::ptr::NonNull;

pub use error::MemcallError;
pub use types::MemoryProtection;

/// Returns the system's page size.
pub fn page_size() -> usize {
    platform::page_size()
}

/// Rounds `len` up to a whole number of pages.
pub fn round_to_pages(len: usize) -> usize {
    let page = page_size();
    len.div_ceil(page) * page
}

/// An owned, page-aligned memory region.
///
/// A fresh region is zero-filled and `ReadWrite`. On drop it is made writable
/// again, wiped, unlocked if it was locked, and unmapped.
pub struct Region {
    ptr: NonNull<u8>,
    size: usize,
    protection: MemoryProtection,
    locked: bool,
}

// Safety: the region exclusively owns its pages.
unsafe impl Send for Region {}

impl Region {
    /// Maps at least `len` bytes, rounded up to whole pages.
    pub fn alloc(len: usize) -> Result<Self, MemcallError> {
        if len == 0 {
            return Err(MemcallError::InvalidArgument(
                "<memcall> cannot allocate an empty region".to_string(),
            ));
        }

        let size = round_to_pages(len);
        let ptr = platform::alloc(size)?;

        // Fresh mappings are zero-filled already, but do not rely on it.
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };

        Ok(Self {
            ptr,
            size,
            protection: MemoryProtection::ReadWrite,
            locked: false,
        })
    }

    /// Size of the region in bytes, always a multiple of the page size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current protection of the region's pages.
    pub fn protection(&self) -> MemoryProtection {
        self.protection
    }

    /// Whether the pages are currently locked into RAM.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Changes the protection of every page in the region.
    pub fn protect(&mut self, protection: MemoryProtection) -> Result<(), MemcallError> {
        if self.protection == protection {
            return Ok(());
        }

        platform::protect(self.ptr, self.size, protection)?;
        self.protection = protection;
        Ok(())
    }

    /// Locks the region into RAM and, where supported, excludes it from core dumps.
    pub fn lock(&mut self) -> Result<(), MemcallError> {
        if !self.locked {
            platform::lock(self.ptr, self.size)?;
            self.locked = true;
        }
        Ok(())
    }

    /// Unlocks a region previously locked with [`Region::lock`].
    pub fn unlock(&mut self) -> Result<(), MemcallError> {
        if self.locked {
            platform::unlock(self.ptr, self.size)?;
            self.locked = false;
        }
        Ok(())
    }

    /// Read access to the region's bytes.
    ///
    /// Returns `None` while the region is `NoAccess`.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self.protection {
            MemoryProtection::NoAccess => None,
            _ => Some(unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }),
        }
    }

    /// Write access to the region's bytes.
    ///
    /// Returns `None` unless the region is `ReadWrite`.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self.protection {
            MemoryProtection::ReadWrite => {
                Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) })
            }
            _ => None,
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if let Err(e) = self.protect(MemoryProtection::ReadWrite) {
            // Unmapping without wiping is still better than leaking readable pages.
            warn!("memcall: could not make region writable before wipe: {}", e);
        } else {
            unsafe { std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.size) };
        }

        if let Err(e) = self.unlock() {
            warn!("memcall: could not unlock region: {}", e);
        }

        if let Err(e) = platform::free(self.ptr, self.size) {
            warn!("memcall: {}", e);
        }
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("size", &self.size)
            .field("protection", &self.protection)
            .field("locked", &self.locked)
            .finish()
    }
}
