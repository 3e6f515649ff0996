use crate::error::MemcallError;
use crate::types::MemoryProtection;
use once_cell::sync::Lazy;
use std::ptr::{self, NonNull};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize });

pub(crate) fn page_size() -> usize {
    *PAGE_SIZE
}

pub(crate) fn alloc(size: usize) -> Result<NonNull<u8>, MemcallError> {
    let mapped = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };

    if mapped == libc::MAP_FAILED {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not allocate [Err: {}]",
            std::io::Error::last_os_error()
        )));
    }

    // mmap never hands back null on success
    NonNull::new(mapped.cast::<u8>()).ok_or_else(|| {
        MemcallError::SystemError("<memcall> mmap returned a null mapping".to_string())
    })
}

pub(crate) fn free(ptr: NonNull<u8>, size: usize) -> Result<(), MemcallError> {
    if unsafe { libc::munmap(ptr.as_ptr().cast(), size) } != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not deallocate {:p} [Err: {}]",
            ptr.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub(crate) fn protect(
    ptr: NonNull<u8>,
    size: usize,
    protection: MemoryProtection,
) -> Result<(), MemcallError> {
    let prot = match protection {
        MemoryProtection::NoAccess => libc::PROT_NONE,
        MemoryProtection::ReadOnly => libc::PROT_READ,
        MemoryProtection::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
    };

    if unsafe { libc::mprotect(ptr.as_ptr().cast(), size, prot) } != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not set {:?} on {:p} [Err: {}]",
            protection,
            ptr.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub(crate) fn lock(ptr: NonNull<u8>, size: usize) -> Result<(), MemcallError> {
    // Keep the pages out of core dumps; failure here is not fatal.
    #[cfg(target_os = "linux")]
    unsafe {
        libc::madvise(ptr.as_ptr().cast(), size, libc::MADV_DONTDUMP);
    }

    if unsafe { libc::mlock(ptr.as_ptr().cast(), size) } != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not acquire lock on {:p}, limit reached? [Err: {}]",
            ptr.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub(crate) fn unlock(ptr: NonNull<u8>, size: usize) -> Result<(), MemcallError> {
    if unsafe { libc::munlock(ptr.as_ptr().cast(), size) } != 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not free lock on {:p} [Err: {}]",
            ptr.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}
