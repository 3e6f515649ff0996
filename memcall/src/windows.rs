use crate::error::MemcallError;
use crate::types::MemoryProtection;
use std::ptr::{self, NonNull};
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualLock, VirtualProtect, VirtualUnlock, MEM_COMMIT, MEM_RELEASE,
    MEM_RESERVE, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

pub(crate) fn page_size() -> usize {
    unsafe {
        let mut si: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut si);
        si.dwPageSize as usize
    }
}

pub(crate) fn alloc(size: usize) -> Result<NonNull<u8>, MemcallError> {
    let allocated =
        unsafe { VirtualAlloc(ptr::null(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };

    NonNull::new(allocated.cast::<u8>()).ok_or_else(|| {
        MemcallError::SystemError(format!(
            "<memcall> could not allocate [Err: {}]",
            std::io::Error::last_os_error()
        ))
    })
}

pub(crate) fn free(ptr: NonNull<u8>, _size: usize) -> Result<(), MemcallError> {
    if unsafe { VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE) } == 0 {
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
        MemoryProtection::NoAccess => PAGE_NOACCESS,
        MemoryProtection::ReadOnly => PAGE_READONLY,
        MemoryProtection::ReadWrite => PAGE_READWRITE,
    };

    let mut old_protect: u32 = 0;
    if unsafe { VirtualProtect(ptr.as_ptr().cast(), size, prot, &mut old_protect) } == 0 {
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
    if unsafe { VirtualLock(ptr.as_ptr().cast(), size) } == 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not acquire lock on {:p}, limit reached? [Err: {}]",
            ptr.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}

pub(crate) fn unlock(ptr: NonNull<u8>, size: usize) -> Result<(), MemcallError> {
    if unsafe { VirtualUnlock(ptr.as_ptr().cast(), size) } == 0 {
        return Err(MemcallError::SystemError(format!(
            "<memcall> could not free lock on {:p} [Err: {}]",
            ptr.as_ptr(),
            std::io::Error::last_os_error()
        )));
    }

    Ok(())
}
