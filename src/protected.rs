//! Character storage held in protected pages.
//!
//! [`ProtectedStore`] is the opaque capability the rest of the crate works
//! against: append one character at a time, enumerate, dispose.
//! [`ProtectedString`] implements it on top of `memcall` regions.
//!
//! The page protection state transitions are:
//!
//! ```text
//! Idle: NoAccess
//!      |
//!      | (append_char)            (enumerate)
//!      v                              v
//!   ReadWrite                      ReadOnly
//!      |                              |
//!      v                              v
//!   NoAccess                       NoAccess
//!      |
//!      | (dispose / drop)
//!      v
//!   ReadWrite (for zeroing) -> Freed
//! ```

use crate::error::{Result, SaferStringError};
use log::{debug, trace, warn};
use memcall::{MemoryProtection, Region};
use std::cell::{RefCell, RefMut};
use std::fmt;
use zeroize::Zeroize;

/// Maximum number of characters a [`ProtectedString`] holds.
pub const MAX_LENGTH: usize = 65_536;

const CHAR_WIDTH: usize = std::mem::size_of::<u32>();

/// An append-then-read container of characters held in protected memory.
///
/// Implementations are single-owner and not meant to be shared across
/// threads without external serialization.
pub trait ProtectedStore {
    /// Appends one character to the end of the store.
    fn append_char(&mut self, c: char) -> Result<()>;

    /// Visits every stored character in order.
    ///
    /// The store's contents are readable only for the duration of the call.
    fn enumerate(&self, visit: &mut dyn FnMut(char)) -> Result<()>;

    /// Number of stored characters.
    fn len(&self) -> usize;

    /// True if no characters are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wipes and releases the store. Calling it again is a no-op.
    fn dispose(&mut self);

    /// True once the store has been disposed.
    fn is_disposed(&self) -> bool;
}

/// A [`ProtectedStore`] backed by locked, normally inaccessible pages.
///
/// Characters are kept as 32-bit scalar values. The backing region grows by
/// allocating a larger one, copying, and letting the old region wipe itself.
pub struct ProtectedString {
    region: RefCell<Option<Region>>,
    len: usize,
    read_only: bool,
    disposed: bool,
}

impl ProtectedString {
    /// Creates an empty store. No pages are mapped until the first append.
    pub fn new() -> Self {
        Self {
            region: RefCell::new(None),
            len: 0,
            read_only: false,
            disposed: false,
        }
    }

    /// Builds a store from a sequence of characters.
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Result<Self> {
        let mut store = Self::new();
        for c in chars {
            store.append_char(c)?;
        }
        Ok(store)
    }

    /// Forbids further appends.
    pub fn make_read_only(&mut self) {
        self.read_only = true;
    }

    /// True once [`make_read_only`](Self::make_read_only) has been called.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Wipes the contents but keeps the store usable.
    pub fn clear(&mut self) -> Result<()> {
        self.check_writable()?;
        // Dropping the region wipes it.
        self.region.get_mut().take();
        self.len = 0;
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.disposed {
            return Err(SaferStringError::StoreDisposed);
        }
        if self.read_only {
            return Err(SaferStringError::ReadOnly);
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.region
            .borrow()
            .as_ref()
            .map_or(0, |region| region.size() / CHAR_WIDTH)
    }

    /// Replaces the backing region with one that fits at least `min_chars`.
    fn grow(&mut self, min_chars: usize) -> Result<()> {
        let wanted = (self.capacity() * 2).max(min_chars);
        let mut grown = Region::alloc(wanted * CHAR_WIDTH)
            .map_err(|e| SaferStringError::AllocationFailed(e.to_string()))?;
        lock_region(&mut grown);

        if let Ok(old) = RefMut::filter_map(self.region.borrow_mut(), Option::as_mut) {
            copy_exposed(old, &mut grown, self.len * CHAR_WIDTH)?;
        }

        trace!("protected store grew to {} bytes", grown.size());
        grown.protect(MemoryProtection::NoAccess)?;
        // The previous region, if any, wipes itself on drop.
        *self.region.get_mut() = Some(grown);
        Ok(())
    }
}

fn lock_region(region: &mut Region) {
    #[cfg(not(feature = "no-mlock"))]
    if let Err(e) = region.lock() {
        // Paging protection is best effort.
        warn!("could not lock protected store into memory: {}", e);
    }
    #[cfg(feature = "no-mlock")]
    let _ = region;
}

/// Copies the first `used` bytes of `old` into `grown`.
///
/// `old` is readable only while the copy runs and is back to `NoAccess` when
/// this returns, whether or not the copy succeeded.
fn copy_exposed(old: RefMut<'_, Region>, grown: &mut Region, used: usize) -> Result<()> {
    let exposure = Exposure::open(old, MemoryProtection::ReadOnly)?;
    let src = exposure
        .region
        .bytes()
        .ok_or_else(|| SaferStringError::ProtectionFailed("store is not readable".to_string()))?;
    let dst = grown.bytes_mut().ok_or_else(|| {
        SaferStringError::ProtectionFailed("grown store is not writable".to_string())
    })?;
    dst[..used].copy_from_slice(&src[..used]);
    Ok(())
}

/// Decodes one stored character and wipes the stack copy it came from.
fn decode_char(raw: &mut [u8; CHAR_WIDTH]) -> char {
    let c = char::from_u32(u32::from_ne_bytes(*raw)).unwrap_or(char::REPLACEMENT_CHARACTER);
    raw.zeroize();
    c
}

/// Keeps a region readable or writable for one access and restores `NoAccess` on drop.
struct Exposure<'store> {
    region: RefMut<'store, Region>,
}

impl<'store> Exposure<'store> {
    fn open(mut region: RefMut<'store, Region>, protection: MemoryProtection) -> Result<Self> {
        region.protect(protection)?;
        Ok(Self { region })
    }
}

impl Drop for Exposure<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.region.protect(MemoryProtection::NoAccess) {
            warn!("could not restore NoAccess on protected store: {}", e);
        }
    }
}

impl ProtectedStore for ProtectedString {
    fn append_char(&mut self, c: char) -> Result<()> {
        self.check_writable()?;
        if self.len >= MAX_LENGTH {
            return Err(SaferStringError::CapacityExceeded(MAX_LENGTH));
        }
        if self.len == self.capacity() {
            self.grow(self.len + 1)?;
        }

        let offset = self.len * CHAR_WIDTH;
        let region = RefMut::filter_map(self.region.borrow_mut(), Option::as_mut)
            .map_err(|_| SaferStringError::StoreDisposed)?;
        let mut exposure = Exposure::open(region, MemoryProtection::ReadWrite)?;
        let bytes = exposure
            .region
            .bytes_mut()
            .ok_or_else(|| SaferStringError::ProtectionFailed("store is not writable".to_string()))?;
        let mut raw = u32::from(c).to_ne_bytes();
        bytes[offset..offset + CHAR_WIDTH].copy_from_slice(&raw);
        raw.zeroize();
        drop(exposure);

        self.len += 1;
        Ok(())
    }

    fn enumerate(&self, visit: &mut dyn FnMut(char)) -> Result<()> {
        if self.disposed {
            return Err(SaferStringError::StoreDisposed);
        }

        let region = match RefMut::filter_map(self.region.borrow_mut(), Option::as_mut) {
            Ok(region) => region,
            // Nothing has been appended yet.
            Err(_) => return Ok(()),
        };
        let exposure = Exposure::open(region, MemoryProtection::ReadOnly)?;
        let bytes = exposure
            .region
            .bytes()
            .ok_or_else(|| SaferStringError::ProtectionFailed("store is not readable".to_string()))?;

        for chunk in bytes[..self.len * CHAR_WIDTH].chunks_exact(CHAR_WIDTH) {
            let mut raw = [0u8; CHAR_WIDTH];
            raw.copy_from_slice(chunk);
            visit(decode_char(&mut raw));
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.len = 0;
        if let Some(region) = self.region.get_mut().take() {
            debug!("disposing protected store of {} bytes", region.size());
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Default for ProtectedString {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProtectedString {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ProtectedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectedString")
            .field("len", &self.len)
            .field("read_only", &self.read_only)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(store: &ProtectedString) -> String {
        let mut out = String::new();
        store
            .enumerate(&mut |c| out.push(c))
            .expect("enumerate should succeed");
        out
    }

    #[test]
    fn test_append_and_enumerate() {
        let mut store = ProtectedString::new();
        for c in ['L', 'l', 'a', 'm', 'a'] {
            store.append_char(c).expect("append should succeed");
        }

        assert_eq!(store.len(), 5);
        assert_eq!(collect(&store), "Llama");
    }

    #[test]
    fn test_empty_store_enumerates_nothing() {
        let store = ProtectedString::new();
        assert!(store.is_empty());
        assert_eq!(collect(&store), "");
    }

    #[test]
    fn test_grows_across_pages() {
        let text: String = std::iter::repeat("0123456789").take(1_000).collect();
        let store = ProtectedString::from_chars(text.chars()).expect("store should build");
        assert_eq!(store.len(), 10_000);
        assert_eq!(collect(&store), text);
    }

    #[test]
    fn test_non_ascii_round_trip() {
        let store = ProtectedString::from_chars("pässwörd🔑".chars()).expect("store should build");
        assert_eq!(collect(&store), "pässwörd🔑");
    }

    #[test]
    fn test_read_only_rejects_append() {
        let mut store = ProtectedString::from_chars("ab".chars()).expect("store should build");
        store.make_read_only();
        assert!(store.is_read_only());

        let err = store.append_char('c').expect_err("append must fail");
        assert!(matches!(err, SaferStringError::ReadOnly));
        assert_eq!(collect(&store), "ab");
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut store = ProtectedString::from_chars("gone".chars()).expect("store should build");
        store.dispose();
        store.dispose();

        assert!(store.is_disposed());
        assert!(matches!(
            store.enumerate(&mut |_| {}),
            Err(SaferStringError::StoreDisposed)
        ));
        assert!(matches!(
            store.append_char('x'),
            Err(SaferStringError::StoreDisposed)
        ));
    }

    #[test]
    fn test_clear_keeps_store_usable() {
        let mut store = ProtectedString::from_chars("old".chars()).expect("store should build");
        store.clear().expect("clear should succeed");
        assert!(store.is_empty());

        store.append_char('n').expect("append after clear");
        assert_eq!(collect(&store), "n");
    }

    #[test]
    fn test_grown_region_is_inaccessible_while_idle() {
        let text: String = std::iter::repeat('g').take(5_000).collect();
        let store = ProtectedString::from_chars(text.chars()).expect("store should build");

        let protection = store
            .region
            .borrow()
            .as_ref()
            .map(Region::protection);
        assert_eq!(protection, Some(MemoryProtection::NoAccess));
        assert_eq!(collect(&store), text);
    }

    #[test]
    fn test_failed_copy_restores_no_access() {
        let mut old = Region::alloc(CHAR_WIDTH).expect("alloc");
        old.bytes_mut().expect("writable")[..CHAR_WIDTH]
            .copy_from_slice(&u32::from('s').to_ne_bytes());
        old.protect(MemoryProtection::NoAccess).expect("protect");
        let old = RefCell::new(old);

        // A destination that cannot be written makes the copy fail.
        let mut grown = Region::alloc(2 * CHAR_WIDTH).expect("alloc");
        grown.protect(MemoryProtection::NoAccess).expect("protect");

        let err = copy_exposed(old.borrow_mut(), &mut grown, CHAR_WIDTH)
            .expect_err("copy into an inaccessible region must fail");

        assert!(matches!(err, SaferStringError::ProtectionFailed(_)));
        assert_eq!(old.borrow().protection(), MemoryProtection::NoAccess);
        assert!(old.borrow().bytes().is_none());
    }

    #[test]
    fn test_decode_wipes_stack_copy() {
        let mut raw = u32::from('🔑').to_ne_bytes();
        assert_eq!(decode_char(&mut raw), '🔑');
        assert_eq!(raw, [0u8; CHAR_WIDTH]);

        let mut invalid = 0xD800u32.to_ne_bytes();
        assert_eq!(decode_char(&mut invalid), char::REPLACEMENT_CHARACTER);
        assert_eq!(invalid, [0u8; CHAR_WIDTH]);
    }

    #[test]
    fn test_capacity_limit() {
        let mut store =
            ProtectedString::from_chars(std::iter::repeat('x').take(MAX_LENGTH)).expect("fill");
        let err = store.append_char('y').expect_err("store is full");
        assert!(matches!(err, SaferStringError::CapacityExceeded(MAX_LENGTH)));
    }
}
