//! Conversion between plaintext and protected stores.

use crate::erase::erase;
use crate::error::Result;
use crate::plaintext::PlaintextBuffer;
use crate::protected::{ProtectedStore, ProtectedString};
use log::trace;

/// Moves `plaintext` into a new [`ProtectedString`], erasing the source.
///
/// The source is erased on every path, including when the store fails
/// to accept a character. An empty source gives an empty store.
pub fn protect(plaintext: &mut String) -> Result<ProtectedString> {
    let store = fill(plaintext.chars());
    erase(plaintext);
    store
}

/// Like [`protect`], for a caller-owned character slice.
///
/// A slice cannot shrink, so the source is left holding NUL.
pub fn protect_chars(plaintext: &mut [char]) -> Result<ProtectedString> {
    let store = fill(plaintext.iter().copied());
    erase(plaintext);
    store
}

fn fill(chars: impl Iterator<Item = char>) -> Result<ProtectedString> {
    let mut store = ProtectedString::new();
    for c in chars {
        store.append_char(c)?;
    }
    trace!("protected {} characters", store.len());
    Ok(store)
}

/// Copies the contents of `store` into a fresh [`PlaintextBuffer`].
///
/// The store is left untouched. Erasing the returned buffer is up to the
/// caller, though dropping it erases it as well.
pub fn reveal<S: ProtectedStore + ?Sized>(store: &S) -> Result<PlaintextBuffer> {
    // Four bytes per character always fits, so the buffer never regrows.
    let mut buffer = PlaintextBuffer::with_capacity(store.len() * 4);
    store.enumerate(&mut |c| buffer.push(c))?;
    Ok(buffer)
}

/// Extension trait for turning plaintext into a protected store.
pub trait ToProtected {
    /// Moves the plaintext into protected memory and erases `self`.
    fn to_protected(&mut self) -> Result<ProtectedString>;
}

impl ToProtected for String {
    fn to_protected(&mut self) -> Result<ProtectedString> {
        protect(self)
    }
}

impl ToProtected for [char] {
    fn to_protected(&mut self) -> Result<ProtectedString> {
        protect_chars(self)
    }
}

impl ToProtected for Vec<char> {
    fn to_protected(&mut self) -> Result<ProtectedString> {
        let store = fill(self.iter().copied());
        erase(self);
        store
    }
}

/// Extension trait for revealing a store's plaintext.
pub trait ToPlaintext {
    /// Copies the store's characters into a new buffer.
    fn to_plaintext(&self) -> Result<PlaintextBuffer>;
}

impl<S: ProtectedStore + ?Sized> ToPlaintext for S {
    fn to_plaintext(&self) -> Result<PlaintextBuffer> {
        reveal(self)
    }
}
