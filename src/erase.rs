//! In-place erasure of plaintext buffers.
//!
//! Erasing zeroes the bytes that held the secret in place, spare capacity
//! included, without moving or reallocating them. Growable buffers
//! (`String`, `Vec<char>`, [`PlaintextBuffer`](crate::PlaintextBuffer)) are
//! then truncated, so `len()` is 0 and `is_empty()` is true. Fixed-length
//! slices cannot shrink and are left holding NUL, which [`Erase::is_blank`]
//! treats as blank.
//!
//! Interned constants are erased separately through
//! [`erase_shared`](crate::erase_shared), because that mutates state every
//! other holder of the constant can see.

use log::trace;
use zeroize::Zeroize;

/// A buffer that can be zeroed in place.
pub trait Erase {
    /// Zeroes the contents in place and empties the buffer where it can shrink.
    fn erase(&mut self);

    /// True when every character is NUL or whitespace.
    fn is_blank(&self) -> bool;
}

/// Zeroes `buffer` in place.
///
/// Afterwards `buffer.is_blank()` reports true, and a growable buffer is
/// empty. Passing `None` through the
/// `Option` impl is a no-op.
pub fn erase<E: Erase + ?Sized>(buffer: &mut E) {
    buffer.erase();
    trace!("erased plaintext buffer");
}

/// True when every character of `text` is NUL or whitespace.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(is_blank_char)
}

#[inline]
pub(crate) fn is_blank_char(c: char) -> bool {
    c == '\0' || c.is_whitespace()
}

/// Zeroes the whole allocation of `text` and truncates it to length 0.
pub(crate) fn zero_string(text: &mut String) {
    text.zeroize();
}

impl Erase for String {
    fn erase(&mut self) {
        zero_string(self);
    }

    fn is_blank(&self) -> bool {
        is_blank(self)
    }
}

impl Erase for [char] {
    fn erase(&mut self) {
        self.zeroize();
    }

    fn is_blank(&self) -> bool {
        self.iter().copied().all(is_blank_char)
    }
}

impl Erase for Vec<char> {
    fn erase(&mut self) {
        self.zeroize();
    }

    fn is_blank(&self) -> bool {
        self.as_slice().is_blank()
    }
}

impl Erase for [u8] {
    fn erase(&mut self) {
        self.zeroize();
    }

    fn is_blank(&self) -> bool {
        self.iter().all(|&b| b == 0 || b.is_ascii_whitespace())
    }
}

impl<E: Erase + ?Sized> Erase for &mut E {
    fn erase(&mut self) {
        (**self).erase();
    }

    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }
}

impl<E: Erase> Erase for Option<E> {
    fn erase(&mut self) {
        if let Some(buffer) = self {
            buffer.erase();
        }
    }

    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Erase::is_blank)
    }
}
