use crate::erase::{zero_string, Erase};
use std::fmt;
use std::ops::Deref;

/// A transient, exclusively owned plaintext character buffer.
///
/// The buffer never reallocates behind the caller's back: growing it moves
/// the contents into a larger allocation and zeroes the old one first. It is
/// erased when dropped.
pub struct PlaintextBuffer {
    inner: String,
}

impl PlaintextBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            inner: String::new(),
        }
    }

    /// Creates an empty buffer that can hold `bytes` UTF-8 bytes without growing.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            inner: String::with_capacity(bytes),
        }
    }

    /// Appends a character, growing the allocation without leaving a copy behind.
    pub fn push(&mut self, c: char) {
        let needed = self.inner.len() + c.len_utf8();
        if needed > self.inner.capacity() {
            let mut grown = String::with_capacity(needed.max(self.inner.capacity() * 2));
            grown.push_str(&self.inner);
            zero_string(&mut self.inner);
            self.inner = grown;
        }
        self.inner.push(c);
    }

    /// The buffer contents.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Number of characters held.
    pub fn char_count(&self) -> usize {
        self.inner.chars().count()
    }

    /// True once the buffer holds no characters, as it does after [`Erase::erase`].
    pub fn is_erased(&self) -> bool {
        self.inner.is_empty()
    }

    /// True if every byte of the allocation, spare capacity included, is zero.
    ///
    /// Only meaningful after an erase, which initialises the spare capacity.
    #[cfg(test)]
    pub(crate) fn allocation_is_zeroed(&self) -> bool {
        // Safety: erasing wrote zeroes across the full capacity.
        let allocation =
            unsafe { std::slice::from_raw_parts(self.inner.as_ptr(), self.inner.capacity()) };
        allocation.iter().all(|&b| b == 0)
    }
}

impl Default for PlaintextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for PlaintextBuffer {
    type Target = str;

    fn deref(&self) -> &str {
        &self.inner
    }
}

impl AsRef<str> for PlaintextBuffer {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl PartialEq<str> for PlaintextBuffer {
    fn eq(&self, other: &str) -> bool {
        self.inner == other
    }
}

impl PartialEq<&str> for PlaintextBuffer {
    fn eq(&self, other: &&str) -> bool {
        self.inner == *other
    }
}

impl Erase for PlaintextBuffer {
    fn erase(&mut self) {
        zero_string(&mut self.inner);
    }

    fn is_blank(&self) -> bool {
        self.inner.is_blank()
    }
}

impl Drop for PlaintextBuffer {
    fn drop(&mut self) {
        zero_string(&mut self.inner);
    }
}

impl fmt::Debug for PlaintextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaintextBuffer([REDACTED; {} bytes])", self.inner.len())
    }
}
