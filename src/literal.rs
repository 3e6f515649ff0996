//! Interned text constants that can be erased in place.
//!
//! String literals live in read-only memory, so they cannot be wiped. Text
//! that is meant to behave like a shared constant is interned here instead:
//! every [`intern`] of the same literal hands back a handle to the same
//! slot, and [`erase_shared`] zeroes that slot for all of them.
//!
//! # Hazard
//!
//! Erasing an interned constant is a process-wide side effect. Every other
//! holder of the constant observes it as empty afterwards, and later calls
//! to [`intern`] with the same literal return the erased slot.

use crate::erase::{is_blank, zero_string};
use log::warn;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static ARENA: Lazy<Mutex<HashMap<&'static str, Arc<Mutex<String>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Handle to an interned constant.
#[derive(Clone)]
pub struct SharedText {
    slot: Arc<Mutex<String>>,
}

/// Returns the shared slot for `literal`, creating it on first use.
pub fn intern(literal: &'static str) -> SharedText {
    let mut arena = ARENA.lock();
    let slot = arena
        .entry(literal)
        .or_insert_with(|| Arc::new(Mutex::new(literal.to_owned())));
    SharedText {
        slot: Arc::clone(slot),
    }
}

/// Zeroes an interned constant in place and empties it, for every holder.
///
/// See the module documentation for why this is opt-in.
pub fn erase_shared(text: &SharedText) {
    let mut slot = text.slot.lock();
    warn!(
        "erasing interned constant of {} bytes; all holders observe the erasure",
        slot.len()
    );
    zero_string(&mut slot);
}

impl SharedText {
    /// Runs `f` over the current contents of the slot.
    ///
    /// The slot stays locked while `f` runs; `f` must not call back into
    /// this handle.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(self.slot.lock().as_str())
    }

    /// Length of the slot in bytes.
    pub fn len(&self) -> usize {
        self.slot.lock().len()
    }

    /// True if the slot holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_empty()
    }

    /// True when every character is NUL or whitespace.
    pub fn is_blank(&self) -> bool {
        is_blank(self.slot.lock().as_str())
    }

    /// True if both handles refer to the same interned slot.
    pub fn same_slot(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.slot, &b.slot)
    }
}

impl fmt::Debug for SharedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedText([REDACTED; {} bytes])", self.len())
    }
}
