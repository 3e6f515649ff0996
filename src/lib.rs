//! # saferstring
//!
//! Short-lived secret text in memory.
//!
//! Plaintext is moved into a [`ProtectedString`], whose pages are locked into
//! RAM and kept inaccessible while idle. The source buffer is zeroed as part
//! of the move. Plaintext is handed back only inside a scope: the store is
//! revealed into a transient buffer, the caller's closure runs once over it,
//! and the buffer is zeroed before control returns, whether the closure
//! returned a value, returned an error, or panicked.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use saferstring::{run_scoped, run_scoped_void_with, Erase, ToProtected};
//!
//! let mut password = String::from("hunter2");
//! let store = password.to_protected().unwrap();
//! // The source has been zeroed in place and emptied
//! assert!(password.is_empty());
//!
//! let length = run_scoped(&store, |plaintext| plaintext.len()).unwrap();
//! assert_eq!(length, 7);
//!
//! let mut seen = Vec::new();
//! run_scoped_void_with(&store, |plaintext, prefix| {
//!     seen.push(format!("{}{}", prefix, plaintext));
//! }, "Top").unwrap();
//! ```
//!
//! ## Fallible transformations
//!
//! ```rust,no_run
//! use saferstring::{ProtectedString, SaferStringError, WithPlaintext};
//!
//! #[derive(Debug)]
//! enum AppError {
//!     TooShort,
//!     Store(SaferStringError),
//! }
//!
//! impl From<SaferStringError> for AppError {
//!     fn from(err: SaferStringError) -> Self {
//!         AppError::Store(err)
//!     }
//! }
//!
//! let store = ProtectedString::from_chars("abc".chars()).unwrap();
//! let checked: Result<(), AppError> = store.try_with_plaintext(|plaintext| {
//!     if plaintext.len() < 8 {
//!         return Err(AppError::TooShort);
//!     }
//!     Ok(())
//! });
//! assert!(matches!(checked, Err(AppError::TooShort)));
//! ```
//!
//! ## Interned constants
//!
//! Literals cannot be wiped, so text meant to behave like a shared constant
//! is interned with [`intern`] and wiped with [`erase_shared`]. Erasing it is
//! visible to every holder of the constant; see the [`literal`] module.

/// Error types
pub mod error;

/// In-place erasure of plaintext buffers
pub mod erase;

/// Transient plaintext buffer
pub mod plaintext;

/// Interned, erasable text constants
pub mod literal;

/// Protected character storage
pub mod protected;

/// Plaintext to protected store conversion and back
pub mod convert;

/// Scoped plaintext access with guaranteed erasure
pub mod scoped;

pub use crate::convert::{protect, protect_chars, reveal, ToPlaintext, ToProtected};
pub use crate::erase::{erase, is_blank, Erase};
pub use crate::error::{Result, SaferStringError};
pub use crate::literal::{erase_shared, intern, SharedText};
pub use crate::plaintext::PlaintextBuffer;
pub use crate::protected::{ProtectedStore, ProtectedString, MAX_LENGTH};
pub use crate::scoped::{
    run_scoped, run_scoped_void, run_scoped_void_with, run_scoped_with, try_run_scoped,
    WithPlaintext,
};
