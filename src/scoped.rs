//! Scoped access to a protected store's plaintext.
//!
//! Every entry point follows the same sequence:
//!
//! ```text
//! Idle -> Revealing -> Invoking -> Erasing -> Done
//!                          |
//!                          +-> Erasing -> Failed   (Err or panic)
//! ```
//!
//! Erasing is done by a guard's `Drop`, so it runs when the transformation
//! returns, returns an error, or unwinds. The transformation receives a
//! borrowed `&str` and its result cannot borrow from it, so nothing handed
//! back to the caller points into the erased buffer. Copies the
//! transformation makes on its own (pushing into a captured `Vec`, say) are
//! the caller's responsibility.

use crate::convert::reveal;
use crate::erase::Erase;
use crate::error::{Result, SaferStringError};
use crate::plaintext::PlaintextBuffer;
use crate::protected::ProtectedStore;
use log::trace;

/// Erases the revealed plaintext when dropped.
struct EraseOnExit<'buf> {
    buffer: &'buf mut PlaintextBuffer,
}

impl Drop for EraseOnExit<'_> {
    fn drop(&mut self) {
        self.buffer.erase();
        if std::thread::panicking() {
            trace!("scoped reveal: erased plaintext while unwinding");
        } else {
            trace!("scoped reveal: erased plaintext");
        }
    }
}

/// Invokes `f` exactly once over `buffer`, then erases `buffer` on every exit path.
pub(crate) fn invoke_erasing<F, R>(buffer: &mut PlaintextBuffer, f: F) -> R
where
    F: FnOnce(&str) -> R,
{
    let guard = EraseOnExit { buffer };
    trace!("scoped reveal: invoking transformation");
    let result = f(guard.buffer.as_str());
    drop(guard);
    result
}

/// Runs `f` over the plaintext of `store` and returns its result.
///
/// The revealed plaintext is zeroed before this returns or unwinds. The
/// only error is a failure to read the store.
///
/// # Example
///
/// ```rust,no_run
/// use saferstring::{run_scoped, ProtectedString};
///
/// let store = ProtectedString::from_chars("Llama".chars()).unwrap();
/// let matched = run_scoped(&store, |s| s == "Llama").unwrap();
/// assert!(matched);
/// ```
pub fn run_scoped<S, F, R>(store: &S, f: F) -> Result<R>
where
    S: ProtectedStore + ?Sized,
    F: FnOnce(&str) -> R,
{
    trace!("scoped reveal: revealing {} characters", store.len());
    let mut plaintext = reveal(store)?;
    Ok(invoke_erasing(&mut plaintext, f))
}

/// [`run_scoped`] with one extra argument passed through to `f`.
pub fn run_scoped_with<S, F, A, R>(store: &S, f: F, arg: A) -> Result<R>
where
    S: ProtectedStore + ?Sized,
    F: FnOnce(&str, A) -> R,
{
    run_scoped(store, |plaintext| f(plaintext, arg))
}

/// [`run_scoped`] for a transformation that produces no result.
pub fn run_scoped_void<S, F>(store: &S, f: F) -> Result<()>
where
    S: ProtectedStore + ?Sized,
    F: FnOnce(&str),
{
    run_scoped(store, f)
}

/// [`run_scoped_with`] for a transformation that produces no result.
pub fn run_scoped_void_with<S, F, A>(store: &S, f: F, arg: A) -> Result<()>
where
    S: ProtectedStore + ?Sized,
    F: FnOnce(&str, A),
{
    run_scoped(store, |plaintext| f(plaintext, arg))
}

/// Runs a fallible transformation over the plaintext of `store`.
///
/// An error from `f` is returned unchanged, after the plaintext has been
/// erased. Store failures are converted into `E`.
pub fn try_run_scoped<S, F, R, E>(store: &S, f: F) -> std::result::Result<R, E>
where
    S: ProtectedStore + ?Sized,
    F: FnOnce(&str) -> std::result::Result<R, E>,
    E: From<SaferStringError>,
{
    let mut plaintext = reveal(store)?;
    let result = invoke_erasing(&mut plaintext, f);
    if result.is_err() {
        trace!("scoped reveal: transformation failed");
    }
    result
}

/// Method-style access to the scoped reveal entry points.
///
/// Implemented for every [`ProtectedStore`].
pub trait WithPlaintext: ProtectedStore {
    /// See [`run_scoped`].
    fn with_plaintext<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&str) -> R,
    {
        run_scoped(self, f)
    }

    /// See [`run_scoped_with`].
    fn with_plaintext_arg<F, A, R>(&self, f: F, arg: A) -> Result<R>
    where
        F: FnOnce(&str, A) -> R,
    {
        run_scoped_with(self, f, arg)
    }

    /// See [`try_run_scoped`].
    fn try_with_plaintext<F, R, E>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&str) -> std::result::Result<R, E>,
        E: From<SaferStringError>,
    {
        try_run_scoped(self, f)
    }
}

impl<S: ProtectedStore + ?Sized> WithPlaintext for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protected::ProtectedString;
    use std::panic::{self, AssertUnwindSafe};

    fn llama() -> ProtectedString {
        ProtectedString::from_chars(['L', 'l', 'a', 'm', 'a']).expect("store should build")
    }

    #[derive(Debug, PartialEq)]
    enum AppError {
        Rejected(usize),
        Store(String),
    }

    impl From<SaferStringError> for AppError {
        fn from(err: SaferStringError) -> Self {
            AppError::Store(err.to_string())
        }
    }

    #[test]
    fn test_buffer_erased_after_success() {
        let store = llama();
        let mut buffer = reveal(&store).expect("reveal");

        let len = invoke_erasing(&mut buffer, |s| s.len());

        assert_eq!(len, 5);
        assert!(buffer.is_erased());
        assert!(buffer.allocation_is_zeroed());
    }

    #[test]
    fn test_buffer_erased_after_error() {
        let store = llama();
        let mut buffer = reveal(&store).expect("reveal");

        let result: std::result::Result<(), AppError> =
            invoke_erasing(&mut buffer, |s| Err(AppError::Rejected(s.len())));

        assert_eq!(result, Err(AppError::Rejected(5)));
        assert!(buffer.is_erased());
        assert!(buffer.allocation_is_zeroed());
    }

    #[test]
    fn test_buffer_erased_after_panic() {
        let store = llama();
        let mut buffer = reveal(&store).expect("reveal");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            invoke_erasing(&mut buffer, |_| -> usize { panic!("transformation blew up") })
        }));

        let payload = outcome.expect_err("panic must propagate");
        assert_eq!(
            payload.downcast_ref::<&str>(),
            Some(&"transformation blew up")
        );
        assert!(buffer.is_erased());
        assert!(buffer.allocation_is_zeroed());
    }

    #[test]
    fn test_transformation_invoked_once() {
        let store = llama();
        let mut calls = 0;
        run_scoped_void(&store, |_| calls += 1).expect("run");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_pure_transformation_matches_reveal() {
        let store = llama();
        let expected = reveal(&store).expect("reveal").to_uppercase();
        let actual = run_scoped(&store, str::to_uppercase).expect("run");
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_try_run_scoped_propagates_error_unchanged() {
        let store = llama();
        let result: std::result::Result<(), AppError> =
            try_run_scoped(&store, |s| Err(AppError::Rejected(s.len())));
        assert_eq!(result, Err(AppError::Rejected(5)));
    }

    #[test]
    fn test_store_failure_converted_into_caller_error() {
        let mut store = llama();
        store.dispose();

        let result: std::result::Result<(), AppError> = store.try_with_plaintext(|_| Ok(()));
        assert_eq!(
            result,
            Err(AppError::Store(SaferStringError::StoreDisposed.to_string()))
        );
    }

    #[test]
    fn test_disposed_store_never_invokes_transformation() {
        let mut store = llama();
        store.dispose();

        let mut invoked = false;
        let result = run_scoped_void(&store, |_| invoked = true);

        assert!(matches!(result, Err(SaferStringError::StoreDisposed)));
        assert!(!invoked);
    }
}
