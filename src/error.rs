use thiserror::Error;

/// Errors that can occur in the saferstring library.
///
/// Failures raised by a caller's own transformation are never wrapped in this
/// type; they reach the caller unchanged (see [`try_run_scoped`](crate::try_run_scoped)).
#[derive(Error, Debug)]
pub enum SaferStringError {
    /// Protected pages could not be allocated.
    #[error("Failed to allocate protected memory: {0}")]
    AllocationFailed(String),

    /// The protection of the store's pages could not be changed.
    #[error("Failed to set memory protection: {0}")]
    ProtectionFailed(String),

    /// The store has already been disposed.
    ///
    /// A disposed store has wiped and released its pages; it cannot be
    /// appended to or revealed again.
    #[error("Protected store is already disposed")]
    StoreDisposed,

    /// The store was made read-only and can no longer be appended to.
    #[error("Protected store is read-only")]
    ReadOnly,

    /// Appending would exceed the maximum store length.
    #[error("Protected store cannot hold more than {0} characters")]
    CapacityExceeded(usize),
}

impl From<memcall::MemcallError> for SaferStringError {
    fn from(err: memcall::MemcallError) -> Self {
        use memcall::MemcallError;
        match err {
            MemcallError::SystemError(msg) => SaferStringError::ProtectionFailed(msg),
            MemcallError::InvalidArgument(msg) => SaferStringError::AllocationFailed(msg),
        }
    }
}

/// Result type for saferstring operations.
pub type Result<T> = std::result::Result<T, SaferStringError>;
