use thiserror::Error;

/// Errors raised by the page-level system calls.
#[derive(Error, Debug)]
pub enum MemcallError {
    /// The operating system rejected the call.
    #[error("System operation failed: {0}")]
    SystemError(String),

    /// Invalid arguments were provided to the operation.
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),
}
