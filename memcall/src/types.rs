/// Page protection applied to a [`Region`](crate::Region).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryProtection {
    /// Pages can be neither read nor written.
    NoAccess,

    /// Pages can be read but not written.
    ReadOnly,

    /// Pages can be read and written.
    ReadWrite,
}
