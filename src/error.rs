//! Error type for the fallible container operations.

use core::alloc::Layout;

/// Why a container could not allocate new backing storage.
///
/// Returned by the `try_*` operations. When one of these is returned the
/// container is exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested capacity does not fit in `usize` or exceeds
    /// `isize::MAX` bytes.
    #[error("requested capacity exceeds the addressable maximum")]
    CapacityOverflow,

    /// The allocator refused to provide a block of the given layout.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError {
        /// Layout of the block that could not be allocated.
        layout: Layout,
    },
}

impl Error {
    /// Aborts the way the standard collections do for an infallible
    /// operation that could not allocate.
    #[cold]
    pub(crate) fn handle(self) -> ! {
        match self {
            Error::CapacityOverflow => panic!("capacity overflow"),
            Error::AllocError { layout } => alloc::alloc::handle_alloc_error(layout),
        }
    }
}
