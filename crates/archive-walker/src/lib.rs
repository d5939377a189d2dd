//! Depth-first traversal of zip archives that contain other zip archives.
//!
//! The root archive is opened with random access; every container found inside
//! it (`.zip`, `.jar`, `.war`, matched case-insensitively) is buffered in memory
//! and walked on the same thread. Entries are handed to an [EntryVisitor]
//! together with the [ArchiveStack] that leads to them.

mod arena;
mod entry;
mod error;
#[cfg(test)]
mod tests;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod utils;
mod walkers;

pub use arena::{HandleArena, HandleId, OpenHandle};
pub use entry::{logical_name, EntryDetails, EntryKind, FileEntry};
pub use error::WalkError;
pub use utils::ArchiveStack;
pub use walkers::{open_root, ArchiveWalker, EntryVisitor, WalkSummary};
