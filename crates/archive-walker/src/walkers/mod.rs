mod nested;
mod zipfile;

pub use zipfile::open_root;

use crate::arena::HandleArena;
use crate::entry::{EntryDetails, EntryKind, FileEntry};
use crate::error::WalkError;
use crate::utils::ArchiveStack;
use std::io::Read;
use std::num::NonZeroUsize;
use tracing::{debug, trace};

/// Receives the entries of a walk, depth-first and in each container's native order.
/// Directory entries are never passed to a visitor.
pub trait EntryVisitor {
    /// Called before each file entry of the root archive. `done` counts every
    /// root entry up to and including this one, directories included.
    fn root_progress(&mut self, _done: usize, _total: usize, _name: &str) {}

    /// A non-container entry. Bytes the visitor does not read are skipped.
    fn visit_file(&mut self, entry: &mut FileEntry<'_>, stack: &ArchiveStack)
        -> std::io::Result<()>;

    fn begin_container(
        &mut self,
        _details: &EntryDetails,
        _stack: &ArchiveStack,
    ) -> std::io::Result<()> {
        Ok(())
    }

    /// Called once all entries of a nested container have been visited.
    fn end_container(&mut self, details: &EntryDetails, stack: &ArchiveStack)
        -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct WalkSummary {
    /// Non-directory entries seen at every level, containers included.
    pub entries: usize,
    pub containers: usize,
    pub peak_depth: usize,
    pub released_handles: usize,
}

/// Walks a root zip archive and every container nested inside it.
///
/// The root is read through [zip::ZipArchive] so its entry count is known up
/// front. Each nested container is read into memory and opened as a
/// [zip::ZipArchive] as well, on the same thread, one level at a time. Entries
/// whose local headers defer their sizes to a data descriptor are sized from the
/// central directory.
#[derive(Debug, Default)]
pub struct ArchiveWalker {
    stack: ArchiveStack,
    arena: HandleArena,
    max_depth: Option<NonZeroUsize>,
    summary: WalkSummary,
}

impl ArchiveWalker {
    pub fn new(max_depth: Option<NonZeroUsize>) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    fn may_descend(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max.get())
    }

    fn visit_entry<V: EntryVisitor>(
        &mut self,
        name: String,
        reader: &mut dyn Read,
        visitor: &mut V,
    ) -> Result<(), WalkError> {
        self.summary.entries += 1;
        let depth = self.stack.current_depth();
        let details = EntryDetails::new(name, self.stack.current_label(), depth);

        let mut kind = EntryKind::from_name(&details.path);
        if kind.is_container() && !self.may_descend(depth) {
            debug!(
                path = %self.stack.full_path(&details.path),
                "Depth limit reached, treating container as a plain file"
            );
            kind = EntryKind::PlainFile;
        }

        if kind.is_container() {
            self.walk_container(details.clone(), reader, visitor)?;
            visitor.end_container(&details, &self.stack)?;
        } else {
            trace!(path = %self.stack.full_path(&details.path), %kind, "visiting entry");
            let mut entry = FileEntry::new(details, kind, reader);
            visitor.visit_file(&mut entry, &self.stack)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> WalkSummary {
        self.summary.peak_depth = self.arena.peak_depth();
        self.summary.released_handles = self.arena.release_all();
        self.arena = HandleArena::new();
        self.stack = ArchiveStack::new();
        std::mem::take(&mut self.summary)
    }
}
