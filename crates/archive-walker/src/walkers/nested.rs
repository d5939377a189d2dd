use crate::entry::EntryDetails;
use crate::error::WalkError;
use crate::walkers::zipfile::Level;
use crate::walkers::{ArchiveWalker, EntryVisitor};
use std::io::{Cursor, Read};
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

impl ArchiveWalker {
    /// Walks a container nested somewhere below the root. `reader` is the
    /// container entry inside its parent. Its bytes are read into memory first
    /// so the container can be opened through its central directory, which is
    /// the only place entries written with a data descriptor record their sizes.
    pub(crate) fn walk_container<V: EntryVisitor>(
        &mut self,
        details: EntryDetails,
        reader: &mut dyn Read,
        visitor: &mut V,
    ) -> Result<(), WalkError> {
        info!(
            archive = %self.stack.full_path(&details.path),
            "Extracting nested archive"
        );
        visitor.begin_container(&details, &self.stack)?;
        self.summary.containers += 1;

        self.stack.push_details(details.clone());
        let result = self.walk_buffered(details, reader, visitor);
        self.stack.pop_details();
        result
    }

    fn walk_buffered<V: EntryVisitor>(
        &mut self,
        details: EntryDetails,
        reader: &mut dyn Read,
        visitor: &mut V,
    ) -> Result<(), WalkError> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|e| self.nested_error(e.into()))?;

        let handle = self.arena.open(details, buffer.len());
        let mut archive =
            ZipArchive::new(Cursor::new(buffer)).map_err(|source| self.nested_error(source))?;
        self.walk_entries(&mut archive, Level::Nested(handle), visitor)?;

        if let Some(opened) = self.arena.get(handle) {
            debug!(
                archive = %opened.details,
                entries = opened.entries_read,
                bytes = opened.buffered,
                "Finished nested archive"
            );
        }
        Ok(())
    }

    /// The error for the innermost container on the stack.
    pub(crate) fn nested_error(&self, source: ZipError) -> WalkError {
        let (path, parent) = self
            .stack
            .last_entry()
            .map(|d| (d.path.clone(), d.parent.clone()))
            .unwrap_or_default();
        WalkError::NestedContainer {
            path,
            parent,
            source,
        }
    }
}
