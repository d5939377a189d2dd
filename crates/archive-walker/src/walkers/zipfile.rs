use crate::arena::HandleId;
use crate::entry::EntryDetails;
use crate::error::WalkError;
use crate::walkers::{ArchiveWalker, EntryVisitor, WalkSummary};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::info;
use zip::ZipArchive;

/// Which level of the archive tree an archive being enumerated sits at.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Level {
    Root,
    Nested(HandleId),
}

/// Opens the root archive at `path`. Returns the label used for it (its file
/// name) together with the archive.
pub fn open_root(path: &Path) -> Result<(String, ZipArchive<BufReader<File>>), WalkError> {
    let file = File::open(path).map_err(|e| WalkError::Open {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let archive =
        ZipArchive::new(BufReader::with_capacity(1024 * 1024, file)).map_err(|source| {
            WalkError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((label, archive))
}

impl ArchiveWalker {
    #[tracing::instrument(skip(self, visitor), fields(max_depth = ?self.max_depth))]
    pub fn walk_path<V: EntryVisitor>(
        &mut self,
        path: &Path,
        visitor: &mut V,
    ) -> Result<WalkSummary, WalkError> {
        let (label, archive) = open_root(path)?;
        self.walk_archive(label, archive, visitor)
    }

    pub fn walk_archive<R: Read + Seek, V: EntryVisitor>(
        &mut self,
        label: impl Into<String>,
        mut archive: ZipArchive<R>,
        visitor: &mut V,
    ) -> Result<WalkSummary, WalkError> {
        let label = label.into();
        info!(archive = %label, entries = archive.len(), "Extracting archive");
        self.stack.push_details(EntryDetails::new(label.as_str(), "", 0));
        let result = self.walk_entries(&mut archive, Level::Root, visitor);
        // Nested containers are only released once the whole root has been enumerated.
        let summary = self.finish();
        result.map(|_| summary)
    }

    /// Visits every non-directory entry of `archive` in its native order.
    pub(crate) fn walk_entries<R: Read + Seek, V: EntryVisitor>(
        &mut self,
        archive: &mut ZipArchive<R>,
        level: Level,
        visitor: &mut V,
    ) -> Result<(), WalkError> {
        let total = archive.len();
        for index in 0..total {
            let mut entry = archive.by_index(index).map_err(|source| match level {
                Level::Root => WalkError::Entry {
                    archive: self.stack.root_label().to_string(),
                    index,
                    source,
                },
                Level::Nested(_) => self.nested_error(source),
            })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            match level {
                Level::Root => visitor.root_progress(index + 1, total, &name),
                Level::Nested(handle) => self.arena.record_entry(handle),
            }
            self.visit_entry(name, &mut entry, visitor)?;
        }
        Ok(())
    }
}
