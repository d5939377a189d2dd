use crate::error::RunError;
use crate::manifest::{manifest_file_name, ManifestRow, ManifestWriter};
use crate::progress::{percent_of, Phase, Progress};
use crate::rules::{Group, RuleSet};
use crate::staging::StagingStore;
use crate::Options;
use archive_walker::{
    logical_name, open_root, ArchiveStack, ArchiveWalker, EntryDetails, EntryKind, EntryVisitor,
    FileEntry, WalkError, WalkSummary,
};
use bytes::Bytes;
use indicatif::DecimalBytes;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufWriter, LineWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct WalkCounts {
    /// Manifest rows written, one per non-directory entry.
    pub entries: usize,
    pub containers: usize,
    pub extracted: usize,
    pub staged: usize,
    pub staged_bytes: u64,
    /// Entries that no rule selected.
    pub skipped: usize,
    /// Selected entries that could not be read or saved.
    pub failed: usize,
}

impl Display for WalkCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "entries={} containers={} extracted={} staged={} ({}) skipped={} failed={}",
            self.entries,
            self.containers,
            self.extracted,
            self.staged,
            DecimalBytes(self.staged_bytes),
            self.skipped,
            self.failed
        )
    }
}

/// Everything the traversal phase hands over to the dispatch phase.
#[derive(Debug)]
pub struct WalkOutput {
    pub manifest_path: PathBuf,
    pub manifest: Vec<ManifestRow>,
    pub staging: StagingStore,
    pub counts: WalkCounts,
    pub summary: WalkSummary,
}

/// Walks `root` and every archive nested in it. Selected plain files are
/// written below `destination`, selected classes are staged in memory, and one
/// manifest row is written per visited entry.
///
/// The root is opened before anything is written, so a missing or unreadable
/// root leaves the destination untouched.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn walk(
    root: &Path,
    destination: &Path,
    rules: &RuleSet,
    options: &Options,
    progress: &Progress,
) -> Result<WalkOutput, RunError> {
    let (label, archive) = open_root(root)?;
    std::fs::create_dir_all(destination).map_err(RunError::destination(destination))?;

    let manifest_path = destination.join(manifest_file_name(&label));
    let manifest =
        ManifestWriter::create(&manifest_path).map_err(RunError::manifest(&manifest_path))?;
    debug!("Walking {label} with {rules}");

    let mut visitor = Visitor {
        rules,
        destination,
        manifest,
        staging: StagingStore::new(),
        progress,
        counts: WalkCounts::default(),
    };
    let mut walker = ArchiveWalker::new(options.max_depth);
    let summary = match walker.walk_archive(label, archive, &mut visitor) {
        Ok(summary) => summary,
        // Visitors only fail when the manifest cannot be written.
        Err(WalkError::Io(source)) => {
            return Err(RunError::Manifest {
                path: manifest_path,
                source,
            })
        }
        Err(e) => return Err(e.into()),
    };

    let Visitor {
        manifest,
        staging,
        mut counts,
        ..
    } = visitor;
    let (_, manifest) = manifest
        .finish()
        .map_err(RunError::manifest(&manifest_path))?;
    counts.entries = manifest.len();
    info!(
        manifest = %manifest_path.display(),
        peak_depth = summary.peak_depth,
        "Traversal finished: {counts}"
    );
    Ok(WalkOutput {
        manifest_path,
        manifest,
        staging,
        counts,
        summary,
    })
}

struct Visitor<'a> {
    rules: &'a RuleSet,
    destination: &'a Path,
    manifest: ManifestWriter<LineWriter<File>>,
    staging: StagingStore,
    progress: &'a Progress,
    counts: WalkCounts,
}

impl Visitor<'_> {
    fn visit_class(&mut self, entry: &mut FileEntry<'_>, location: &str) -> ManifestRow {
        let unit = logical_name(entry.path());
        let mut transformed = false;
        if self.rules.matches(Group::Transform, &unit) {
            match read_payload(entry) {
                Ok(payload) => {
                    trace!(unit = %unit, size = payload.len(), "Staging class {location}");
                    self.counts.staged += 1;
                    self.counts.staged_bytes += payload.len() as u64;
                    self.staging.stage(unit.as_str(), payload);
                    transformed = true;
                }
                Err(e) => {
                    error!(unit = %unit, "Failed to read class {location}: {e}");
                    self.counts.failed += 1;
                }
            }
        } else {
            self.counts.skipped += 1;
        }
        ManifestRow::new(entry.path(), entry.parent(), unit, false, transformed)
    }

    fn visit_plain_file(&mut self, entry: &mut FileEntry<'_>, location: &str) -> ManifestRow {
        let mut extracted = false;
        if self.rules.matches(Group::Extract, entry.path()) {
            match safe_relative_path(entry.path()) {
                Some(relative) => match self.save(&relative, entry) {
                    Ok(size) => {
                        trace!(size, "Extracted {location}");
                        self.counts.extracted += 1;
                        extracted = true;
                    }
                    Err(e) => {
                        error!("Failed to save file {location}: {e}");
                        self.counts.failed += 1;
                    }
                },
                None => {
                    warn!("Refusing to extract {location} outside of the destination");
                    self.counts.failed += 1;
                }
            }
        } else {
            self.counts.skipped += 1;
        }
        ManifestRow::new(entry.path(), entry.parent(), "", extracted, false)
    }

    fn save(&self, relative: &Path, entry: &mut FileEntry<'_>) -> std::io::Result<u64> {
        let target = self.destination.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&target)?);
        let size = std::io::copy(entry, &mut writer)?;
        writer.flush()?;
        Ok(size)
    }
}

impl EntryVisitor for Visitor<'_> {
    fn root_progress(&mut self, done: usize, total: usize, name: &str) {
        self.progress.report(
            Phase::Traversal,
            percent_of(done, total),
            &format!("Extracting {name}"),
        );
    }

    fn visit_file(
        &mut self,
        entry: &mut FileEntry<'_>,
        stack: &ArchiveStack,
    ) -> std::io::Result<()> {
        let location = stack.full_path(entry.path());
        let row = match entry.kind() {
            EntryKind::Class => self.visit_class(entry, &location),
            EntryKind::PlainFile | EntryKind::Container => self.visit_plain_file(entry, &location),
        };
        self.manifest.append(row)
    }

    fn end_container(
        &mut self,
        details: &EntryDetails,
        _stack: &ArchiveStack,
    ) -> std::io::Result<()> {
        self.counts.containers += 1;
        self.manifest.append(ManifestRow::new(
            details.path.as_str(),
            details.parent.as_str(),
            "",
            false,
            false,
        ))
    }
}

fn read_payload(entry: &mut FileEntry<'_>) -> std::io::Result<Bytes> {
    let mut payload = Vec::with_capacity(8 * 1024);
    entry.read_to_end(&mut payload)?;
    Ok(payload.into())
}

/// The entry name as a path relative to the destination. `None` if it is
/// absolute or climbs out with `..`.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}
