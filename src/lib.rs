use std::fmt::{Display, Formatter};
use std::num::{NonZero, NonZeroUsize};
use std::time::Duration;

mod dispatch;
mod error;
mod manifest;
mod pipeline;
mod progress;
mod rules;
mod staging;
pub mod transform;
mod walk;


pub use archive_walker::{logical_name, EntryKind, WalkError, WalkSummary};
pub use dispatch::{DispatchCounts, DispatchError, Dispatcher};
pub use error::RunError;
pub use manifest::{manifest_file_name, ManifestRow, ManifestWriter, HEADER};
pub use pipeline::{Pipeline, RunSummary};
pub use progress::{percent_of, Phase, Progress, ProgressListener};
pub use rules::{Group, RuleError, RuleGroup, RuleSet};
pub use staging::StagingStore;
pub use walk::{walk, WalkCounts, WalkOutput};

pub const DEFAULT_SOURCE_EXTENSION: &str = "java";

pub fn default_threads() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZero::<usize>::MIN)
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Size of the dispatch worker pool.
    pub threads: NonZeroUsize,
    /// How many levels of nested containers to open. `None` opens all of them.
    pub max_depth: Option<NonZeroUsize>,
    /// Extension of the source files written by the dispatch phase.
    pub source_extension: String,
    pub progress_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            max_depth: None,
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            progress_interval: Duration::from_millis(500),
        }
    }
}

impl Display for Options {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Options(threads={}, max_depth={:?}, source_extension={:?}, progress_interval={:?})",
            self.threads, self.max_depth, self.source_extension, self.progress_interval
        )
    }
}
