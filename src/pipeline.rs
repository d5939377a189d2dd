use crate::dispatch::{DispatchCounts, Dispatcher};
use crate::error::RunError;
use crate::progress::Progress;
use crate::rules::RuleSet;
use crate::staging::StagingStore;
use crate::transform::Transformer;
use crate::walk::{WalkCounts, WalkOutput};
use crate::Options;
use indicatif::HumanDuration;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub manifest_path: PathBuf,
    pub walk: WalkCounts,
    pub dispatch: DispatchCounts,
    pub duration: Duration,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} in {}. Traversal: {}. Dispatch: {}",
            self.manifest_path.display(),
            HumanDuration(self.duration),
            self.walk,
            self.dispatch
        )
    }
}

/// Extracts one root archive into a destination: the traversal phase followed
/// by the dispatch phase. Progress listeners and rules survive across runs.
#[derive(Debug)]
pub struct Pipeline {
    rules: Arc<RuleSet>,
    options: Options,
    progress: Progress,
}

impl Pipeline {
    pub fn new(rules: RuleSet, options: Options) -> Self {
        Self {
            rules: Arc::new(rules),
            options,
            progress: Progress::new(),
        }
    }

    /// Replaces the rules for subsequent runs.
    pub fn set_rules(&mut self, rules: RuleSet) {
        info!("Using {rules}");
        self.rules = Arc::new(rules);
    }

    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.clone()
    }

    pub fn on_progress(&mut self, listener: impl Fn(u8, &str) + Send + Sync + 'static) {
        self.progress.add_listener(listener);
    }

    /// The traversal phase on its own.
    pub fn walk(&self, root: &Path, destination: &Path) -> Result<WalkOutput, RunError> {
        let rules = self.rules();
        crate::walk::walk(root, destination, &rules, &self.options, &self.progress)
    }

    /// The dispatch phase on its own.
    pub fn dispatch<T: Transformer>(
        &self,
        staging: StagingStore,
        destination: &Path,
        transformer: &T,
    ) -> Result<DispatchCounts, RunError> {
        let dispatcher = Dispatcher::new(&self.options, &self.progress)?;
        Ok(dispatcher.dispatch(staging, destination, transformer)?)
    }

    #[tracing::instrument(skip(self, transformer), fields(root = %root.display(), destination = %destination.display()))]
    pub fn run<T: Transformer>(
        &self,
        root: &Path,
        destination: &Path,
        transformer: &T,
    ) -> Result<RunSummary, RunError> {
        let start = Instant::now();
        self.progress.reset();
        info!("Starting with {}", self.options);

        let WalkOutput {
            manifest_path,
            staging,
            counts: walk,
            ..
        } = self.walk(root, destination)?;
        let dispatch = self.dispatch(staging, destination, transformer)?;
        self.progress.finish("Done");

        let summary = RunSummary {
            manifest_path,
            walk,
            dispatch,
            duration: start.elapsed(),
        };
        info!("All done. {summary}");
        Ok(summary)
    }
}
