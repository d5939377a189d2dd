use crate::progress::{percent_of, Phase, Progress};
use crate::staging::StagingStore;
use crate::transform::{SourceWriter, Transformer};
use crate::Options;
use crossbeam_channel::Receiver;
use indicatif::HumanDuration;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("{} staged classes were missing at dispatch time: {}", .0.len(), .0.join(", "))]
    MissingUnits(Vec<String>),
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct DispatchCounts {
    pub units: usize,
    pub transformed: usize,
    pub failed: usize,
    pub sources_written: usize,
    /// Produced sources that could not be saved. Their units still count as
    /// transformed.
    pub write_failures: usize,
    /// Errors the transformer reported through its sink.
    pub reported_errors: usize,
}

impl Display for DispatchCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "units={} transformed={} failed={} sources={} write_failures={} reported_errors={}",
            self.units,
            self.transformed,
            self.failed,
            self.sources_written,
            self.write_failures,
            self.reported_errors
        )
    }
}

enum UnitOutcome {
    Transformed,
    Failed,
    Missing(String),
}

/// Hands every staged class to a [Transformer] on a fixed-size worker pool.
///
/// Each unit is dispatched exactly once. A failing unit is logged and counted
/// without affecting the others. While workers are busy a reporter thread
/// publishes dispatch progress at a fixed interval.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    pool: rayon::ThreadPool,
    progress: &'a Progress,
    interval: Duration,
    extension: String,
}

impl<'a> Dispatcher<'a> {
    pub fn new(options: &Options, progress: &'a Progress) -> Result<Self, DispatchError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.threads.into())
            .thread_name(|index| format!("dispatch-{index}"))
            .build()?;
        Ok(Self {
            pool,
            progress,
            interval: options.progress_interval,
            extension: options.source_extension.clone(),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Transforms every unit in `staging`, writing sources below `destination`.
    /// The store is emptied once all workers are done.
    #[tracing::instrument(skip_all, fields(units = staging.len()))]
    pub fn dispatch<T: Transformer>(
        &self,
        staging: StagingStore,
        destination: &Path,
        transformer: &T,
    ) -> Result<DispatchCounts, DispatchError> {
        if staging.is_empty() {
            debug!("Nothing staged, skipping dispatch");
            return Ok(DispatchCounts::default());
        }
        let start = Instant::now();
        let names = staging.names();
        let total = names.len();
        info!(
            threads = self.threads(),
            "Transforming {total} classes ({})",
            indicatif::DecimalBytes(staging.total_bytes())
        );
        self.progress
            .report(Phase::Dispatch, 0, &format!("Transforming {total} classes"));

        let sink = SourceWriter::new(destination, self.extension.as_str());
        let completed = AtomicUsize::new(0);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        let outcomes: Vec<UnitOutcome> = std::thread::scope(|scope| {
            let completed = &completed;
            let (progress, interval) = (self.progress, self.interval);
            scope.spawn(move || report_until_done(progress, completed, total, interval, done_rx));

            let outcomes: Vec<UnitOutcome> = self.pool.install(|| {
                names
                    .par_iter()
                    .map(|name| {
                        let outcome = transform_unit(name, &staging, &sink, transformer);
                        completed.fetch_add(1, Ordering::AcqRel);
                        outcome
                    })
                    .collect()
            });
            // Wakes the reporter without waiting for its next tick.
            drop(done_tx);
            outcomes
        });

        let mut counts = DispatchCounts {
            units: total,
            sources_written: sink.written(),
            write_failures: sink.write_failures(),
            reported_errors: sink.reported_errors(),
            ..Default::default()
        };
        let mut missing = vec![];
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Transformed => counts.transformed += 1,
                UnitOutcome::Failed => counts.failed += 1,
                UnitOutcome::Missing(name) => missing.push(name),
            }
        }

        let released = staging.clear();
        trace!(released, "Released staged classes");
        self.progress.report(
            Phase::Dispatch,
            100,
            &format!("Transformed {} of {total} classes", counts.transformed),
        );
        info!("Dispatch finished in {}: {counts}", HumanDuration(start.elapsed()));
        if counts.write_failures > 0 {
            warn!(
                "{} of {} produced sources could not be saved below {}",
                counts.write_failures,
                counts.write_failures + counts.sources_written,
                destination.display()
            );
        }

        if !missing.is_empty() {
            return Err(DispatchError::MissingUnits(missing));
        }
        Ok(counts)
    }
}

fn transform_unit<T: Transformer>(
    name: &str,
    staging: &StagingStore,
    sink: &SourceWriter,
    transformer: &T,
) -> UnitOutcome {
    if !staging.contains(name) {
        error!(unit = name, "Staged class is missing");
        return UnitOutcome::Missing(name.to_string());
    }
    trace!(unit = name, "Transforming");
    match transformer.transform(name, staging, sink) {
        Ok(()) => UnitOutcome::Transformed,
        Err(e) => {
            error!(unit = name, "Transformation failed: {e:#}");
            UnitOutcome::Failed
        }
    }
}

fn report_until_done(
    progress: &Progress,
    completed: &AtomicUsize,
    total: usize,
    interval: Duration,
    done: Receiver<()>,
) {
    let ticker = crossbeam_channel::tick(interval);
    loop {
        crossbeam_channel::select! {
            recv(done) -> _ => return,
            recv(ticker) -> _ => {
                let finished = completed.load(Ordering::Acquire);
                progress.report(
                    Phase::Dispatch,
                    percent_of(finished, total),
                    &format!("Transforming classes ({finished}/{total})"),
                );
            }
        }
    }
}
