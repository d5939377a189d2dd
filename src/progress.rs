use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};

/// Receives `(percent, message)` on whichever thread produced the event.
pub type ProgressListener = Box<dyn Fn(u8, &str) + Send + Sync>;

/// The two phases of a run. Traversal covers 0-50% overall, dispatch 50-100%.
#[derive(Debug, Copy, Clone, Eq, PartialEq, strum::Display)]
pub enum Phase {
    Traversal,
    Dispatch,
}

impl Phase {
    const WEIGHT: u32 = 50;

    fn offset(self) -> u32 {
        match self {
            Phase::Traversal => 0,
            Phase::Dispatch => Self::WEIGHT,
        }
    }

    /// Maps progress within this phase (clamped to 0-100) to overall progress.
    pub fn overall(self, percent: u32) -> u8 {
        let percent = percent.min(100);
        (self.offset() + Self::WEIGHT * percent / 100) as u8
    }
}

/// Integer percentage of `done` out of `total`, 100 when there is nothing to do.
pub fn percent_of(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((100 * done.min(total) as u64) / total as u64) as u32
}

/// Fans progress events out to listeners. The overall percentage handed to
/// listeners never decreases during a run, even if phases report out of order.
#[derive(Default)]
pub struct Progress {
    listeners: Vec<ProgressListener>,
    last: AtomicU8,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: impl Fn(u8, &str) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Starts a new run: the monotonic floor goes back to zero.
    pub fn reset(&self) {
        self.last.store(0, Ordering::Release);
    }

    pub fn last(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }

    pub fn report(&self, phase: Phase, percent: u32, message: &str) {
        self.emit(phase.overall(percent), message);
    }

    pub fn finish(&self, message: &str) {
        self.emit(100, message);
    }

    fn emit(&self, overall: u8, message: &str) {
        let previous = self.last.fetch_max(overall, Ordering::AcqRel);
        let percent = previous.max(overall);
        for listener in self.listeners.iter() {
            listener(percent, message);
        }
    }
}

impl Debug for Progress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("listeners", &self.listeners.len())
            .field("last", &self.last())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (Progress, Arc<Mutex<Vec<(u8, String)>>>) {
        let events = Arc::new(Mutex::new(vec![]));
        let mut progress = Progress::new();
        let sink = events.clone();
        progress.add_listener(move |p, m| sink.lock().unwrap().push((p, m.to_string())));
        (progress, events)
    }

    #[test]
    fn test_phase_weighting() {
        assert_eq!(Phase::Traversal.overall(0), 0);
        assert_eq!(Phase::Traversal.overall(50), 25);
        assert_eq!(Phase::Traversal.overall(100), 50);
        assert_eq!(Phase::Dispatch.overall(0), 50);
        assert_eq!(Phase::Dispatch.overall(33), 66);
        assert_eq!(Phase::Dispatch.overall(100), 100);
        assert_eq!(Phase::Dispatch.overall(250), 100);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 4), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(5, 3), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_emitted_progress_never_decreases() {
        let (progress, events) = recording();
        progress.report(Phase::Traversal, 80, "walk");
        progress.report(Phase::Traversal, 20, "late walk event");
        progress.report(Phase::Dispatch, 10, "dispatch");
        progress.finish("Done");

        let percents: Vec<_> = events.lock().unwrap().iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![40, 40, 55, 100]);
        assert_eq!(events.lock().unwrap()[1].1, "late walk event");
    }

    #[test]
    fn test_reset_starts_new_run() {
        let (progress, events) = recording();
        progress.finish("Done");
        progress.reset();
        progress.report(Phase::Traversal, 0, "again");
        assert_eq!(events.lock().unwrap().last().unwrap().0, 0);
    }
}
