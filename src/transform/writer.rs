use crate::transform::{ProducedUnit, TransformSink};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, trace};

/// Persists produced sources under `destination/<package path>/<Name>.<extension>`,
/// overwriting existing files. Write failures are logged and counted.
#[derive(Debug)]
pub struct SourceWriter {
    destination: PathBuf,
    extension: String,
    written: AtomicUsize,
    write_failures: AtomicUsize,
    reported_errors: AtomicUsize,
}

impl SourceWriter {
    pub fn new(destination: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            extension: extension.into(),
            written: AtomicUsize::new(0),
            write_failures: AtomicUsize::new(0),
            reported_errors: AtomicUsize::new(0),
        }
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    pub fn write_failures(&self) -> usize {
        self.write_failures.load(Ordering::Acquire)
    }

    pub fn reported_errors(&self) -> usize {
        self.reported_errors.load(Ordering::Acquire)
    }

    fn write_source(&self, output: &ProducedUnit) -> std::io::Result<PathBuf> {
        let target = self.destination.join(output.relative_path(&self.extension));
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, output.text.as_bytes())?;
        Ok(target)
    }
}

impl TransformSink for SourceWriter {
    fn produced(&self, unit: &str, output: ProducedUnit) {
        match self.write_source(&output) {
            Ok(target) => {
                trace!(unit, path = %target.display(), "Saved source");
                self.written.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                error!(unit, "Write failed for {}.{}: {e}", output.package, output.simple_name);
                self.write_failures.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    fn progress(&self, unit: &str, message: &str) {
        trace!(unit, "Transformer: {message}");
    }

    fn error(&self, unit: &str, message: &str) {
        error!(unit, "Transformer: {message}");
        self.reported_errors.fetch_add(1, Ordering::AcqRel);
    }
}
