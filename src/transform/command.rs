use crate::transform::{ProducedUnit, TransformSink, Transformer, UnitSource};
use anyhow::{anyhow, bail, Context};
use once_cell::sync::OnceCell;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Runs an external decompiler once per unit: `program [args..] <unit>.class`.
/// Standard output is taken as the unit's source text.
///
/// The scratch directory the units are written to is created on first use and
/// shared by every worker afterwards.
#[derive(Debug)]
pub struct CommandTransformer {
    program: OsString,
    args: Vec<OsString>,
    driver: OnceCell<Driver>,
}

#[derive(Debug)]
struct Driver {
    scratch: TempDir,
}

impl Driver {
    fn new() -> anyhow::Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("archive-to-source-")
            .tempdir()
            .context("Failed to create scratch directory")?;
        debug!(path = %scratch.path().display(), "Created scratch directory");
        Ok(Self { scratch })
    }
}

impl CommandTransformer {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            driver: OnceCell::new(),
        }
    }

    pub fn with_args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The scratch directory, once the first unit has been transformed.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.driver.get().map(|d| d.scratch.path())
    }
}

impl Transformer for CommandTransformer {
    fn transform(
        &self,
        unit: &str,
        source: &dyn UnitSource,
        sink: &dyn TransformSink,
    ) -> anyhow::Result<()> {
        let driver = self.driver.get_or_try_init(Driver::new)?;
        let bytes = source.unit_bytes(unit)?;

        let class_file = driver.scratch.path().join(format!("{unit}.class"));
        std::fs::write(&class_file, &bytes)
            .with_context(|| format!("Failed to write {}", class_file.display()))?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&class_file)
            .stdin(Stdio::null())
            .output();
        if let Err(e) = std::fs::remove_file(&class_file) {
            warn!(unit, "Failed to remove {}: {e}", class_file.display());
        }
        let output = output.with_context(|| format!("Failed to run {:?}", self.program))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let messages = stderr.lines().filter(|line| !line.trim().is_empty());
        if !output.status.success() {
            messages.for_each(|line| sink.error(unit, line));
            bail!("{:?} exited with {}", self.program, output.status);
        }
        messages.for_each(|line| sink.progress(unit, line));

        let text = simdutf8::basic::from_utf8(&output.stdout)
            .map_err(|_| anyhow!("Output for {unit} is not valid UTF-8"))?;
        sink.produced(unit, ProducedUnit::for_unit(unit, text));
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::staging::StagingStore;
    use crate::transform::SourceWriter;

    #[test]
    fn test_stdout_becomes_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new();
        store.stage("a.b.C", b"class C {}".to_vec());
        let writer = SourceWriter::new(dir.path(), "java");

        let transformer = CommandTransformer::new("cat");
        transformer.transform("a.b.C", &store, &writer).unwrap();

        let source = std::fs::read_to_string(dir.path().join("a/b/C.java")).unwrap();
        assert_eq!(source, "class C {}");
        let scratch = transformer.scratch_dir().unwrap().to_path_buf();
        assert!(!scratch.join("a.b.C.class").exists());

        store.stage("a.b.D", b"class D {}".to_vec());
        transformer.transform("a.b.D", &store, &writer).unwrap();
        assert_eq!(transformer.scratch_dir().unwrap(), scratch);
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn test_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new();
        store.stage("a.B", b"x".to_vec());
        let writer = SourceWriter::new(dir.path(), "java");

        let transformer = CommandTransformer::new("sh").with_args(["-c", "echo broken >&2; exit 3"]);
        let err = transformer.transform("a.B", &store, &writer).unwrap_err();
        assert!(err.to_string().contains("exited with"));
        assert_eq!(writer.reported_errors(), 1);
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn test_missing_unit_and_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::new();
        let writer = SourceWriter::new(dir.path(), "java");

        let transformer = CommandTransformer::new("cat");
        assert!(transformer.transform("not.Staged", &store, &writer).is_err());

        store.stage("a.B", b"x".to_vec());
        let transformer = CommandTransformer::new("definitely-not-a-real-decompiler");
        assert!(transformer.transform("a.B", &store, &writer).is_err());
    }
}
