//! The boundary to the class-to-source transformer.
//!
//! A [Transformer] is asked to transform one unit at a time, by logical name.
//! It fetches the unit's bytes through a [UnitSource] and reports everything it
//! produces through a [TransformSink]. Transformers are shared by all dispatch
//! workers and must accept concurrent calls for distinct units.

mod command;
mod writer;

pub use command::CommandTransformer;
pub use writer::SourceWriter;

use bytes::Bytes;
use std::path::PathBuf;

/// Lookup of staged unit payloads by logical name.
pub trait UnitSource: Sync {
    fn unit_bytes(&self, name: &str) -> std::io::Result<Bytes>;
}

/// Source text produced for one unit.
#[derive(Debug, Clone, Eq, PartialEq, derive_new::new)]
pub struct ProducedUnit {
    /// Dotted package, empty for the default package.
    #[new(into)]
    pub package: String,
    #[new(into)]
    pub simple_name: String,
    #[new(into)]
    pub text: String,
}

impl ProducedUnit {
    /// Splits a logical name such as `a.b.C` into package `a.b` and simple name `C`.
    pub fn for_unit(unit: &str, text: impl Into<String>) -> Self {
        let (package, simple_name) = split_unit_name(unit);
        Self::new(package, simple_name, text)
    }

    /// Location of the source file relative to the output root.
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        let mut path: PathBuf = self
            .package
            .split('.')
            .filter(|part| !part.is_empty())
            .collect();
        path.push(format!("{}.{extension}", self.simple_name));
        path
    }
}

pub fn split_unit_name(unit: &str) -> (&str, &str) {
    match unit.rsplit_once('.') {
        Some((package, simple_name)) => (package, simple_name),
        None => ("", unit),
    }
}

/// Receives the events a transformer emits, one method per event kind.
pub trait TransformSink: Sync {
    fn produced(&self, unit: &str, output: ProducedUnit);

    fn progress(&self, unit: &str, message: &str);

    fn error(&self, unit: &str, message: &str);
}

pub trait Transformer: Send + Sync {
    fn transform(
        &self,
        unit: &str,
        source: &dyn UnitSource,
        sink: &dyn TransformSink,
    ) -> anyhow::Result<()>;
}

impl<T: Transformer + ?Sized> Transformer for &T {
    fn transform(
        &self,
        unit: &str,
        source: &dyn UnitSource,
        sink: &dyn TransformSink,
    ) -> anyhow::Result<()> {
        (**self).transform(unit, source, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_split_unit_name() {
        assert_eq!(split_unit_name("a.b.C"), ("a.b", "C"));
        assert_eq!(split_unit_name("Top"), ("", "Top"));
    }

    #[test]
    fn test_relative_path() {
        let unit = ProducedUnit::for_unit("ninja.abap.HelloWorld1", "class HelloWorld1 {}");
        assert_eq!(unit.package, "ninja.abap");
        assert_eq!(unit.simple_name, "HelloWorld1");
        assert_eq!(
            unit.relative_path("java"),
            Path::new("ninja").join("abap").join("HelloWorld1.java")
        );

        let unit = ProducedUnit::for_unit("Top", "");
        assert_eq!(unit.relative_path("java"), Path::new("Top.java"));
    }
}
