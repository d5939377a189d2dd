use std::fmt::{Debug, Display, Formatter};
use std::io::Read;

const CONTAINER_SUFFIXES: [&str; 3] = [".zip", ".jar", ".war"];
const CLASS_SUFFIX: &str = ".class";

/// How an entry is handled, decided purely from its name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, strum::Display, strum::EnumIs)]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    /// A nested zip, jar or war that is walked recursively.
    Container,
    /// A compiled `.class` unit.
    Class,
    PlainFile,
}

impl EntryKind {
    pub fn from_name(name: &str) -> Self {
        if CONTAINER_SUFFIXES
            .iter()
            .any(|suffix| has_suffix_ignore_case(name, suffix))
        {
            EntryKind::Container
        } else if has_suffix_ignore_case(name, CLASS_SUFFIX) {
            EntryKind::Class
        } else {
            EntryKind::PlainFile
        }
    }
}

// A bare suffix (".jar") has no stem and is not a match.
fn has_suffix_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() > suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Derives the dotted logical name of a class entry: `a/b/C.class` becomes `a.b.C`.
pub fn logical_name(path: &str) -> String {
    let stem = if has_suffix_ignore_case(path, CLASS_SUFFIX) {
        &path[..path.len() - CLASS_SUFFIX.len()]
    } else {
        path
    };
    stem.replace(['/', '\\'], ".")
}

/// Represents the details of a [FileEntry]: its path inside the immediate
/// parent container, the label of that parent and how deeply it is nested.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EntryDetails {
    pub path: String,
    pub parent: String,
    pub depth: usize,
}

impl EntryDetails {
    pub fn new(path: impl Into<String>, parent: impl Into<String>, depth: usize) -> Self {
        Self {
            path: path.into(),
            parent: parent.into(),
            depth,
        }
    }
}

impl Display for EntryDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} > {}", self.parent, self.path)
    }
}

/// A [FileEntry] is a non-container entry handed to a visitor. Reading from it
/// reads the entry's decompressed bytes from the enclosing stream.
pub struct FileEntry<'a> {
    details: EntryDetails,
    kind: EntryKind,
    reader: &'a mut dyn Read,
}

impl<'a> FileEntry<'a> {
    pub fn new(details: EntryDetails, kind: EntryKind, reader: &'a mut dyn Read) -> Self {
        Self {
            details,
            kind,
            reader,
        }
    }

    pub fn details(&self) -> &EntryDetails {
        &self.details
    }

    pub fn path(&self) -> &str {
        &self.details.path
    }

    pub fn parent(&self) -> &str {
        &self.details.parent
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }
}

impl Debug for FileEntry<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntry")
            .field("path", &self.details.path)
            .field("parent", &self.details.parent)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Read for FileEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(EntryKind::from_name("lib/inner.jar"), EntryKind::Container);
        assert_eq!(EntryKind::from_name("LIB/INNER.WAR"), EntryKind::Container);
        assert_eq!(EntryKind::from_name("bundle.Zip"), EntryKind::Container);
        assert_eq!(EntryKind::from_name("a/b/C.class"), EntryKind::Class);
        assert_eq!(EntryKind::from_name("a/b/C.CLASS"), EntryKind::Class);
        assert_eq!(EntryKind::from_name("META-INF/MANIFEST.MF"), EntryKind::PlainFile);
        assert_eq!(EntryKind::from_name("jar"), EntryKind::PlainFile);
        assert_eq!(EntryKind::from_name(".class"), EntryKind::PlainFile);
        assert_eq!(EntryKind::from_name("notes.jar.txt"), EntryKind::PlainFile);
    }

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("a/b/C.class"), "a.b.C");
        assert_eq!(logical_name("ninja/abap/HelloWorld1.CLASS"), "ninja.abap.HelloWorld1");
        assert_eq!(logical_name("Top.class"), "Top");
        assert_eq!(logical_name("a/b/Outer$Inner.class"), "a.b.Outer$Inner");
    }
}
