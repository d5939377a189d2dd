use crate::{ArchiveStack, ArchiveWalker, EntryDetails, EntryKind, EntryVisitor, FileEntry, WalkError};
use crate::test_utils::{jar_archive, zip_archive, CompressionMethod, Item};
use std::io::{Cursor, Read};
use std::num::NonZeroUsize;
use zip::ZipArchive;

pub const TEST_DATA: &[u8] = b"hello world";

#[derive(Debug, Clone, Eq, PartialEq)]
enum Event {
    File {
        path: String,
        parent: String,
        depth: usize,
        kind: EntryKind,
        data: Vec<u8>,
    },
    Begin(String),
    End {
        path: String,
        parent: String,
    },
}

#[derive(Debug, Default)]
struct TestVisitor {
    events: Vec<Event>,
    progress: Vec<(usize, usize, String)>,
}

impl EntryVisitor for TestVisitor {
    fn root_progress(&mut self, done: usize, total: usize, name: &str) {
        self.progress.push((done, total, name.to_string()));
    }

    fn visit_file(&mut self, entry: &mut FileEntry<'_>, _stack: &ArchiveStack) -> std::io::Result<()> {
        let mut data = vec![];
        entry.read_to_end(&mut data)?;
        self.events.push(Event::File {
            path: entry.path().to_string(),
            parent: entry.parent().to_string(),
            depth: entry.details().depth,
            kind: entry.kind(),
            data,
        });
        Ok(())
    }

    fn begin_container(&mut self, details: &EntryDetails, _stack: &ArchiveStack) -> std::io::Result<()> {
        self.events.push(Event::Begin(details.path.clone()));
        Ok(())
    }

    fn end_container(&mut self, details: &EntryDetails, _stack: &ArchiveStack) -> std::io::Result<()> {
        self.events.push(Event::End {
            path: details.path.clone(),
            parent: details.parent.clone(),
        });
        Ok(())
    }
}

fn deflated(items: &[Item]) -> Vec<u8> {
    zip_archive(items, CompressionMethod::Deflated)
}

fn stored(items: &[Item]) -> Vec<u8> {
    zip_archive(items, CompressionMethod::Stored)
}

fn nested_fixture() -> (Vec<u8>, Vec<u8>) {
    nested_fixture_with(deflated)
}

fn nested_fixture_with(build: fn(&[Item]) -> Vec<u8>) -> (Vec<u8>, Vec<u8>) {
    let deep = build(&[Item::File("z.txt", TEST_DATA)]);
    let inner = build(&[
        Item::File("x/Y.class", b"\xca\xfe\xba\xbe"),
        Item::Dir("x/sub/"),
        Item::File("deep.zip", &deep),
    ]);
    let root = build(&[
        Item::File("a.txt", TEST_DATA),
        Item::Dir("dir/"),
        Item::File("lib/inner.jar", &inner),
        Item::File("b.class", TEST_DATA),
    ]);
    (root, deep)
}

fn walk(walker: &mut ArchiveWalker, data: Vec<u8>) -> (Result<crate::WalkSummary, WalkError>, TestVisitor) {
    let mut visitor = TestVisitor::default();
    let archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let result = walker.walk_archive("root.zip", archive, &mut visitor);
    (result, visitor)
}

fn file(path: &str, parent: &str, depth: usize, kind: EntryKind, data: &[u8]) -> Event {
    Event::File {
        path: path.to_string(),
        parent: parent.to_string(),
        depth,
        kind,
        data: data.to_vec(),
    }
}

#[test]
fn test_walk_nested_depth_first() {
    let (root, _) = nested_fixture();
    let (result, visitor) = walk(&mut ArchiveWalker::default(), root);
    let summary = result.unwrap();

    assert_eq!(
        visitor.events,
        vec![
            file("a.txt", "root.zip", 0, EntryKind::PlainFile, TEST_DATA),
            Event::Begin("lib/inner.jar".into()),
            file("x/Y.class", "lib/inner.jar", 1, EntryKind::Class, b"\xca\xfe\xba\xbe"),
            Event::Begin("deep.zip".into()),
            file("z.txt", "deep.zip", 2, EntryKind::PlainFile, TEST_DATA),
            Event::End {
                path: "deep.zip".into(),
                parent: "lib/inner.jar".into()
            },
            Event::End {
                path: "lib/inner.jar".into(),
                parent: "root.zip".into()
            },
            file("b.class", "root.zip", 0, EntryKind::Class, TEST_DATA),
        ]
    );
    assert_eq!(summary.entries, 6);
    assert_eq!(summary.containers, 2);
    assert_eq!(summary.peak_depth, 2);
    assert_eq!(summary.released_handles, 2);
}

#[test]
fn test_walk_is_independent_of_entry_layout() {
    let (expected, expected_visitor) = walk(&mut ArchiveWalker::default(), nested_fixture().0);
    let expected = expected.unwrap();
    for build in [stored as fn(&[Item]) -> Vec<u8>, jar_archive] {
        let (root, _) = nested_fixture_with(build);
        let (result, visitor) = walk(&mut ArchiveWalker::default(), root);
        assert_eq!(result.unwrap(), expected);
        assert_eq!(visitor.events, expected_visitor.events);
    }
}

#[test]
fn test_nested_jar_with_data_descriptors() {
    let inner = jar_archive(&[
        Item::Dir("a/"),
        Item::Dir("a/b/"),
        Item::File("a/b/C.class", b"\xca\xfe\xba\xbe"),
        Item::File("a/b/notes.txt", TEST_DATA),
    ]);
    let outer = jar_archive(&[
        Item::File("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
        Item::File("lib/inner.jar", &inner),
    ]);
    let (result, visitor) = walk(&mut ArchiveWalker::default(), outer);
    let summary = result.unwrap();

    assert_eq!(
        visitor.events,
        vec![
            file("META-INF/MANIFEST.MF", "root.zip", 0, EntryKind::PlainFile, b"Manifest-Version: 1.0\n"),
            Event::Begin("lib/inner.jar".into()),
            file("a/b/C.class", "lib/inner.jar", 1, EntryKind::Class, b"\xca\xfe\xba\xbe"),
            file("a/b/notes.txt", "lib/inner.jar", 1, EntryKind::PlainFile, TEST_DATA),
            Event::End {
                path: "lib/inner.jar".into(),
                parent: "root.zip".into()
            },
        ]
    );
    assert_eq!(summary.containers, 1);
    assert_eq!(summary.entries, 4);
}

#[test]
fn test_truncated_nested_container_aborts() {
    let inner = jar_archive(&[Item::File("a/b/C.class", b"\xca\xfe\xba\xbe")]);
    let root = deflated(&[
        Item::File("lib/inner.jar", &inner[..inner.len() - 22]),
        Item::File("b.txt", TEST_DATA),
    ]);
    let (result, visitor) = walk(&mut ArchiveWalker::default(), root);

    assert!(matches!(
        result,
        Err(WalkError::NestedContainer { ref path, .. }) if path == "lib/inner.jar"
    ));
    assert_eq!(visitor.events, vec![Event::Begin("lib/inner.jar".into())]);
}

#[test]
fn test_root_progress_skips_directories() {
    let (root, _) = nested_fixture();
    let (result, visitor) = walk(&mut ArchiveWalker::default(), root);
    result.unwrap();
    assert_eq!(
        visitor.progress,
        vec![
            (1, 4, "a.txt".to_string()),
            (3, 4, "lib/inner.jar".to_string()),
            (4, 4, "b.class".to_string()),
        ]
    );
}

#[test]
fn test_depth_limit_treats_container_as_file() {
    let (root, deep) = nested_fixture();
    let mut walker = ArchiveWalker::new(NonZeroUsize::new(1));
    let (result, visitor) = walk(&mut walker, root);
    let summary = result.unwrap();

    assert!(visitor
        .events
        .contains(&file("deep.zip", "lib/inner.jar", 1, EntryKind::PlainFile, &deep)));
    assert!(!visitor.events.contains(&Event::Begin("deep.zip".into())));
    assert_eq!(summary.containers, 1);
}

#[test]
fn test_walker_is_reusable() {
    let (root, _) = nested_fixture();
    let mut walker = ArchiveWalker::default();
    let (first, first_visitor) = walk(&mut walker, root.clone());
    let (second, second_visitor) = walk(&mut walker, root);
    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(first_visitor.events, second_visitor.events);
}

#[test]
fn test_broken_nested_container_aborts() {
    let root = deflated(&[
        Item::File("a.txt", TEST_DATA),
        Item::File("broken.jar", b"this is definitely not a zip archive, not even close"),
        Item::File("b.txt", TEST_DATA),
    ]);
    let (result, visitor) = walk(&mut ArchiveWalker::default(), root);

    match result {
        Err(WalkError::NestedContainer { path, parent, .. }) => {
            assert_eq!(path, "broken.jar");
            assert_eq!(parent, "root.zip");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!visitor
        .events
        .iter()
        .any(|e| matches!(e, Event::File { path, .. } if path == "b.txt")));
}

#[test]
fn test_walk_path_not_an_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.jar");
    std::fs::write(&path, TEST_DATA).unwrap();

    let result = ArchiveWalker::default().walk_path(&path, &mut TestVisitor::default());
    assert!(matches!(result, Err(WalkError::Open { .. })));

    let missing = dir.path().join("missing.jar");
    let result = ArchiveWalker::default().walk_path(&missing, &mut TestVisitor::default());
    assert!(matches!(result, Err(WalkError::Open { .. })));
}

#[test]
fn test_walk_path_labels_root_with_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.jar");
    std::fs::write(&path, deflated(&[Item::File("a.txt", TEST_DATA)])).unwrap();

    let mut visitor = TestVisitor::default();
    ArchiveWalker::default().walk_path(&path, &mut visitor).unwrap();
    assert_eq!(
        visitor.events,
        vec![file("a.txt", "hello.jar", 0, EntryKind::PlainFile, TEST_DATA)]
    );
}
