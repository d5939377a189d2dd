use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const HEADER: [&str; 5] = [
    "Path",
    "Archive (parent)",
    "Class",
    "Extracted?",
    "Transformed?",
];

const LINE_ENDING: &str = "\r\n";

/// Name of the manifest file written next to the extracted files.
pub fn manifest_file_name(root_label: &str) -> String {
    format!("file_list_{root_label}.csv")
}

/// One visited entry and what was done with it.
#[derive(Debug, Clone, Eq, PartialEq, derive_new::new)]
pub struct ManifestRow {
    #[new(into)]
    pub path: String,
    #[new(into)]
    pub parent: String,
    /// Logical class name, empty for anything that is not a class.
    #[new(into)]
    pub unit: String,
    pub extracted: bool,
    pub transformed: bool,
}

impl ManifestRow {
    fn fields(&self) -> [&str; 5] {
        let flag = |set: bool| if set { "X" } else { "" };
        [
            self.path.as_str(),
            self.parent.as_str(),
            self.unit.as_str(),
            flag(self.extracted),
            flag(self.transformed),
        ]
    }
}

/// Append-only CSV record of every entry visited by a walk. Every field is
/// wrapped in double quotes, embedded quotes are doubled.
pub struct ManifestWriter<W: Write> {
    path: Option<PathBuf>,
    writer: W,
    rows: Vec<ManifestRow>,
}

impl ManifestWriter<LineWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Creating manifest");
        let mut writer = Self::new(LineWriter::new(File::create(path)?))?;
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(mut writer: W) -> std::io::Result<Self> {
        write_record(&mut writer, HEADER)?;
        Ok(Self {
            path: None,
            writer,
            rows: Vec::new(),
        })
    }

    pub fn append(&mut self, row: ManifestRow) -> std::io::Result<()> {
        write_record(&mut self.writer, row.fields())?;
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finish(mut self) -> std::io::Result<(W, Vec<ManifestRow>)> {
        self.writer.flush()?;
        Ok((self.writer, self.rows))
    }
}

impl<W: Write> Display for ManifestWriter<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({} rows)", path.display(), self.rows.len()),
            None => write!(f, "<memory> ({} rows)", self.rows.len()),
        }
    }
}

fn write_record(writer: &mut impl Write, fields: [&str; 5]) -> std::io::Result<()> {
    let mut line = String::with_capacity(fields.iter().map(|f| f.len() + 3).sum::<usize>() + 2);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push('"');
        line.push_str(&field.replace('"', "\"\""));
        line.push('"');
    }
    line.push_str(LINE_ENDING);
    writer.write_all(line.as_bytes())
}
