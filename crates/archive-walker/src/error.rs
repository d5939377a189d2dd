use std::path::PathBuf;
use zip::result::ZipError;

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("Failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    /// Reading an entry of the root archive by index failed.
    #[error("Failed to read entry #{index} of {archive}: {source}")]
    Entry {
        archive: String,
        index: usize,
        #[source]
        source: ZipError,
    },
    /// A nested container could not be opened or its stream broke while walking it.
    /// This aborts the walk.
    #[error("Failed to read nested container {path} in {parent}: {source}")]
    NestedContainer {
        path: String,
        parent: String,
        #[source]
        source: ZipError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
