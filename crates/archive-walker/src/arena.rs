//! Records of the nested containers opened during a walk.
//!
//! A nested container is buffered out of its parent's entry stream and opened
//! as an archive of its own. The arena keeps one record per opened container
//! for the whole walk; all of them are released together once the root
//! enumeration has finished. Growth is bounded by the number of containers in
//! the archive tree, not by the number of entries.

use crate::EntryDetails;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HandleId(usize);

#[derive(Debug, Clone)]
pub struct OpenHandle {
    pub details: EntryDetails,
    pub entries_read: usize,
    /// Size of the container's buffered bytes.
    pub buffered: usize,
}

#[derive(Debug, Default)]
pub struct HandleArena {
    handles: Vec<OpenHandle>,
    peak_depth: usize,
}

impl HandleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, details: EntryDetails, buffered: usize) -> HandleId {
        trace!(%details, buffered, "opening nested container");
        self.peak_depth = self.peak_depth.max(details.depth + 1);
        self.handles.push(OpenHandle {
            details,
            entries_read: 0,
            buffered,
        });
        HandleId(self.handles.len() - 1)
    }

    pub fn record_entry(&mut self, id: HandleId) {
        if let Some(handle) = self.handles.get_mut(id.0) {
            handle.entries_read += 1;
        }
    }

    pub fn get(&self, id: HandleId) -> Option<&OpenHandle> {
        self.handles.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }

    /// Releases every handle opened so far, innermost first. Returns how many
    /// were released.
    pub fn release_all(&mut self) -> usize {
        let released = self.handles.len();
        while let Some(handle) = self.handles.pop() {
            trace!(details=%handle.details, entries=handle.entries_read, "released nested container");
        }
        if released > 0 {
            debug!(released, peak_depth = self.peak_depth, "released nested containers");
        }
        released
    }
}
