use crate::transform::UnitSource;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use tracing::debug;

/// Class payloads held in memory between the walk and dispatch, keyed by
/// logical name. A later entry with the same name replaces the earlier one.
#[derive(Debug, Default)]
pub struct StagingStore {
    units: RwLock<HashMap<String, Bytes>>,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload that was replaced, if any.
    pub fn stage(&self, name: impl Into<String>, payload: impl Into<Bytes>) -> Option<Bytes> {
        let name = name.into();
        let previous = self.units.write().insert(name.clone(), payload.into());
        if previous.is_some() {
            debug!(%name, "Replaced previously staged class");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.units.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.read().contains_key(name)
    }

    /// Staged names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.units.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.units.read().values().map(|b| b.len() as u64).sum()
    }

    /// Drops every staged payload at once. Returns how many were released.
    pub fn clear(&self) -> usize {
        let mut units = self.units.write();
        let released = units.len();
        *units = HashMap::new();
        released
    }
}

impl UnitSource for StagingStore {
    fn unit_bytes(&self, name: &str) -> std::io::Result<Bytes> {
        self.get(name).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Class not found: {name}"),
            )
        })
    }
}

impl Display for StagingStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StagingStore(units={}, bytes={})",
            self.len(),
            indicatif::DecimalBytes(self.total_bytes())
        )
    }
}
