use crate::EntryDetails;

/// Keeps track of the containers currently being walked, from the root archive
/// down to the innermost nested container.
#[derive(Debug, Default)]
pub struct ArchiveStack {
    stack: smallvec::SmallVec<[EntryDetails; 6]>,
}

impl ArchiveStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_entry(&self) -> Option<&EntryDetails> {
        self.stack.last()
    }

    pub fn push_details(&mut self, details: EntryDetails) {
        self.stack.push(details);
    }

    pub fn pop_details(&mut self) -> Option<EntryDetails> {
        self.stack.pop()
    }

    /// Number of containers nested below the root. Entries of the root archive
    /// are at depth 0.
    pub fn current_depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Label of the innermost open container, used as the parent of its entries.
    pub fn current_label(&self) -> &str {
        self.stack.last().map(|d| d.path.as_str()).unwrap_or("")
    }

    pub fn root_label(&self) -> &str {
        self.stack.first().map(|d| d.path.as_str()).unwrap_or("")
    }

    /// Human readable location of `name` inside the current container chain,
    /// e.g. `app.war > WEB-INF/lib/core.jar > a/b/C.class`.
    pub fn full_path(&self, name: &str) -> String {
        let mut out = String::new();
        for details in self.stack.iter() {
            out.push_str(&details.path);
            out.push_str(" > ");
        }
        out.push_str(name);
        out
    }
}
