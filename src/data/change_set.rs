use std::collections::HashSet;
use std::path::PathBuf;

/// Paths reported together by one watch callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub modified: Vec<PathBuf>,
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Modified and added paths, de-duplicated in first-seen order.
    /// Removals are never candidates for generation.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.modified
            .iter()
            .chain(self.added.iter())
            .filter(|path| seen.insert((*path).clone()))
            .cloned()
            .collect()
    }
}
