//! Seen-identifier index.

use std::collections::HashSet;

use crate::models::RawFragment;
use crate::services::RowExtractor;

/// Identifiers already captured during this collection.
///
/// Rebuilt from the batch store at startup and never persisted itself.
#[derive(Debug, Default)]
pub struct SeenIndex {
    ids: HashSet<String>,
}

impl SeenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from every identifier found in persisted fragments.
    pub fn rebuild(fragments: &[RawFragment], extractor: &RowExtractor) -> Self {
        let ids = fragments
            .iter()
            .flat_map(|f| extractor.identifiers(&f.html_content))
            .collect();
        Self { ids }
    }

    /// Record `id`. Returns `true` when it was not seen before.
    pub fn register(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
