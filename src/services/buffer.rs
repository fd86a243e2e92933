//! Fragments waiting for the next flush.

use crate::models::RawFragment;

/// Append-only buffer of fragments discovered since the last flush.
#[derive(Debug)]
pub struct BatchBuffer {
    fragments: Vec<RawFragment>,
    threshold: usize,
}

impl BatchBuffer {
    /// Create a buffer that reports full at `threshold` fragments.
    pub fn new(threshold: usize) -> Self {
        Self {
            fragments: Vec::new(),
            threshold: threshold.max(1),
        }
    }

    pub fn push(&mut self, fragment: RawFragment) {
        self.fragments.push(fragment);
    }

    pub fn is_full(&self) -> bool {
        self.fragments.len() >= self.threshold
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[RawFragment] {
        &self.fragments
    }

    /// Remove and return every buffered fragment.
    ///
    /// Call only once the content has been durably flushed.
    pub fn take(&mut self) -> Vec<RawFragment> {
        std::mem::take(&mut self.fragments)
    }
}
