//! Linear back/forward history.
//!
//! Browser-style: navigating after going back discards the forward tail.

/// Cursor over a list of previously visited targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory<T> {
    entries: Vec<T>,
    /// Index of the current entry; `None` iff `entries` is empty.
    position: Option<usize>,
}

impl<T> Default for NavigationHistory<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            position: None,
        }
    }
}

impl<T: Copy + PartialEq> NavigationHistory<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `target` as the new current entry.
    ///
    /// Returns `false` if `target` is already current.
    pub fn navigate(&mut self, target: T) -> bool {
        if self.current() == Some(target) {
            return false;
        }
        if let Some(position) = self.position {
            self.entries.truncate(position + 1);
        }
        self.entries.push(target);
        self.position = Some(self.entries.len() - 1);
        true
    }

    /// Step back one entry; no-op at the start.
    pub fn go_back(&mut self) -> Option<T> {
        let position = self.position.filter(|&position| position > 0)?;
        self.position = Some(position - 1);
        self.current()
    }

    /// Step forward one entry; no-op at the end.
    pub fn go_forward(&mut self) -> Option<T> {
        let position = self
            .position
            .filter(|&position| position + 1 < self.entries.len())?;
        self.position = Some(position + 1);
        self.current()
    }

    /// Remove the current entry; the cursor falls back to the previous one.
    pub fn close(&mut self) -> Option<T> {
        let position = self.position?;
        let removed = self.entries.remove(position);
        if self.entries.is_empty() {
            self.position = None;
            return Some(removed);
        }
        let position = position.saturating_sub(1);
        if position + 1 < self.entries.len() && self.entries[position] == self.entries[position + 1]
        {
            self.entries.remove(position + 1);
        }
        self.position = Some(position);
        Some(removed)
    }

    /// Purge every occurrence of `target`, merging neighbours that become
    /// adjacent duplicates.
    pub fn remove(&mut self, target: T) -> bool {
        let Some(position) = self.position else {
            return false;
        };
        if !self.entries.contains(&target) {
            return false;
        }
        let mut kept: Vec<T> = Vec::with_capacity(self.entries.len());
        let mut new_position = None;
        for (index, entry) in self.entries.drain(..).enumerate() {
            if entry != target && kept.last() != Some(&entry) {
                kept.push(entry);
            }
            if index <= position && !kept.is_empty() {
                new_position = Some(kept.len() - 1);
            }
        }
        if new_position.is_none() && !kept.is_empty() {
            new_position = Some(0);
        }
        self.entries = kept;
        self.position = new_position;
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.position.map(|position| self.entries[position])
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.position.is_some_and(|position| position > 0)
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.position
            .is_some_and(|position| position + 1 < self.entries.len())
    }

    #[must_use]
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.position
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
