use std::collections::BTreeSet;

use crate::data::RowId;

/// Rows picked for the next batch send.
///
/// Identifiers are not checked against the dataset; the session clears the
/// tracker whenever it loads new rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    ids: BTreeSet<RowId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the identifier was not already selected.
    pub fn add(&mut self, id: RowId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &RowId) -> bool {
        self.ids.remove(id)
    }

    /// Flips the identifier and returns whether it is now selected.
    pub fn toggle(&mut self, id: RowId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn has(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Adds every identifier of the given view.
    pub fn select_all<I>(&mut self, view: I)
    where
        I: IntoIterator<Item = RowId>,
    {
        self.ids.extend(view);
    }

    pub fn deselect_all(&mut self) {
        self.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_are_idempotent() {
        let mut selection = SelectionTracker::new();
        let id = RowId::Order("10".into());
        assert!(selection.add(id.clone()));
        assert!(!selection.add(id.clone()));
        assert_eq!(selection.size(), 1);
        assert!(selection.remove(&id));
        assert!(!selection.remove(&id));
        assert!(selection.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = SelectionTracker::new();
        assert!(selection.toggle(RowId::Position(0)));
        assert!(!selection.toggle(RowId::Position(0)));
        assert_eq!(selection.size(), 0);
    }
}
