use std::fmt;

/// Title given to new entries and to entries saved with a blank title.
pub const DEFAULT_TITLE: &str = "Untitled";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("entry {0} does not exist")]
    EntryNotFound(EntryId),
}

/// In-memory list of entries plus the identity of the one being edited.
///
/// Entries are kept in insertion order and are only ever mutated through
/// [`EntryStore::save_current`].
#[derive(Clone, Debug, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
    current: Option<EntryId>,
    next_id: u64,
}

impl EntryStore {
    pub fn create_entry(&mut self) -> Entry {
        self.next_id += 1;
        let entry = Entry {
            id: EntryId(self.next_id),
            title: DEFAULT_TITLE.to_string(),
            content: String::new(),
        };
        self.entries.push(entry.clone());
        self.current = Some(entry.id);
        entry
    }

    /// Copies `title` and `content` into the current entry. Does nothing when
    /// no entry is current.
    pub fn save_current(&mut self, title: &str, content: &str) {
        let Some(current) = self.current else {
            return;
        };
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == current) {
            entry.title = normalize_title(title);
            entry.content = content.to_string();
        }
    }

    pub fn load_entry(&mut self, id: EntryId) -> Result<&Entry, StoreError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(StoreError::EntryNotFound(id))?;
        self.current = Some(id);
        Ok(&self.entries[index])
    }

    pub fn list_entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn current_id(&self) -> Option<EntryId> {
        self.current
    }
}

fn normalize_title(title: &str) -> String {
    if title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn stored(store: &EntryStore, id: EntryId) -> &Entry {
        store.list_entries().iter().find(|entry| entry.id == id).unwrap()
    }

    #[test]
    fn created_ids_are_distinct() {
        let mut store = EntryStore::default();
        let ids: HashSet<_> = (0..50).map(|_| store.create_entry().id).collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(store.list_entries().len(), 50);
    }

    #[test]
    fn new_entry_becomes_current_with_defaults() {
        let mut store = EntryStore::default();
        let entry = store.create_entry();
        assert_eq!(entry.title, DEFAULT_TITLE);
        assert!(entry.content.is_empty());
        assert_eq!(store.current_id(), Some(entry.id));
    }

    #[test]
    fn save_without_current_entry_is_a_no_op() {
        let mut store = EntryStore::default();
        store.save_current("Title", "body");
        assert!(store.list_entries().is_empty());
        assert_eq!(store.current_id(), None);
    }

    #[test]
    fn save_defaults_blank_titles() {
        let mut store = EntryStore::default();
        let entry = store.create_entry();
        store.save_current("", "first");
        assert_eq!(stored(&store, entry.id).title, DEFAULT_TITLE);
        store.save_current("   ", "second");
        let saved = stored(&store, entry.id);
        assert_eq!(saved.title, DEFAULT_TITLE);
        assert_eq!(saved.content, "second");
    }

    #[test]
    fn save_only_touches_current_entry() {
        let mut store = EntryStore::default();
        let first = store.create_entry();
        let second = store.create_entry();
        store.save_current("Second", "two");

        assert_eq!(stored(&store, first.id), &first);
        let saved = stored(&store, second.id);
        assert_eq!(saved.title, "Second");
        assert_eq!(saved.content, "two");
    }

    #[test]
    fn load_switches_current_entry() {
        let mut store = EntryStore::default();
        let first = store.create_entry();
        store.save_current("One", "alpha");
        store.create_entry();

        let loaded = store.load_entry(first.id).unwrap();
        assert_eq!(loaded.title, "One");
        assert_eq!(loaded.content, "alpha");
        assert_eq!(store.current_id(), Some(first.id));
    }

    #[test]
    fn load_of_unknown_id_leaves_store_unchanged() {
        let mut store = EntryStore::default();
        let entry = store.create_entry();
        let before = store.list_entries().to_vec();

        let missing = EntryId(999);
        assert_eq!(
            store.load_entry(missing),
            Err(StoreError::EntryNotFound(missing))
        );
        assert_eq!(store.list_entries(), before.as_slice());
        assert_eq!(store.current_id(), Some(entry.id));
    }

    #[test]
    fn list_keeps_insertion_order() {
        let mut store = EntryStore::default();
        let ids: Vec<_> = (0..3).map(|_| store.create_entry().id).collect();
        let listed: Vec<_> = store.list_entries().iter().map(|e| e.id).collect();
        assert_eq!(listed, ids);
    }
}
