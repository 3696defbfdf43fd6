use crate::editor_binding::{EditorBinding, Generation};
use crate::entry_store::{Entry, EntryId, EntryStore, StoreError};
use crate::export::export_filename;

/// Application state behind the UI shell: saved entries, the scratch title
/// and the editor binding for the open entry.
#[derive(Clone, Debug, Default)]
pub struct Notebook {
    store: EntryStore,
    title: String,
    editor: EditorBinding,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_entry(&mut self) -> EntryId {
        let entry = self.store.create_entry();
        self.title = entry.title;
        self.editor.replace(entry.content);
        entry.id
    }

    pub fn save(&mut self) {
        self.store.save_current(&self.title, self.editor.content());
    }

    pub fn load(&mut self, id: EntryId) -> Result<(), StoreError> {
        let entry = self.store.load_entry(id)?;
        self.title = entry.title.clone();
        let content = entry.content.clone();
        self.editor.replace(content);
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn edit_content(&mut self, content: impl Into<String>) {
        self.editor.patch(content);
    }

    pub fn append_reply(&mut self, reply: &str) {
        self.editor.append_line(reply);
    }

    /// Filename and payload for exporting the scratch copy of the open entry.
    pub fn export_request(&self) -> (String, String) {
        (
            export_filename(&self.title),
            self.editor.content().to_string(),
        )
    }

    pub fn entries(&self) -> &[Entry] {
        self.store.list_entries()
    }

    pub fn current_id(&self) -> Option<EntryId> {
        self.store.current_id()
    }

    pub fn has_current(&self) -> bool {
        self.store.current_id().is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        self.editor.content()
    }

    pub fn generation(&self) -> Generation {
        self.editor.generation()
    }
}
