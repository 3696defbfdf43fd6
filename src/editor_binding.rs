/// Opaque marker for the mounted editing widget. A new value means the widget
/// has to be rebuilt from scratch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Generation(u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentUpdate {
    /// Content set from outside the widget (load, assistant reply).
    Replace(String),
    /// Content the widget itself reported after a user edit.
    Patch(String),
}

/// Scratch content of the open entry, kept in step with the widget.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorBinding {
    content: String,
    generation: Generation,
}

impl EditorBinding {
    /// Applies `update` and reports whether the widget must be remounted.
    pub fn apply(&mut self, update: ContentUpdate) -> bool {
        match update {
            ContentUpdate::Replace(content) => {
                self.content = content;
                self.generation.0 += 1;
                true
            }
            ContentUpdate::Patch(content) => {
                self.content = content;
                false
            }
        }
    }

    pub fn replace(&mut self, content: impl Into<String>) {
        self.apply(ContentUpdate::Replace(content.into()));
    }

    pub fn patch(&mut self, content: impl Into<String>) {
        self.apply(ContentUpdate::Patch(content.into()));
    }

    pub fn append_line(&mut self, text: &str) {
        let next = format!("{}\n{}", self.content, text);
        self.replace(next);
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}
