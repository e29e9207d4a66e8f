use indexmap::IndexMap;

use crate::alert::{self, AlertQueue};
use crate::remote::{Note, NoteDraft, NotesApi, Tag};

/// Result of a successful save, handed to the list so it can reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub note: Note,
    pub created: bool,
}

/// The in-progress note: form fields plus the resolved tag set.
///
/// Tags only enter the set once the service has confirmed their id.
#[derive(Debug, Default)]
pub struct NoteEditorController {
    selected: Option<Note>,
    title: String,
    content: String,
    tag_input: String,
    tags: IndexMap<String, Tag>,
    loading: bool,
    alerts: AlertQueue,
}

impl NoteEditorController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a note into the form, or resets every field when `None`.
    pub fn select(&mut self, note: Option<&Note>) {
        self.tag_input.clear();
        self.tags.clear();
        match note {
            Some(note) => {
                self.title = note.title.clone();
                self.content = note.content.clone();
                self.tags.extend(
                    note.tags
                        .iter()
                        .map(|tag| (tag.id.clone(), tag.clone())),
                );
                self.selected = Some(note.clone());
            }
            None => {
                self.title.clear();
                self.content.clear();
                self.selected = None;
            }
        }
    }

    /// Swaps in a newer copy of the selected note without touching the form.
    pub fn refresh_selected(&mut self, note: &Note) -> bool {
        match self.selected.as_mut() {
            Some(selected) if selected.id == note.id => {
                *selected = note.clone();
                true
            }
            _ => false,
        }
    }

    pub fn selected(&self) -> Option<&Note> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|note| note.id.as_str())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn tag_input(&self) -> &str {
        &self.tag_input
    }

    pub fn set_tag_input(&mut self, input: impl Into<String>) {
        self.tag_input = input.into();
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Resolves the tag input to a server tag, reusing the first exact-name
    /// match or creating one, then clears the input.
    pub fn add_tag(&mut self, api: &dyn NotesApi) -> Option<Tag> {
        let name = self.tag_input.trim().to_string();
        if name.is_empty() {
            return None;
        }

        self.loading = true;
        let resolved = api.find_tags(&name).and_then(|found| match found.into_iter().next() {
            Some(existing) => {
                tracing::debug!(tag_id = %existing.id, %name, "reusing existing tag");
                Ok(existing)
            }
            None => {
                tracing::debug!(%name, "creating tag");
                api.create_tag(&name)
            }
        });
        self.loading = false;

        match resolved {
            Ok(tag) => {
                self.tags.entry(tag.id.clone()).or_insert_with(|| tag.clone());
                self.tag_input.clear();
                Some(tag)
            }
            Err(err) => {
                tracing::error!(%err, %name, "failed to add tag");
                self.alerts.push(alert::TAG_FAILED);
                None
            }
        }
    }

    /// Local only. The service sees the smaller set on the next save.
    pub fn remove_tag(&mut self, id: &str) -> Option<Tag> {
        self.tags.shift_remove(id)
    }

    pub fn remove_last_tag(&mut self) -> Option<Tag> {
        self.tags.pop().map(|(_, tag)| tag)
    }

    pub fn can_save(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    /// Creates when nothing is selected, updates otherwise. The form is
    /// cleared only after a create; failures leave it populated.
    pub fn save(&mut self, api: &dyn NotesApi) -> Option<SaveOutcome> {
        if !self.can_save() {
            tracing::debug!("save skipped, title or content blank");
            return None;
        }

        let draft = NoteDraft {
            title: self.title.clone(),
            content: self.content.clone(),
            tags: self.tags.values().cloned().collect(),
        };

        self.loading = true;
        let result = match self.selected_id() {
            Some(id) => api.update_note(id, &draft).map(|note| (note, false)),
            None => api.create_note(&draft).map(|note| (note, true)),
        };
        self.loading = false;

        match result {
            Ok((note, created)) => {
                tracing::info!(note_id = %note.id, created, "note saved");
                if created {
                    self.select(None);
                } else {
                    self.select(Some(&note));
                }
                Some(SaveOutcome { note, created })
            }
            Err(err) => {
                tracing::error!(%err, "failed to save note");
                self.alerts.push(alert::ACTION_FAILED);
                None
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn mode_label(&self) -> &'static str {
        if self.selected.is_some() {
            "Update Note"
        } else {
            "Save Note"
        }
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        self.alerts.drain()
    }
}
