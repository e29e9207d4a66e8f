use crate::config::AppConfig;
use crate::notes::{NoteEditorController, NoteListController, SaveOutcome};
use crate::remote::{Note, NotesApi};

/// List and editor side by side. Each controller talks to the service on
/// its own; the dashboard only routes outcomes between them.
#[derive(Debug)]
pub struct Dashboard {
    pub list: NoteListController,
    pub editor: NoteEditorController,
}

impl Dashboard {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            list: NoteListController::new(&config.list, &config.search),
            editor: NoteEditorController::new(),
        }
    }

    /// Builds the dashboard and performs the initial fetch.
    pub fn open(config: &AppConfig, api: &dyn NotesApi) -> Self {
        let mut dashboard = Self::new(config);
        dashboard.list.fetch_all(api);
        dashboard
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.editor.selected_id()
    }

    /// Loads the cached note into the editor. Unknown ids are ignored.
    pub fn select(&mut self, id: &str) -> bool {
        let Some(note) = self.list.find(id) else {
            return false;
        };
        let note = note.clone();
        self.editor.select(Some(&note));
        true
    }

    pub fn clear_selection(&mut self) {
        self.editor.select(None);
    }

    pub fn save(&mut self, api: &dyn NotesApi) -> Option<SaveOutcome> {
        let outcome = self.editor.save(api)?;
        self.list.note_saved(&outcome.note);
        self.list.fetch_all(api);
        if !outcome.created {
            let note = self
                .list
                .find(&outcome.note.id)
                .cloned()
                .unwrap_or_else(|| outcome.note.clone());
            self.refresh_selection(&note);
        }
        Some(outcome)
    }

    pub fn archive_toggle(&mut self, api: &dyn NotesApi, id: &str) -> Option<bool> {
        let archived = self.list.archive_toggle(api, id)?;
        if let Some(note) = self.list.find(id) {
            let note = note.clone();
            self.editor.refresh_selected(&note);
        }
        Some(archived)
    }

    pub fn delete(&mut self, api: &dyn NotesApi, id: &str) {
        self.list.delete(api, id);
        if self.selected_id() == Some(id) && self.list.find(id).is_none() {
            self.clear_selection();
        }
    }

    pub fn visible(&self) -> Vec<&Note> {
        self.list.notes()
    }

    /// Alerts from both controllers, list first.
    pub fn drain_alerts(&mut self) -> Vec<String> {
        let mut alerts = self.list.take_alerts();
        alerts.extend(self.editor.take_alerts());
        alerts
    }

    pub fn is_busy(&self) -> bool {
        self.list.is_loading() || self.editor.is_loading()
    }

    pub fn teardown(mut self) {
        self.list.cancel_searches();
        tracing::debug!("dashboard closed");
    }

    // Keeps the selection pointing at the saved note without dropping edits
    // to the tag input.
    fn refresh_selection(&mut self, note: &Note) {
        let tag_input = self.editor.tag_input().to_string();
        self.editor.select(Some(note));
        self.editor.set_tag_input(tag_input);
    }
}
