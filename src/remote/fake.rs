use std::collections::HashSet;

use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};

use super::{ApiError, ApiResult, Credentials, Note, NoteDraft, NotesApi, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListNotes,
    SearchNotes(String),
    CreateNote(NoteDraft),
    UpdateNote(String, NoteDraft),
    DeleteNote(String),
    ArchiveNote(String),
    UnarchiveNote(String),
    FindTags(String),
    CreateTag(String),
    Login(String),
}

#[derive(Default)]
struct FakeState {
    notes: Vec<Note>,
    tags: Vec<Tag>,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    accounts: Vec<(String, String)>,
    next_id: u64,
    echo_previous_on_update: bool,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

pub fn epoch() -> OffsetDateTime {
    time::macros::datetime!(2024-01-01 0:00 UTC)
}

pub fn note(id: &str, title: &str, archived: bool, updated_offset_secs: i64) -> Note {
    Note {
        id: id.to_string(),
        title: title.to_string(),
        content: format!("{title} body"),
        tags: Vec::new(),
        archived,
        created_at: epoch(),
        updated_at: epoch() + Duration::seconds(updated_offset_secs),
    }
}

impl FakeApi {
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let api = Self::default();
        api.state.lock().notes = notes;
        api
    }

    pub fn add_tag(&self, tag: Tag) {
        self.state.lock().tags.push(tag);
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.state
            .lock()
            .accounts
            .push((email.to_string(), password.to_string()));
    }

    /// Makes every call to the named endpoint fail with a 500.
    pub fn fail(&self, endpoint: &'static str) {
        self.state.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.state.lock().failing.remove(endpoint);
    }

    /// Update responses carry the revision before the change, as a lagging
    /// replica would; the stored note is still updated.
    pub fn echo_previous_on_update(&self) {
        self.state.lock().echo_previous_on_update = true;
    }

    pub fn set_notes(&self, notes: Vec<Note>) {
        self.state.lock().notes = notes;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call, endpoint: &'static str) -> ApiResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.failing.contains(endpoint) {
            return Err(ApiError::Status {
                endpoint,
                status: 500,
            });
        }
        Ok(())
    }

    fn next_id(state: &mut FakeState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }
}

impl NotesApi for FakeApi {
    fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.record(Call::ListNotes, "list-notes")?;
        Ok(self.state.lock().notes.clone())
    }

    fn search_notes(&self, query: &str) -> ApiResult<Vec<Note>> {
        self.record(Call::SearchNotes(query.to_string()), "search-notes")?;
        let needle = query.to_lowercase();
        Ok(self
            .state
            .lock()
            .notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
                    || note
                        .tags
                        .iter()
                        .any(|tag| tag.name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    fn create_note(&self, draft: &NoteDraft) -> ApiResult<Note> {
        self.record(Call::CreateNote(draft.clone()), "create-note")?;
        let mut state = self.state.lock();
        let id = Self::next_id(&mut state, "note");
        let stamp = epoch() + Duration::hours(state.next_id as i64);
        let note = Note {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            tags: draft.tags.clone(),
            archived: false,
            created_at: stamp,
            updated_at: stamp,
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    fn update_note(&self, id: &str, draft: &NoteDraft) -> ApiResult<Note> {
        self.record(Call::UpdateNote(id.to_string(), draft.clone()), "update-note")?;
        let mut state = self.state.lock();
        let echo_previous = state.echo_previous_on_update;
        let Some(note) = state.notes.iter_mut().find(|note| note.id == id) else {
            return Err(ApiError::Status {
                endpoint: "update-note",
                status: 404,
            });
        };
        let previous = note.clone();
        note.title = draft.title.clone();
        note.content = draft.content.clone();
        note.tags = draft.tags.clone();
        note.updated_at += Duration::minutes(1);
        Ok(if echo_previous { previous } else { note.clone() })
    }

    fn delete_note(&self, id: &str) -> ApiResult<()> {
        self.record(Call::DeleteNote(id.to_string()), "delete-note")?;
        self.state.lock().notes.retain(|note| note.id != id);
        Ok(())
    }

    fn archive_note(&self, id: &str) -> ApiResult<()> {
        self.record(Call::ArchiveNote(id.to_string()), "archive-note")?;
        if let Some(note) = self.state.lock().notes.iter_mut().find(|note| note.id == id) {
            note.archived = true;
        }
        Ok(())
    }

    fn unarchive_note(&self, id: &str) -> ApiResult<()> {
        self.record(Call::UnarchiveNote(id.to_string()), "unarchive-note")?;
        if let Some(note) = self.state.lock().notes.iter_mut().find(|note| note.id == id) {
            note.archived = false;
        }
        Ok(())
    }

    fn find_tags(&self, name: &str) -> ApiResult<Vec<Tag>> {
        self.record(Call::FindTags(name.to_string()), "find-tags")?;
        Ok(self
            .state
            .lock()
            .tags
            .iter()
            .filter(|tag| tag.name == name)
            .cloned()
            .collect())
    }

    fn create_tag(&self, name: &str) -> ApiResult<Tag> {
        self.record(Call::CreateTag(name.to_string()), "create-tag")?;
        let mut state = self.state.lock();
        let id = Self::next_id(&mut state, "tag");
        let tag = Tag::new(id, name);
        state.tags.push(tag.clone());
        Ok(tag)
    }

    fn login(&self, credentials: &Credentials) -> ApiResult<serde_json::Value> {
        self.record(Call::Login(credentials.email.clone()), "login")?;
        let state = self.state.lock();
        let known = state
            .accounts
            .iter()
            .any(|(email, password)| *email == credentials.email && *password == credentials.password);
        if !known {
            return Err(ApiError::Status {
                endpoint: "login",
                status: 401,
            });
        }
        Ok(serde_json::json!({ "user": { "email": credentials.email } }))
    }
}
