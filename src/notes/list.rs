use std::cmp::Ordering;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::alert::{self, AlertQueue};
use crate::config::{ListOptions, SearchOptions};
use crate::remote::{Note, NotesApi};
use crate::search::{SearchDebouncer, SearchReply, SearchSequencer, SearchTicket};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortKey {
    /// Most recently updated first.
    #[default]
    Date,
    /// Alphabetical, case folded.
    Title,
}

impl SortKey {
    pub fn toggled(self) -> Self {
        match self {
            SortKey::Date => SortKey::Title,
            SortKey::Title => SortKey::Date,
        }
    }
}

/// Owns the cached note collection and the view settings applied over it.
///
/// The remote service is the source of truth: every mutation is followed by
/// a full re-fetch, whatever the mutation's outcome.
#[derive(Debug)]
pub struct NoteListController {
    cache: Vec<Note>,
    show_archived: bool,
    sort: SortKey,
    preview_chars: usize,
    debouncer: SearchDebouncer,
    sequencer: SearchSequencer,
    loading: bool,
    alerts: AlertQueue,
}

impl NoteListController {
    pub fn new(list: &ListOptions, search: &SearchOptions) -> Self {
        Self {
            cache: Vec::new(),
            show_archived: list.show_archived,
            sort: list.default_sort,
            preview_chars: list.preview_chars,
            debouncer: SearchDebouncer::new(search.debounce),
            sequencer: SearchSequencer::default(),
            loading: false,
            alerts: AlertQueue::default(),
        }
    }

    /// Replaces the cache wholesale. On failure the previous cache is kept.
    pub fn fetch_all(&mut self, api: &dyn NotesApi) -> bool {
        self.loading = true;
        let result = api.list_notes();
        self.loading = false;
        match result {
            Ok(notes) => {
                tracing::debug!(count = notes.len(), "fetched notes");
                self.cache = notes;
                true
            }
            Err(err) => {
                tracing::error!(%err, "failed to fetch notes");
                self.alerts.push(alert::FETCH_FAILED);
                false
            }
        }
    }

    /// Immediate server-side search. Blank queries issue no request.
    pub fn search(&mut self, api: &dyn NotesApi, query: &str) -> bool {
        if query.trim().is_empty() {
            return false;
        }
        let ticket = self.sequencer.issue(query);
        self.loading = true;
        let reply = ticket.execute(api);
        self.loading = false;
        match reply {
            Some(reply) => self.apply_search_reply(reply),
            None => false,
        }
    }

    /// Records a keystroke-level change of the search box. Nothing is sent
    /// until [`poll_search`](Self::poll_search) observes an idle interval.
    pub fn search_input(&mut self, query: &str, now: Instant) {
        self.debouncer.update(query, now);
        if query.trim().is_empty() {
            self.sequencer.cancel_pending();
            self.loading = false;
        }
    }

    pub fn poll_search(&mut self, now: Instant) -> Option<SearchTicket> {
        let query = self.debouncer.poll(now)?;
        if query.trim().is_empty() {
            return None;
        }
        tracing::debug!(%query, "debounced search ready");
        self.loading = true;
        Some(self.sequencer.issue(&query))
    }

    /// Applies a search reply if it answers the most recent request.
    pub fn apply_search_reply(&mut self, reply: SearchReply) -> bool {
        if !self.sequencer.accepts(&reply) {
            tracing::debug!(
                seq = reply.seq,
                latest = self.sequencer.latest_seq(),
                "discarding stale search reply"
            );
            if !self.sequencer.is_outstanding() {
                self.loading = false;
            }
            return false;
        }
        self.loading = false;
        match reply.result {
            Ok(notes) => {
                tracing::debug!(query = %reply.query, count = notes.len(), "search results applied");
                self.cache = notes;
                true
            }
            Err(err) => {
                tracing::error!(%err, query = %reply.query, "search failed");
                self.alerts.push(alert::ACTION_FAILED);
                false
            }
        }
    }

    pub fn cancel_searches(&mut self) {
        self.sequencer.cancel_pending();
        self.debouncer.clear();
        self.loading = false;
    }

    pub fn query(&self) -> &str {
        self.debouncer.query()
    }

    pub fn search_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn set_archived_filter(&mut self, archived: bool) {
        self.show_archived = archived;
    }

    pub fn toggle_archived_filter(&mut self) -> bool {
        self.show_archived = !self.show_archived;
        self.show_archived
    }

    pub fn show_archived(&self) -> bool {
        self.show_archived
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn archive(&mut self, api: &dyn NotesApi, id: &str) {
        self.loading = true;
        if let Err(err) = api.archive_note(id) {
            tracing::error!(%err, note_id = id, "failed to archive note");
            self.alerts.push(alert::ACTION_FAILED);
        }
        self.fetch_all(api);
    }

    pub fn unarchive(&mut self, api: &dyn NotesApi, id: &str) {
        self.loading = true;
        if let Err(err) = api.unarchive_note(id) {
            tracing::error!(%err, note_id = id, "failed to unarchive note");
            self.alerts.push(alert::ACTION_FAILED);
        }
        self.fetch_all(api);
    }

    /// Archives an active note or restores an archived one, judged by the
    /// cached copy. Unknown ids are ignored.
    pub fn archive_toggle(&mut self, api: &dyn NotesApi, id: &str) -> Option<bool> {
        let archived = self.find(id)?.archived;
        if archived {
            self.unarchive(api, id);
        } else {
            self.archive(api, id);
        }
        Some(!archived)
    }

    pub fn delete(&mut self, api: &dyn NotesApi, id: &str) {
        self.loading = true;
        if let Err(err) = api.delete_note(id) {
            tracing::error!(%err, note_id = id, "failed to delete note");
            self.alerts.push(alert::ACTION_FAILED);
        }
        self.fetch_all(api);
    }

    /// Patches the cache with a freshly saved note ahead of the re-fetch.
    pub fn note_saved(&mut self, note: &Note) {
        match self.cache.iter_mut().find(|cached| cached.id == note.id) {
            Some(cached) => *cached = note.clone(),
            None => self.cache.push(note.clone()),
        }
    }

    pub fn find(&self, id: &str) -> Option<&Note> {
        self.cache.iter().find(|note| note.id == id)
    }

    pub fn cached(&self) -> &[Note] {
        &self.cache
    }

    /// Visible notes: the cache filtered by archive state, then sorted.
    pub fn notes(&self) -> Vec<&Note> {
        let mut visible: Vec<&Note> = self
            .cache
            .iter()
            .filter(|note| note.archived == self.show_archived)
            .collect();
        match self.sort {
            SortKey::Date => visible.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
            SortKey::Title => visible.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        }
        visible
    }

    pub fn empty_message(&self) -> String {
        let query = self.query();
        if !query.trim().is_empty() {
            return format!("No results found for \"{query}\".");
        }
        if self.show_archived {
            "No archived notes.".to_string()
        } else {
            "No notes yet. Press `n` to write one.".to_string()
        }
    }

    pub fn preview(&self, note: &Note) -> String {
        preview(&note.content, self.preview_chars)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        self.alerts.drain()
    }
}

/// Case-folded comparison; on a tie lowercase sorts before uppercase.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let folded = |text: &str| text.chars().flat_map(char::to_lowercase).collect::<String>();
    folded(a).cmp(&folded(b)).then_with(|| b.cmp(a))
}

pub fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::remote::fake::{note, Call, FakeApi};

    fn controller() -> NoteListController {
        NoteListController::new(&ListOptions::default(), &SearchOptions::default())
    }

    fn loaded(api: &FakeApi) -> NoteListController {
        let mut list = controller();
        assert!(list.fetch_all(api));
        api.clear_calls();
        list
    }

    fn ids(list: &NoteListController) -> Vec<String> {
        list.notes().iter().map(|note| note.id.clone()).collect()
    }

    #[test]
    fn archive_filter_partitions_the_cache() {
        let api = FakeApi::with_notes(vec![
            note("1", "A", false, 10),
            note("2", "B", true, 20),
            note("3", "C", false, 30),
            note("4", "D", true, 40),
        ]);
        let mut list = loaded(&api);

        list.set_archived_filter(false);
        let active = ids(&list);
        assert!(list.notes().iter().all(|note| !note.archived));

        list.set_archived_filter(true);
        let archived = ids(&list);
        assert!(list.notes().iter().all(|note| note.archived));

        assert!(active.iter().all(|id| !archived.contains(id)));
        assert_eq!(active.len() + archived.len(), list.cached().len());
    }

    #[test]
    fn toggling_filter_switches_between_active_and_archived() {
        let api = FakeApi::with_notes(vec![note("1", "A", false, 1), note("2", "B", true, 2)]);
        let mut list = loaded(&api);
        list.set_archived_filter(false);
        assert_eq!(ids(&list), vec!["1"]);
        assert!(list.toggle_archived_filter());
        assert_eq!(ids(&list), vec!["2"]);
    }

    #[test]
    fn date_sort_is_newest_first_and_stable() {
        let api = FakeApi::with_notes(vec![
            note("old", "x", false, 1),
            note("tie-a", "y", false, 5),
            note("new", "z", false, 9),
            note("tie-b", "w", false, 5),
        ]);
        let list = loaded(&api);
        assert_eq!(ids(&list), vec!["new", "tie-a", "tie-b", "old"]);
        let stamps: Vec<_> = list.notes().iter().map(|note| note.updated_at).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn title_sort_is_case_folded_ascending() {
        let api = FakeApi::with_notes(vec![
            note("1", "banana", false, 0),
            note("2", "Apple", false, 0),
            note("3", "cherry", false, 0),
            note("4", "apple", false, 0),
        ]);
        let mut list = loaded(&api);
        list.set_sort(SortKey::Title);
        let titles: Vec<_> = list.notes().iter().map(|note| note.title.clone()).collect();
        assert_eq!(titles, vec!["apple", "Apple", "banana", "cherry"]);
    }

    #[test]
    fn failed_fetch_keeps_previous_cache_and_alerts() {
        let api = FakeApi::with_notes(vec![note("1", "A", false, 0)]);
        let mut list = loaded(&api);
        api.fail("list-notes");
        assert!(!list.fetch_all(&api));
        assert_eq!(list.cached().len(), 1);
        assert_eq!(list.take_alerts(), vec![alert::FETCH_FAILED.to_string()]);
        assert!(!list.is_loading());
    }

    #[test]
    fn blank_search_issues_no_request() {
        let api = FakeApi::with_notes(vec![note("1", "A", false, 0)]);
        let mut list = loaded(&api);
        assert!(!list.search(&api, ""));
        assert!(!list.search(&api, "   "));
        assert!(api.calls().is_empty());
        assert_eq!(list.cached().len(), 1);
    }

    #[test]
    fn debounced_search_sends_one_request_after_idle() {
        let api = FakeApi::with_notes(vec![note("1", "todo", false, 0), note("2", "misc", false, 0)]);
        let mut list = loaded(&api);
        let start = Instant::now();
        for (offset, text) in ["t", "to", "tod", "todo"].iter().enumerate() {
            list.search_input(text, start + Duration::from_millis(offset as u64 * 50));
        }
        assert!(list.poll_search(start + Duration::from_millis(400)).is_none());
        let ticket = list
            .poll_search(start + Duration::from_millis(700))
            .expect("ticket after idle interval");
        let reply = ticket.execute(&api).expect("not cancelled");
        assert!(list.apply_search_reply(reply));
        assert!(list.poll_search(start + Duration::from_secs(3)).is_none());
        assert_eq!(api.calls(), vec![Call::SearchNotes("todo".into())]);
        assert_eq!(ids(&list), vec!["1"]);
    }

    #[test]
    fn out_of_order_reply_does_not_overwrite_newer_results() {
        let api = FakeApi::with_notes(vec![note("1", "todo", false, 0), note("2", "today", false, 0)]);
        let mut list = loaded(&api);
        let start = Instant::now();
        list.search_input("to", start);
        let older = list.poll_search(start + Duration::from_secs(1)).expect("older");
        list.search_input("todo", start + Duration::from_secs(2));
        let newer = list.poll_search(start + Duration::from_secs(3)).expect("newer");

        assert!(older.execute(&api).is_none(), "superseded ticket is cancelled");
        let newer_reply = newer.execute(&api).expect("newer runs");
        assert!(list.apply_search_reply(newer_reply));
        assert_eq!(ids(&list), vec!["1"]);
    }

    #[test]
    fn clearing_the_box_cancels_pending_search() {
        let api = FakeApi::default();
        let mut list = controller();
        let start = Instant::now();
        list.search_input("todo", start);
        let ticket = list.poll_search(start + Duration::from_secs(1)).expect("ticket");
        list.search_input("", start + Duration::from_secs(1));
        assert!(ticket.execute(&api).is_none());
        assert!(list.poll_search(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn clearing_the_box_drops_the_busy_flag() {
        let api = FakeApi::with_notes(vec![note("1", "todo", false, 0)]);
        let mut list = loaded(&api);
        let start = Instant::now();
        list.search_input("todo", start);
        let ticket = list.poll_search(start + Duration::from_secs(1)).expect("ticket");
        let in_flight = ticket.clone();
        assert!(list.is_loading());

        list.search_input("", start + Duration::from_secs(2));
        assert!(!list.is_loading());

        // The request was already on the wire when the box was cleared.
        let reply = SearchReply {
            seq: in_flight.seq,
            query: in_flight.query,
            token: in_flight.token,
            result: Ok(Vec::new()),
        };
        assert!(!list.apply_search_reply(reply));
        assert!(!list.is_loading());
        assert_eq!(list.cached().len(), 1);
        assert!(ticket.execute(&api).is_none());
    }

    #[test]
    fn archive_refetches_even_when_request_fails() {
        let api = FakeApi::with_notes(vec![note("1", "A", false, 0)]);
        let mut list = loaded(&api);
        api.fail("archive-note");
        list.archive(&api, "1");
        assert_eq!(
            api.calls(),
            vec![Call::ArchiveNote("1".into()), Call::ListNotes]
        );
        assert_eq!(list.take_alerts(), vec![alert::ACTION_FAILED.to_string()]);

        api.recover("archive-note");
        api.clear_calls();
        list.archive(&api, "1");
        assert_eq!(
            api.calls(),
            vec![Call::ArchiveNote("1".into()), Call::ListNotes]
        );
        assert!(list.find("1").expect("still cached").archived);
    }

    #[test]
    fn archive_toggle_picks_direction_from_cache() {
        let api = FakeApi::with_notes(vec![note("1", "A", true, 0)]);
        let mut list = loaded(&api);
        assert_eq!(list.archive_toggle(&api, "1"), Some(false));
        assert_eq!(
            api.calls(),
            vec![Call::UnarchiveNote("1".into()), Call::ListNotes]
        );
        assert_eq!(list.archive_toggle(&api, "missing"), None);
    }

    #[test]
    fn delete_refetches_and_drops_the_note() {
        let api = FakeApi::with_notes(vec![note("1", "A", false, 0), note("2", "B", false, 0)]);
        let mut list = loaded(&api);
        list.delete(&api, "1");
        assert_eq!(api.calls(), vec![Call::DeleteNote("1".into()), Call::ListNotes]);
        assert!(list.find("1").is_none());
    }

    #[test]
    fn empty_message_mentions_active_query() {
        let mut list = controller();
        list.search_input("zzz", Instant::now());
        assert_eq!(list.empty_message(), "No results found for \"zzz\".");
    }

    #[test]
    fn preview_truncates_long_content() {
        let long = "x".repeat(60);
        assert_eq!(preview(&long, 50), format!("{}...", "x".repeat(50)));
        assert_eq!(preview("short", 50), "short");
    }

    #[test]
    fn sort_key_parses_case_insensitively() {
        assert_eq!("Title".parse::<SortKey>().ok(), Some(SortKey::Title));
        assert_eq!(SortKey::Date.to_string(), "date");
        assert_eq!(SortKey::Date.toggled(), SortKey::Title);
    }
}
