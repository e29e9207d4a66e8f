use thiserror::Error;

mod http;
mod model;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpNotesApi;
pub use model::{Credentials, Note, NoteDraft, Tag};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{endpoint}: transport failure: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint}: server answered with status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("{endpoint}: malformed response: {message}")]
    Malformed {
        endpoint: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiError::Transport { endpoint, .. }
            | ApiError::Status { endpoint, .. }
            | ApiError::Malformed { endpoint, .. } => endpoint,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub trait NotesApi: Send + Sync {
    fn list_notes(&self) -> ApiResult<Vec<Note>>;

    fn search_notes(&self, query: &str) -> ApiResult<Vec<Note>>;

    fn create_note(&self, draft: &NoteDraft) -> ApiResult<Note>;

    fn update_note(&self, id: &str, draft: &NoteDraft) -> ApiResult<Note>;

    fn delete_note(&self, id: &str) -> ApiResult<()>;

    fn archive_note(&self, id: &str) -> ApiResult<()>;

    fn unarchive_note(&self, id: &str) -> ApiResult<()>;

    /// Exact-name lookup. An empty vector means no tag carries that name.
    fn find_tags(&self, name: &str) -> ApiResult<Vec<Tag>>;

    fn create_tag(&self, name: &str) -> ApiResult<Tag>;

    /// Returns the raw session payload; the client keeps nothing else.
    fn login(&self, credentials: &Credentials) -> ApiResult<serde_json::Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    ListNotes,
    SearchNotes { query: &'a str },
    CreateNote,
    UpdateNote { id: &'a str },
    DeleteNote { id: &'a str },
    ArchiveNote { id: &'a str },
    UnarchiveNote { id: &'a str },
    FindTags { name: &'a str },
    CreateTag,
    Login,
}

impl<'a> Endpoint<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::ListNotes => "list-notes",
            Endpoint::SearchNotes { .. } => "search-notes",
            Endpoint::CreateNote => "create-note",
            Endpoint::UpdateNote { .. } => "update-note",
            Endpoint::DeleteNote { .. } => "delete-note",
            Endpoint::ArchiveNote { .. } => "archive-note",
            Endpoint::UnarchiveNote { .. } => "unarchive-note",
            Endpoint::FindTags { .. } => "find-tags",
            Endpoint::CreateTag => "create-tag",
            Endpoint::Login => "login",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Endpoint::ListNotes | Endpoint::SearchNotes { .. } | Endpoint::FindTags { .. } => {
                Method::Get
            }
            Endpoint::CreateNote | Endpoint::CreateTag | Endpoint::Login => Method::Post,
            Endpoint::UpdateNote { .. } => Method::Put,
            Endpoint::ArchiveNote { .. } | Endpoint::UnarchiveNote { .. } => Method::Patch,
            Endpoint::DeleteNote { .. } => Method::Delete,
        }
    }

    /// Path relative to the service base URL, without the query string.
    pub fn path(&self) -> String {
        match self {
            Endpoint::ListNotes | Endpoint::CreateNote => "/notes".to_string(),
            Endpoint::SearchNotes { .. } => "/notes/search".to_string(),
            Endpoint::UpdateNote { id } | Endpoint::DeleteNote { id } => format!("/notes/{id}"),
            Endpoint::ArchiveNote { id } => format!("/notes/{id}/archive"),
            Endpoint::UnarchiveNote { id } => format!("/notes/{id}/unarchive"),
            Endpoint::FindTags { .. } | Endpoint::CreateTag => "/tags".to_string(),
            Endpoint::Login => "/auth/login".to_string(),
        }
    }

    /// Single query parameter, left unencoded; the HTTP layer encodes it.
    pub fn query(&self) -> Option<(&'static str, &'a str)> {
        match self {
            Endpoint::SearchNotes { query } => Some(("query", query)),
            Endpoint::FindTags { name } => Some(("name", name)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_and_unarchive_use_distinct_paths() {
        let archive = Endpoint::ArchiveNote { id: "7" };
        let unarchive = Endpoint::UnarchiveNote { id: "7" };
        assert_eq!(archive.method(), Method::Patch);
        assert_eq!(unarchive.method(), Method::Patch);
        assert_eq!(archive.path(), "/notes/7/archive");
        assert_eq!(unarchive.path(), "/notes/7/unarchive");
    }

    #[test]
    fn routing_table_matches_service_contract() {
        let cases = [
            (Endpoint::ListNotes, "GET", "/notes"),
            (Endpoint::SearchNotes { query: "q" }, "GET", "/notes/search"),
            (Endpoint::CreateNote, "POST", "/notes"),
            (Endpoint::UpdateNote { id: "1" }, "PUT", "/notes/1"),
            (Endpoint::DeleteNote { id: "1" }, "DELETE", "/notes/1"),
            (Endpoint::FindTags { name: "x" }, "GET", "/tags"),
            (Endpoint::CreateTag, "POST", "/tags"),
            (Endpoint::Login, "POST", "/auth/login"),
        ];
        for (endpoint, method, path) in cases {
            assert_eq!(endpoint.method().as_str(), method, "{}", endpoint.name());
            assert_eq!(endpoint.path(), path, "{}", endpoint.name());
        }
    }

    #[test]
    fn query_parameters_only_on_lookup_routes() {
        assert_eq!(
            Endpoint::SearchNotes { query: "todo" }.query(),
            Some(("query", "todo"))
        );
        assert_eq!(Endpoint::FindTags { name: "work" }.query(), Some(("name", "work")));
        assert_eq!(Endpoint::ListNotes.query(), None);
    }
}
