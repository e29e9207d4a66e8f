use serde::de::DeserializeOwned;
use serde::Serialize;
use ureq::http::Response;
use ureq::{Agent, Body};
use uuid::Uuid;

use super::model::{ArchiveFlag, NewTag};
use super::{ApiError, ApiResult, Credentials, Endpoint, Method, Note, NoteDraft, NotesApi, Tag};

/// Blocking HTTP client for the notes service.
///
/// No timeout is configured and no credentials are attached after login.
#[derive(Clone)]
pub struct HttpNotesApi {
    agent: Agent,
    base_url: String,
}

impl HttpNotesApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            agent: Agent::new_with_defaults(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &Endpoint<'_>) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn send<B: Serialize>(
        &self,
        endpoint: Endpoint<'_>,
        body: Option<&B>,
    ) -> ApiResult<Response<Body>> {
        let name = endpoint.name();
        let request_id = Uuid::new_v4();
        let url = self.url(&endpoint);
        tracing::debug!(%request_id, endpoint = name, method = endpoint.method().as_str(), %url, "sending request");

        let result = match endpoint.method() {
            Method::Get => {
                let mut request = self.agent.get(url.as_str());
                if let Some((key, value)) = endpoint.query() {
                    request = request.query(key, value);
                }
                request.call()
            }
            Method::Delete => self.agent.delete(url.as_str()).call(),
            Method::Post => {
                let request = self
                    .agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json");
                match body {
                    Some(body) => request.send_json(body),
                    None => request.send_empty(),
                }
            }
            Method::Put => {
                let request = self
                    .agent
                    .put(url.as_str())
                    .header("Content-Type", "application/json");
                match body {
                    Some(body) => request.send_json(body),
                    None => request.send_empty(),
                }
            }
            Method::Patch => {
                let request = self
                    .agent
                    .patch(url.as_str())
                    .header("Content-Type", "application/json");
                match body {
                    Some(body) => request.send_json(body),
                    None => request.send_empty(),
                }
            }
        };

        let response = result.map_err(|err| classify(name, err))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::debug!(%request_id, endpoint = name, status, "non-success status");
            return Err(ApiError::Status {
                endpoint: name,
                status,
            });
        }
        tracing::debug!(%request_id, endpoint = name, status, "request completed");
        Ok(response)
    }

    fn send_for_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        body: Option<&B>,
    ) -> ApiResult<T> {
        let name = endpoint.name();
        let mut response = self.send(endpoint, body)?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| classify(name, err))
    }

    fn fetch_collection<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> ApiResult<Vec<T>> {
        let name = endpoint.name();
        let value: serde_json::Value = self.send_for_json(endpoint, None::<&()>)?;
        if !value.is_array() {
            return Err(ApiError::Malformed {
                endpoint: name,
                message: "expected a JSON array".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|err| ApiError::Malformed {
            endpoint: name,
            message: err.to_string(),
        })
    }
}

impl NotesApi for HttpNotesApi {
    fn list_notes(&self) -> ApiResult<Vec<Note>> {
        self.fetch_collection(Endpoint::ListNotes)
    }

    fn search_notes(&self, query: &str) -> ApiResult<Vec<Note>> {
        self.fetch_collection(Endpoint::SearchNotes { query })
    }

    fn create_note(&self, draft: &NoteDraft) -> ApiResult<Note> {
        self.send_for_json(Endpoint::CreateNote, Some(draft))
    }

    fn update_note(&self, id: &str, draft: &NoteDraft) -> ApiResult<Note> {
        self.send_for_json(Endpoint::UpdateNote { id }, Some(draft))
    }

    fn delete_note(&self, id: &str) -> ApiResult<()> {
        self.send(Endpoint::DeleteNote { id }, None::<&()>)
            .map(|_| ())
    }

    fn archive_note(&self, id: &str) -> ApiResult<()> {
        self.send(
            Endpoint::ArchiveNote { id },
            Some(&ArchiveFlag { archived: true }),
        )
        .map(|_| ())
    }

    fn unarchive_note(&self, id: &str) -> ApiResult<()> {
        self.send(Endpoint::UnarchiveNote { id }, None::<&()>)
            .map(|_| ())
    }

    fn find_tags(&self, name: &str) -> ApiResult<Vec<Tag>> {
        self.fetch_collection(Endpoint::FindTags { name })
    }

    fn create_tag(&self, name: &str) -> ApiResult<Tag> {
        self.send_for_json(Endpoint::CreateTag, Some(&NewTag { name }))
    }

    fn login(&self, credentials: &Credentials) -> ApiResult<serde_json::Value> {
        self.send_for_json(Endpoint::Login, Some(credentials))
    }
}

fn classify(endpoint: &'static str, err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::StatusCode(status) => ApiError::Status { endpoint, status },
        ureq::Error::Json(err) => ApiError::Malformed {
            endpoint,
            message: err.to_string(),
        },
        other => ApiError::Transport {
            endpoint,
            message: other.to_string(),
        },
    }
}
