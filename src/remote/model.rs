use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Cached copy of a server-owned note. Never authoritative on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub archived: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Body of create (POST /notes) and update (PUT /notes/{id}).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<Tag>,
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTag<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ArchiveFlag {
    pub archived: bool,
}

// Identifiers are opaque strings, but some backends emit numeric keys.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Unsigned(value) => value.to_string(),
        RawId::Signed(value) => value.to_string(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Tag>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn decodes_camel_case_note_with_numeric_ids() {
        let raw = r#"{
            "id": 42,
            "title": "Groceries",
            "content": "milk",
            "tags": [{"id": 7, "name": "home"}],
            "archived": true,
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-02T08:30:00Z"
        }"#;
        let note: Note = serde_json::from_str(raw).expect("note decodes");
        assert_eq!(note.id, "42");
        assert_eq!(note.tags, vec![Tag::new("7", "home")]);
        assert!(note.archived);
        assert_eq!(note.updated_at, datetime!(2024-03-02 08:30 UTC));
    }

    #[test]
    fn missing_or_null_tags_decode_to_empty_set() {
        let raw = r#"{
            "id": "a1",
            "title": "Loose",
            "content": "",
            "tags": null,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        }"#;
        let note: Note = serde_json::from_str(raw).expect("note decodes");
        assert!(note.tags.is_empty());
        assert!(!note.archived);
    }

    #[test]
    fn draft_serializes_title_content_and_tags() {
        let draft = NoteDraft {
            title: "T".into(),
            content: "C".into(),
            tags: vec![Tag::new("1", "x")],
        };
        let value = serde_json::to_value(&draft).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"title": "T", "content": "C", "tags": [{"id": "1", "name": "x"}]})
        );
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("me@example.com", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("me@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
