pub mod alert;
pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod notes;
pub mod remote;
pub mod search;
pub mod session;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use remote::{ApiError, HttpNotesApi, Note, NotesApi, Tag};
