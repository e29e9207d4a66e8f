pub mod editor;
pub mod list;

pub use editor::{NoteEditorController, SaveOutcome};
pub use list::{compare_titles, preview, NoteListController, SortKey};
