use unicode_segmentation::UnicodeSegmentation;

use crate::alert::AlertQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    List,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Content,
    Tags,
}

impl EditorField {
    pub fn next(self) -> Self {
        match self {
            EditorField::Title => EditorField::Content,
            EditorField::Content => EditorField::Tags,
            EditorField::Tags => EditorField::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            EditorField::Title => EditorField::Tags,
            EditorField::Content => EditorField::Title,
            EditorField::Tags => EditorField::Content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

/// Single text input with a grapheme-aware byte cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    buffer: String,
    cursor: usize,
    preferred_column: Option<usize>,
}

impl TextField {
    pub fn with_text(text: &str) -> Self {
        let mut field = Self::default();
        field.set(text);
        field
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Replaces the contents and parks the cursor at the end.
    pub fn set(&mut self, text: &str) {
        self.buffer.clear();
        self.buffer.push_str(text);
        self.cursor = self.buffer.len();
        self.preferred_column = None;
    }

    pub fn clear(&mut self) {
        self.set("");
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
        self.preferred_column = None;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        self.buffer.insert(self.cursor, '\n');
        self.cursor += 1;
        self.preferred_column = Some(0);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        self.preferred_column = None;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        self.preferred_column = None;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        self.preferred_column = None;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        if self.cursor == start {
            return false;
        }
        self.cursor = start;
        self.preferred_column = Some(0);
        true
    }

    pub fn move_end(&mut self) -> bool {
        let end = line_end(&self.buffer, self.cursor);
        if self.cursor == end {
            return false;
        }
        self.cursor = end;
        self.preferred_column = None;
        true
    }

    pub fn move_up(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        if start == 0 {
            return false;
        }
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, start, self.cursor));
        let prev_start = line_start(&self.buffer, start - 1);
        self.cursor = position_for_column(&self.buffer, prev_start, column);
        self.preferred_column = Some(column);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let end = line_end(&self.buffer, self.cursor);
        if end == self.buffer.len() {
            return false;
        }
        let start = line_start(&self.buffer, self.cursor);
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, start, self.cursor));
        self.cursor = position_for_column(&self.buffer, end + 1, column);
        self.preferred_column = Some(column);
        true
    }

    /// Zero-based (line, column) of the cursor, columns counted in graphemes.
    pub fn cursor_position(&self) -> (usize, usize) {
        let start = line_start(&self.buffer, self.cursor);
        let line = self.buffer[..start].matches('\n').count();
        (line, column_at(&self.buffer, start, self.cursor))
    }
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: TextField,
    pub password: TextField,
    pub field: LoginField,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: TextField::default(),
            password: TextField::default(),
            field: LoginField::Email,
        }
    }
}

impl LoginForm {
    pub fn active_mut(&mut self) -> &mut TextField {
        match self.field {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmDelete {
    pub note_id: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    Login(LoginForm),
    ConfirmDelete(ConfirmDelete),
}

/// Everything the terminal front end tracks on top of the controllers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub focus: FocusPane,
    pub field: EditorField,
    pub selected: usize,
    pub title: TextField,
    pub content: TextField,
    pub tag_input: TextField,
    pub search: TextField,
    search_active: bool,
    overlay: Option<OverlayState>,
    alerts: AlertQueue,
    status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            focus: FocusPane::List,
            field: EditorField::Title,
            selected: 0,
            title: TextField::default(),
            content: TextField::default(),
            tag_input: TextField::default(),
            search: TextField::default(),
            search_active: false,
            overlay: None,
            alerts: AlertQueue::default(),
            status_message: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything tied to a signed-in session.
    pub fn reset(&mut self) {
        let alerts = std::mem::take(&mut self.alerts);
        *self = Self {
            alerts,
            ..Self::default()
        };
    }

    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let last = len as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    pub fn clamp_selection(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    pub fn load_editor(&mut self, title: &str, content: &str, tag_input: &str) {
        self.title.set(title);
        self.content.set(content);
        self.tag_input.set(tag_input);
    }

    pub fn focus_editor(&mut self, field: EditorField) {
        self.focus = FocusPane::Editor;
        self.field = field;
        self.search_active = false;
    }

    pub fn focus_list(&mut self) {
        self.focus = FocusPane::List;
    }

    pub fn active_field_mut(&mut self) -> &mut TextField {
        match self.field {
            EditorField::Title => &mut self.title,
            EditorField::Content => &mut self.content,
            EditorField::Tags => &mut self.tag_input,
        }
    }

    pub fn begin_search(&mut self) {
        self.search_active = true;
        self.focus = FocusPane::List;
    }

    pub fn finish_search(&mut self) {
        self.search_active = false;
    }

    pub fn cancel_search(&mut self) {
        self.search_active = false;
        self.search.clear();
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn open_login(&mut self) {
        self.overlay = Some(OverlayState::Login(LoginForm::default()));
    }

    pub fn login_form_mut(&mut self) -> Option<&mut LoginForm> {
        match self.overlay.as_mut() {
            Some(OverlayState::Login(form)) => Some(form),
            _ => None,
        }
    }

    pub fn open_confirm_delete(&mut self, note_id: &str, title: &str) {
        self.overlay = Some(OverlayState::ConfirmDelete(ConfirmDelete {
            note_id: note_id.to_string(),
            title: title.to_string(),
        }));
    }

    pub fn close_overlay(&mut self) -> Option<OverlayState> {
        self.overlay.take()
    }

    pub fn push_alerts<I>(&mut self, alerts: I)
    where
        I: IntoIterator<Item = String>,
    {
        for alert in alerts {
            self.alerts.push(alert);
        }
    }

    /// Oldest alert not yet acknowledged. It blocks every other input.
    pub fn current_alert(&self) -> Option<&str> {
        self.alerts.iter().next()
    }

    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.alerts.pop()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or_else(|| text.len())
}

fn column_at(text: &str, line_start: usize, cursor: usize) -> usize {
    text[line_start..cursor].graphemes(true).count()
}

fn position_for_column(text: &str, line_start: usize, column: usize) -> usize {
    let end = line_end(text, line_start);
    text[line_start..end]
        .grapheme_indices(true)
        .nth(column)
        .map(|(idx, _)| line_start + idx)
        .unwrap_or(end)
}
