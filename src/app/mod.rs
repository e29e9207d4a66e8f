use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::AppConfig;
use crate::remote::NotesApi;
use crate::session::{SessionController, View};
use crate::ui;

pub mod dashboard;
pub mod state;
pub mod worker;

pub use dashboard::Dashboard;
pub use state::{AppState, EditorField, FocusPane, LoginField, OverlayState, TextField};
pub use worker::RemoteWorker;

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    OpenNote,
    NewNote,
    FocusEditor,
    StartSearch,
    ToggleArchivedView,
    ToggleArchive,
    DeleteNote,
    ToggleSort,
    Refresh,
    Logout,
}

pub struct App {
    pub config: Arc<AppConfig>,
    api: Arc<dyn NotesApi>,
    session: SessionController,
    dashboard: Option<Dashboard>,
    worker: Option<RemoteWorker>,
    state: AppState,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, api: Arc<dyn NotesApi>) -> Self {
        Self {
            config,
            api,
            session: SessionController::new(),
            dashboard: None,
            worker: None,
            state: AppState::new(),
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(100),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        self.close_dashboard();
        result
    }

    pub fn view(&self) -> View {
        self.session.view()
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    let visible = self.dashboard.as_ref().map_or(0, |d| d.visible().len());
                    self.list_state
                        .select((visible > 0).then_some(self.state.selected));
                    let screen = ui::Screen {
                        view: self.session.view(),
                        session: self.session.info(),
                        dashboard: self.dashboard.as_ref(),
                        state: &self.state,
                    };
                    ui::draw_app(frame, &screen, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.state.current_alert().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.state.dismiss_alert();
            }
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        match self.session.view() {
            View::Landing => self.handle_landing_key(key),
            View::Dashboard => {
                if self.state.is_search_active() {
                    self.handle_search_key(key);
                } else if self.state.focus == FocusPane::Editor {
                    self.handle_editor_key(key);
                } else {
                    self.handle_list_key(key);
                }
            }
        }
    }

    fn handle_landing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter | KeyCode::Char('l') => self.state.open_login(),
            _ => {}
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match self.state.overlay() {
            Some(OverlayState::Login(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                    }
                    KeyCode::Enter => self.submit_login(),
                    KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                        if let Some(form) = self.state.login_form_mut() {
                            form.toggle_field();
                        }
                    }
                    code => {
                        if let Some(form) = self.state.login_form_mut() {
                            edit_single_line(form.active_mut(), code, key.modifiers);
                        }
                    }
                }
                true
            }
            Some(OverlayState::ConfirmDelete(_)) => {
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') => {
                        if let Some(OverlayState::ConfirmDelete(confirm)) = self.state.close_overlay() {
                            self.delete_note(&confirm.note_id);
                        }
                    }
                    KeyCode::Esc | KeyCode::Char('n') => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Enter => Some(Action::OpenNote),
            KeyCode::Tab => Some(Action::FocusEditor),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Refresh)
            }
            KeyCode::Char('n') if plain => Some(Action::NewNote),
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('A') => Some(Action::ToggleArchivedView),
            KeyCode::Char('a') if plain => Some(Action::ToggleArchive),
            KeyCode::Char('d') if plain => Some(Action::DeleteNote),
            KeyCode::Char('s') if plain => Some(Action::ToggleSort),
            KeyCode::Char('L') => Some(Action::Logout),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.move_selection(1),
            Action::SelectPrevious => self.move_selection(-1),
            Action::OpenNote => self.open_highlighted(),
            Action::NewNote => {
                if let Some(dashboard) = self.dashboard.as_mut() {
                    dashboard.clear_selection();
                }
                self.state.load_editor("", "", "");
                self.state.focus_editor(EditorField::Title);
                self.state.set_status_message(Some("New note: Tab next field • Ctrl-s save"));
            }
            Action::FocusEditor => self.state.focus_editor(EditorField::Title),
            Action::StartSearch => {
                self.state.begin_search();
                self.state
                    .set_status_message(Some("Search: type to filter • Enter keep • Esc clear"));
            }
            Action::ToggleArchivedView => {
                if let Some(dashboard) = self.dashboard.as_mut() {
                    let archived = dashboard.list.toggle_archived_filter();
                    self.state.selected = 0;
                    self.state.set_status_message(Some(if archived {
                        "Showing archived notes"
                    } else {
                        "Showing active notes"
                    }));
                }
            }
            Action::ToggleArchive => self.toggle_archive(),
            Action::DeleteNote => {
                if let Some((id, title)) = self.highlighted() {
                    self.state.open_confirm_delete(&id, &title);
                }
            }
            Action::ToggleSort => {
                if let Some(dashboard) = self.dashboard.as_mut() {
                    let sort = dashboard.list.sort().toggled();
                    dashboard.list.set_sort(sort);
                    self.state
                        .set_status_message(Some(format!("Sorted by {sort}")));
                }
            }
            Action::Refresh => {
                if let Some(dashboard) = self.dashboard.as_mut() {
                    if dashboard.list.fetch_all(self.api.as_ref()) {
                        self.state.set_status_message(Some("Notes refreshed"));
                    }
                }
            }
            Action::Logout => self.logout(),
        }
        self.after_remote_work();
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state.cancel_search();
                self.state.clear_status_message();
                if let Some(dashboard) = self.dashboard.as_mut() {
                    dashboard.list.cancel_searches();
                    dashboard.list.fetch_all(self.api.as_ref());
                }
                self.after_remote_work();
            }
            KeyCode::Enter => {
                self.state.finish_search();
                self.state.clear_status_message();
            }
            code => {
                if edit_single_line(&mut self.state.search, code, key.modifiers) {
                    self.state.selected = 0;
                    if let Some(dashboard) = self.dashboard.as_mut() {
                        dashboard
                            .list
                            .search_input(self.state.search.as_str(), Instant::now());
                    }
                }
            }
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.save_note();
            return;
        }
        match key.code {
            KeyCode::Esc => {
                self.state.focus_list();
                return;
            }
            KeyCode::Tab => {
                self.state.field = self.state.field.next();
                return;
            }
            KeyCode::BackTab => {
                self.state.field = self.state.field.previous();
                return;
            }
            _ => {}
        }

        let field = self.state.field;
        match (field, key.code) {
            (EditorField::Title, KeyCode::Enter) => {
                self.state.field = EditorField::Content;
                return;
            }
            (EditorField::Content, KeyCode::Enter) => {
                self.state.content.insert_newline();
            }
            (EditorField::Content, KeyCode::Up) => {
                self.state.content.move_up();
            }
            (EditorField::Content, KeyCode::Down) => {
                self.state.content.move_down();
            }
            (EditorField::Tags, KeyCode::Enter) => {
                self.add_tag();
                return;
            }
            (EditorField::Tags, KeyCode::Backspace) if self.state.tag_input.is_empty() => {
                if let Some(dashboard) = self.dashboard.as_mut() {
                    if let Some(tag) = dashboard.editor.remove_last_tag() {
                        self.state
                            .set_status_message(Some(format!("Removed tag '{}'", tag.name)));
                    }
                }
                return;
            }
            (_, code) => {
                edit_single_line(self.state.active_field_mut(), code, key.modifiers);
            }
        }
        self.push_editor_fields();
    }

    fn on_tick(&mut self, now: Instant) {
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        if let Some(ticket) = dashboard.list.poll_search(now) {
            let dispatched = self
                .worker
                .as_ref()
                .map_or(false, |worker| worker.submit(ticket.clone()));
            if !dispatched {
                if let Some(reply) = ticket.execute(self.api.as_ref()) {
                    dashboard.list.apply_search_reply(reply);
                }
            }
        }
        if let Some(worker) = self.worker.as_ref() {
            while let Some(reply) = worker.try_recv() {
                dashboard.list.apply_search_reply(reply);
            }
        }
        let visible = dashboard.visible().len();
        self.state.clamp_selection(visible);
        self.after_remote_work();
    }

    fn submit_login(&mut self) {
        let Some((email, password)) = self.state.login_form_mut().map(|form| {
            (
                form.email.as_str().to_string(),
                form.password.as_str().to_string(),
            )
        }) else {
            return;
        };
        if email.trim().is_empty() || password.is_empty() {
            self.state
                .set_status_message(Some("Email and password are required"));
            return;
        }
        if self.session.login(self.api.as_ref(), &email, &password) {
            self.state.close_overlay();
            self.open_dashboard();
        }
        self.after_remote_work();
    }

    fn open_dashboard(&mut self) {
        self.state.reset();
        self.dashboard = Some(Dashboard::open(&self.config, self.api.as_ref()));
        match RemoteWorker::spawn(self.api.clone()) {
            Ok(worker) => self.worker = Some(worker),
            Err(err) => {
                tracing::error!(?err, "search worker unavailable, searching inline");
                self.worker = None;
            }
        }
        if let Some(info) = self.session.info() {
            self.state
                .set_status_message(Some(format!("Signed in as {}", info.email)));
        }
    }

    fn logout(&mut self) {
        self.session.logout();
        self.close_dashboard();
        self.state.reset();
        self.state.set_status_message(Some("Signed out"));
    }

    fn close_dashboard(&mut self) {
        if let Some(dashboard) = self.dashboard.take() {
            dashboard.teardown();
        }
        if let Some(worker) = self.worker.take() {
            let dropped = worker.discard_replies();
            if dropped > 0 {
                tracing::debug!(dropped, "discarded in-flight search replies");
            }
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.dashboard.as_ref().map_or(0, |d| d.visible().len());
        self.state.move_selection(delta, len);
    }

    /// Id and title of the note under the list cursor.
    fn highlighted(&self) -> Option<(String, String)> {
        let dashboard = self.dashboard.as_ref()?;
        let note = *dashboard.visible().get(self.state.selected)?;
        Some((note.id.clone(), note.title.clone()))
    }

    fn open_highlighted(&mut self) {
        let Some((id, _)) = self.highlighted() else {
            return;
        };
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        if dashboard.select(&id) {
            self.pull_editor_fields();
            self.state.focus_editor(EditorField::Title);
            self.state
                .set_status_message(Some("Editing: Tab next field • Ctrl-s update • Esc list"));
        }
    }

    fn toggle_archive(&mut self) {
        let Some((id, _)) = self.highlighted() else {
            return;
        };
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        match dashboard.archive_toggle(self.api.as_ref(), &id) {
            Some(true) => self.state.set_status_message(Some("Note archived")),
            Some(false) => self.state.set_status_message(Some("Note restored")),
            None => {}
        }
        self.pull_editor_fields();
    }

    fn delete_note(&mut self, id: &str) {
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        dashboard.delete(self.api.as_ref(), id);
        if dashboard.list.find(id).is_none() {
            self.state.set_status_message(Some("Note deleted"));
        }
        self.pull_editor_fields();
        self.after_remote_work();
    }

    fn add_tag(&mut self) {
        self.push_editor_fields();
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        if let Some(tag) = dashboard.editor.add_tag(self.api.as_ref()) {
            self.state
                .set_status_message(Some(format!("Added tag '{}'", tag.name)));
        }
        self.state.tag_input.set(dashboard.editor.tag_input());
        self.after_remote_work();
    }

    fn save_note(&mut self) {
        self.push_editor_fields();
        let Some(dashboard) = self.dashboard.as_mut() else {
            return;
        };
        if !dashboard.editor.can_save() {
            self.state
                .set_status_message(Some("Title and content are both required"));
            return;
        }
        if let Some(outcome) = dashboard.save(self.api.as_ref()) {
            let verb = if outcome.created { "Created" } else { "Updated" };
            self.state
                .set_status_message(Some(format!("{verb} '{}'", outcome.note.title)));
            self.pull_editor_fields();
            if outcome.created {
                self.state.field = EditorField::Title;
            }
        }
        self.after_remote_work();
    }

    fn push_editor_fields(&mut self) {
        if let Some(dashboard) = self.dashboard.as_mut() {
            dashboard.editor.set_title(self.state.title.as_str());
            dashboard.editor.set_content(self.state.content.as_str());
            dashboard.editor.set_tag_input(self.state.tag_input.as_str());
        }
    }

    fn pull_editor_fields(&mut self) {
        if let Some(dashboard) = self.dashboard.as_ref() {
            let editor = &dashboard.editor;
            self.state
                .load_editor(editor.title(), editor.content(), editor.tag_input());
        }
    }

    fn after_remote_work(&mut self) {
        let mut alerts = self.session.take_alerts();
        if let Some(dashboard) = self.dashboard.as_mut() {
            alerts.extend(dashboard.drain_alerts());
            let visible = dashboard.visible().len();
            self.state.clamp_selection(visible);
        }
        self.state.push_alerts(alerts);
    }
}

// Shared line editing for inputs without special Enter handling.
fn edit_single_line(field: &mut TextField, code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        KeyCode::Char(ch)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
        {
            field.insert_char(ch)
        }
        _ => false,
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("creating terminal backend")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}
