use std::fmt::Write as _;
use std::io::{self, Read, Write};

use anyhow::{bail, Result};
use clap::Args;
use time::format_description::well_known::Rfc3339;

use crate::config::AppConfig;
use crate::notes::{NoteEditorController, NoteListController, SortKey};
use crate::remote::{Note, NotesApi};
use crate::session::SessionController;

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Prompted on stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Show archived notes instead of active ones
    #[arg(long)]
    pub archived: bool,
    /// Sort order (date or title); defaults to list.default_sort
    #[arg(long)]
    pub sort: Option<SortKey>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search words, joined with spaces
    #[arg(required = true)]
    pub query: Vec<String>,
    /// Show archived matches instead of active ones
    #[arg(long)]
    pub archived: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    pub title: String,
    /// Provide the note body inline. If omitted, reads from stdin.
    #[arg(long)]
    pub body: Option<String>,
    /// Tag name to attach; repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    /// Note identifier
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct TagsArgs {
    /// Exact tag name
    pub name: String,
}

pub fn login(api: &dyn NotesApi, args: LoginArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password")?,
    };
    let mut session = SessionController::new();
    if !session.login(api, &args.email, &password) {
        bail_on_alerts(session.take_alerts())?;
    }
    if let Some(info) = session.info() {
        println!("Signed in as {}", info.email);
    }
    Ok(())
}

pub fn list_notes(config: &AppConfig, api: &dyn NotesApi, args: ListArgs) -> Result<()> {
    print!("{}", run_list(config, api, &args)?);
    Ok(())
}

fn run_list(config: &AppConfig, api: &dyn NotesApi, args: &ListArgs) -> Result<String> {
    let mut list = NoteListController::new(&config.list, &config.search);
    list.set_archived_filter(args.archived);
    if let Some(sort) = args.sort {
        list.set_sort(sort);
    }
    list.fetch_all(api);
    bail_on_alerts(list.take_alerts())?;
    Ok(format_notes(&list))
}

pub fn search_notes(config: &AppConfig, api: &dyn NotesApi, args: SearchArgs) -> Result<()> {
    print!("{}", run_search(config, api, &args)?);
    Ok(())
}

fn run_search(config: &AppConfig, api: &dyn NotesApi, args: &SearchArgs) -> Result<String> {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        bail!("search query cannot be empty");
    }
    let mut list = NoteListController::new(&config.list, &config.search);
    list.set_archived_filter(args.archived);
    list.search(api, &query);
    bail_on_alerts(list.take_alerts())?;
    if list.notes().is_empty() {
        return Ok(format!("No results found for \"{query}\".\n"));
    }
    Ok(format_notes(&list))
}

pub fn new_note(api: &dyn NotesApi, args: NewArgs) -> Result<()> {
    let body = match args.body {
        Some(body) => body,
        None => read_stdin()?.unwrap_or_default(),
    };
    let note = create_note(api, &args.title, &body, &args.tags)?;
    println!("Created note {}: {}", note.id, note.title);
    Ok(())
}

fn create_note(api: &dyn NotesApi, title: &str, body: &str, tags: &[String]) -> Result<Note> {
    let mut editor = NoteEditorController::new();
    editor.set_title(title);
    editor.set_content(body);
    if !editor.can_save() {
        bail!("note title and content must both be non-empty");
    }
    for name in tags {
        editor.set_tag_input(name.as_str());
        if editor.add_tag(api).is_none() {
            bail_on_alerts(editor.take_alerts())?;
        }
    }
    match editor.save(api) {
        Some(outcome) => Ok(outcome.note),
        None => {
            bail_on_alerts(editor.take_alerts())?;
            bail!("note was not saved")
        }
    }
}

pub fn archive(config: &AppConfig, api: &dyn NotesApi, args: IdArgs) -> Result<()> {
    mutate(config, api, &args.id, "Archived", |list, api, id| list.archive(api, id))
}

pub fn unarchive(config: &AppConfig, api: &dyn NotesApi, args: IdArgs) -> Result<()> {
    mutate(config, api, &args.id, "Unarchived", |list, api, id| {
        list.unarchive(api, id)
    })
}

pub fn delete(config: &AppConfig, api: &dyn NotesApi, args: IdArgs) -> Result<()> {
    mutate(config, api, &args.id, "Deleted", |list, api, id| list.delete(api, id))
}

fn mutate<F>(config: &AppConfig, api: &dyn NotesApi, id: &str, verb: &str, op: F) -> Result<()>
where
    F: FnOnce(&mut NoteListController, &dyn NotesApi, &str),
{
    let mut list = NoteListController::new(&config.list, &config.search);
    op(&mut list, api, id);
    bail_on_alerts(list.take_alerts())?;
    let archived = list.cached().iter().filter(|note| note.archived).count();
    println!(
        "{verb} note {id}. {} active, {archived} archived.",
        list.cached().len() - archived
    );
    Ok(())
}

pub fn find_tags(api: &dyn NotesApi, args: TagsArgs) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        bail!("tag name cannot be empty");
    }
    let tags = match api.find_tags(name) {
        Ok(tags) => tags,
        Err(err) => {
            tracing::error!(%err, name, "tag lookup failed");
            bail!("{}", crate::alert::ACTION_FAILED);
        }
    };
    if tags.is_empty() {
        println!("No tag named '{name}'.");
    }
    for tag in tags {
        println!("{}\t{}", tag.id, tag.name);
    }
    Ok(())
}

fn format_notes(list: &NoteListController) -> String {
    let notes = list.notes();
    if notes.is_empty() {
        return format!("{}\n", list.empty_message());
    }
    let mut out = String::new();
    for note in notes {
        let mut headline = format!("{}  {}", note.id, note.title);
        if note.archived {
            headline.push_str("  [ARCHIVED]");
        }
        let _ = writeln!(&mut out, "{headline}");
        let updated = note
            .updated_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| note.updated_at.unix_timestamp().to_string());
        let _ = writeln!(&mut out, "    updated {updated}");
        if !note.tags.is_empty() {
            let tags = note
                .tags
                .iter()
                .map(|tag| format!("#{}", tag.name))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(&mut out, "    tags    {tags}");
        }
        let preview = list.preview(note).replace('\n', " ");
        if !preview.trim().is_empty() {
            let _ = writeln!(&mut out, "    {preview}");
        }
        out.push('\n');
    }
    out
}

// Controllers already logged the failure; surface the user-facing text.
fn bail_on_alerts(alerts: Vec<String>) -> Result<()> {
    if alerts.is_empty() {
        return Ok(());
    }
    bail!("{}", alerts.join("\n"))
}

fn prompt(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{label}: ")?;
    stderr.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert;
    use crate::remote::fake::{note, Call, FakeApi};
    use crate::remote::Tag;

    type TestResult<T = ()> = Result<T>;

    fn list_args(archived: bool, sort: Option<SortKey>) -> ListArgs {
        ListArgs { archived, sort }
    }

    #[test]
    fn list_output_is_sorted_and_filtered() -> TestResult {
        let mut tagged = note("1", "Alpha", false, 60);
        tagged.tags.push(Tag::new("t1", "work"));
        let api = FakeApi::with_notes(vec![
            note("2", "beta", false, 0),
            tagged,
            note("3", "Gamma", true, 120),
        ]);
        let output = run_list(&AppConfig::default(), &api, &list_args(false, None))?;
        insta::assert_snapshot!(output.trim_end(), @r###"
1  Alpha
    updated 2024-01-01T00:01:00Z
    tags    #work
    Alpha body

2  beta
    updated 2024-01-01T00:00:00Z
    beta body
"###);
        Ok(())
    }

    #[test]
    fn list_by_title_shows_archived_only() -> TestResult {
        let api = FakeApi::with_notes(vec![
            note("1", "zeta", true, 0),
            note("2", "Alpha", true, 5),
            note("3", "active", false, 9),
        ]);
        let output = run_list(
            &AppConfig::default(),
            &api,
            &list_args(true, Some(SortKey::Title)),
        )?;
        let headlines: Vec<_> = output
            .lines()
            .filter(|line| !line.starts_with(' ') && !line.is_empty())
            .collect();
        assert_eq!(headlines, vec!["2  Alpha  [ARCHIVED]", "1  zeta  [ARCHIVED]"]);
        Ok(())
    }

    #[test]
    fn failed_fetch_surfaces_alert_text() {
        let api = FakeApi::default();
        api.fail("list-notes");
        let err = run_list(&AppConfig::default(), &api, &list_args(false, None))
            .expect_err("fetch fails");
        assert_eq!(err.to_string(), alert::FETCH_FAILED);
    }

    #[test]
    fn search_with_no_hits_names_the_query() -> TestResult {
        let api = FakeApi::with_notes(vec![note("1", "Alpha", false, 0)]);
        let args = SearchArgs {
            query: vec!["no".into(), "match".into()],
            archived: false,
        };
        let output = run_search(&AppConfig::default(), &api, &args)?;
        assert_eq!(output, "No results found for \"no match\".\n");
        assert_eq!(api.calls(), vec![Call::SearchNotes("no match".into())]);
        Ok(())
    }

    #[test]
    fn blank_search_is_rejected_without_request() {
        let api = FakeApi::default();
        let args = SearchArgs {
            query: vec!["  ".into()],
            archived: false,
        };
        assert!(run_search(&AppConfig::default(), &api, &args).is_err());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn create_resolves_tags_then_posts() -> TestResult {
        let api = FakeApi::default();
        api.add_tag(Tag::new("7", "home"));
        let note = create_note(&api, "Groceries", "milk", &["home".into(), "errand".into()])?;
        assert_eq!(note.tags.len(), 2);
        assert_eq!(
            api.calls()[..3],
            [
                Call::FindTags("home".into()),
                Call::FindTags("errand".into()),
                Call::CreateTag("errand".into()),
            ]
        );
        assert_eq!(api.count(|call| matches!(call, Call::CreateNote(_))), 1);
        Ok(())
    }

    #[test]
    fn create_with_blank_body_sends_nothing() {
        let api = FakeApi::default();
        assert!(create_note(&api, "Title", "  ", &[]).is_err());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn archive_failure_still_refetches() {
        let api = FakeApi::with_notes(vec![note("1", "A", false, 0)]);
        api.fail("archive-note");
        let result = archive(
            &AppConfig::default(),
            &api,
            IdArgs { id: "1".into() },
        );
        assert!(result.is_err());
        assert_eq!(api.calls(), vec![Call::ArchiveNote("1".into()), Call::ListNotes]);
    }
}
