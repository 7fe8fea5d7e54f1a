use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;

use crate::calendar::MonthCursor;
use crate::models::BACKLOG_KEY;
use crate::outline::{OutlineError, OutlineService};
use crate::planner::{Planner, PlannerError};
use crate::search::{SearchQuery, filter_tasks};
use crate::store::KeyValueStore;
use crate::utils::{date_key, parse_date_key, today};

#[derive(Parser)]
#[command(name = "eduplan")]
#[command(about = "Monthly task calendar and lesson-plan catalog for the terminal")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Manage dated and backlog tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// List backlog and overdue tasks
    Outstanding {
        /// Only tasks whose title contains this text
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Manage subjects
    #[command(subcommand)]
    Subject(SubjectCommand),
    /// Manage modules inside a subject
    #[command(subcommand)]
    Module(ModuleCommand),
    /// Manage lessons inside a module
    #[command(subcommand)]
    Lesson(LessonCommand),
    /// Search the catalog and all tasks
    Search {
        query: String,
    },
    /// Bulk import subjects from pasted sheet data (stdin unless --file)
    Import(ImportArgs),
    /// Draft a Markdown lesson outline
    Outline {
        subject: String,
        topic: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task to a day or to the backlog
    Add {
        title: String,
        /// Day as YYYY-M-D, "today" or "backlog"
        #[arg(long, short, default_value = "today")]
        date: String,
    },
    /// Flip a task between done and not done
    Toggle { date: String, id: String },
    /// Delete a task
    Delete { date: String, id: String },
    /// List tasks for one day, or for a whole month with --month
    List {
        #[arg(long, short, default_value = "today")]
        date: String,
        /// List every day of the month containing --date
        #[arg(long)]
        month: bool,
    },
}

#[derive(Subcommand)]
pub enum SubjectCommand {
    Add { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
    /// Print the full catalog tree
    List,
}

#[derive(Subcommand)]
pub enum ModuleCommand {
    Add { subject: String, name: String },
    Rename { subject: String, module: String, name: String },
    Delete { subject: String, module: String },
}

#[derive(Subcommand)]
pub enum LessonCommand {
    Add {
        subject: String,
        module: String,
        name: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Replace a lesson's name and link
    Update {
        subject: String,
        module: String,
        lesson: String,
        name: String,
        #[arg(long)]
        url: Option<String>,
    },
    Delete { subject: String, module: String, lesson: String },
}

#[derive(Args)]
pub struct ImportArgs {
    /// Read the pasted data from a file
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Input already is the JSON hierarchy; skip the remote service
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Outline(#[from] OutlineError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Failed to read input: {0}")]
    InputError(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Turn a user-supplied day into a bucket key
pub fn resolve_date_key(raw: &str) -> Result<String, CliError> {
    match raw.trim() {
        "backlog" => Ok(BACKLOG_KEY.to_string()),
        "today" => Ok(date_key(today())),
        other => parse_date_key(other)
            .map(date_key)
            .ok_or_else(|| CliError::DateParseError(format!("'{}' is not YYYY-M-D, today or backlog", other))),
    }
}

fn found<T>(value: Option<T>, what: impl Into<String>) -> Result<T, CliError> {
    value.ok_or_else(|| CliError::NotFound(what.into()))
}

/// Handle `task ...`
pub fn handle_task<S: KeyValueStore>(command: TaskCommand, planner: &mut Planner<S>) -> Result<(), CliError> {
    match command {
        TaskCommand::Add { title, date } => {
            let key = resolve_date_key(&date)?;
            let id = found(planner.add_task(&key, &title)?, key.as_str())?;
            println!("Task created successfully (ID: {})", id);
        }
        TaskCommand::Toggle { date, id } => {
            let key = resolve_date_key(&date)?;
            let completed = found(planner.toggle_task(&key, &id)?, format!("task {} on {}", id, key))?;
            println!("Task {} marked {}", id, if completed { "done" } else { "not done" });
        }
        TaskCommand::Delete { date, id } => {
            let key = resolve_date_key(&date)?;
            let task = found(planner.delete_task(&key, &id)?, format!("task {} on {}", id, key))?;
            println!("Deleted task '{}'", task.title);
        }
        TaskCommand::List { date, month } => {
            let key = resolve_date_key(&date)?;
            let query = SearchQuery::default();
            match parse_date_key(&key).filter(|_| month) {
                Some(day) => {
                    let cursor = MonthCursor::today(day);
                    println!("{}", cursor.title());
                    for day in crate::calendar::month_grid(cursor).into_iter().flatten() {
                        let key = date_key(day);
                        let tasks = filter_tasks(planner.tasks().tasks_on(&key), &query);
                        if !tasks.is_empty() {
                            println!("{}", key);
                            print!("{}", format_tasks(&tasks));
                        }
                    }
                }
                None => {
                    let tasks = filter_tasks(planner.tasks().tasks_on(&key), &query);
                    if tasks.is_empty() {
                        println!("No tasks for {}", key);
                    } else {
                        print!("{}", format_tasks(&tasks));
                    }
                }
            }
        }
    }
    Ok(())
}

fn format_tasks(tasks: &[&crate::models::Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        let mark = if task.completed { "x" } else { " " };
        let _ = writeln!(out, "  [{}] {}  ({})", mark, task.title, task.id);
    }
    out
}

/// Handle `outstanding`
pub fn handle_outstanding<S: KeyValueStore>(query: Option<String>, planner: &mut Planner<S>) -> Result<(), CliError> {
    if let Some(query) = query {
        planner.set_search_query(&query);
    }
    let outstanding = planner.outstanding(today());
    if outstanding.is_empty() {
        println!("Nothing outstanding");
        return Ok(());
    }
    for entry in outstanding.iter() {
        let mark = if entry.task.completed { "x" } else { " " };
        println!(
            "[{}] {:<16} {}  ({}, {})",
            mark,
            entry.label(),
            entry.task.title,
            entry.date_key,
            entry.task.id
        );
    }
    Ok(())
}

/// Handle `subject ...`
pub fn handle_subject<S: KeyValueStore>(command: SubjectCommand, planner: &mut Planner<S>) -> Result<(), CliError> {
    match command {
        SubjectCommand::Add { name } => {
            let id = found(planner.add_subject(&name)?, "subject")?;
            println!("Subject created successfully (ID: {})", id);
        }
        SubjectCommand::Rename { id, name } => {
            found(planner.rename_subject(&id, &name)?, format!("subject {}", id))?;
            println!("Subject {} renamed", id);
        }
        SubjectCommand::Delete { id } => {
            let subject = found(planner.delete_subject(&id)?, format!("subject {}", id))?;
            println!(
                "Deleted subject '{}' with {} module(s) and {} lesson(s)",
                subject.name,
                subject.modules.len(),
                subject.lesson_count()
            );
        }
        SubjectCommand::List => {
            print!("{}", format_catalog(planner));
        }
    }
    Ok(())
}

/// Handle `module ...`
pub fn handle_module<S: KeyValueStore>(command: ModuleCommand, planner: &mut Planner<S>) -> Result<(), CliError> {
    match command {
        ModuleCommand::Add { subject, name } => {
            let id = found(planner.add_module(&subject, &name)?, format!("subject {}", subject))?;
            println!("Module created successfully (ID: {})", id);
        }
        ModuleCommand::Rename { subject, module, name } => {
            found(
                planner.rename_module(&subject, &module, &name)?,
                format!("module {} in subject {}", module, subject),
            )?;
            println!("Module {} renamed", module);
        }
        ModuleCommand::Delete { subject, module } => {
            let removed = found(
                planner.delete_module(&subject, &module)?,
                format!("module {} in subject {}", module, subject),
            )?;
            println!("Deleted module '{}' with {} lesson(s)", removed.name, removed.lessons.len());
        }
    }
    Ok(())
}

/// Handle `lesson ...`
pub fn handle_lesson<S: KeyValueStore>(command: LessonCommand, planner: &mut Planner<S>) -> Result<(), CliError> {
    match command {
        LessonCommand::Add { subject, module, name, url } => {
            let id = found(
                planner.add_lesson(&subject, &module, &name, url.as_deref())?,
                format!("module {} in subject {}", module, subject),
            )?;
            println!("Lesson created successfully (ID: {})", id);
        }
        LessonCommand::Update { subject, module, lesson, name, url } => {
            found(
                planner.update_lesson(&subject, &module, &lesson, &name, url.as_deref())?,
                format!("lesson {}", lesson),
            )?;
            println!("Lesson {} updated", lesson);
        }
        LessonCommand::Delete { subject, module, lesson } => {
            let removed = found(planner.delete_lesson(&subject, &module, &lesson)?, format!("lesson {}", lesson))?;
            println!("Deleted lesson '{}'", removed.name);
        }
    }
    Ok(())
}

/// Handle `search`
pub fn handle_search<S: KeyValueStore>(query: &str, planner: &mut Planner<S>) -> Result<(), CliError> {
    planner.set_search_query(query);
    print!("{}", format_catalog(planner));

    let query = planner.search().clone();
    for (key, tasks) in planner.tasks().buckets() {
        let hits = filter_tasks(tasks, &query);
        if !hits.is_empty() {
            println!("{}", key);
            print!("{}", format_tasks(&hits));
        }
    }
    Ok(())
}

/// Handle `import`
pub fn handle_import<S: KeyValueStore>(
    args: ImportArgs,
    service: &dyn OutlineService,
    planner: &mut Planner<S>,
) -> Result<(), CliError> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let ids = planner.import_text(service, &raw)?;
    if ids.is_empty() {
        println!("Nothing to import");
    } else {
        println!("Imported {} subject(s)", ids.len());
        for id in ids {
            if let Some(subject) = planner.catalog().subject(&id) {
                println!("  {}  ({})", subject.name, subject.id);
            }
        }
    }
    Ok(())
}

/// Handle `outline`
pub fn handle_outline(subject: &str, topic: &str, service: &dyn OutlineService) -> Result<(), CliError> {
    let outline = service.lesson_outline(subject, topic)?;
    println!("{}", outline);
    Ok(())
}

/// Visible catalog under the planner's current search, as an indented tree
pub fn format_catalog<S: KeyValueStore>(planner: &Planner<S>) -> String {
    let mut out = String::new();
    let views = planner.visible_subjects();
    if views.is_empty() {
        out.push_str("No subjects\n");
        return out;
    }
    for view in views {
        let _ = writeln!(out, "{}  ({}, {})", view.subject.name, view.subject.id, view.subject.icon);
        if view.has_no_visible_content() {
            out.push_str("    (no matching modules)\n");
        }
        for module in &view.modules {
            let _ = writeln!(out, "  {}  ({})", module.module.name, module.module.id);
            for lesson in &module.lessons {
                match lesson.url() {
                    Some(url) => {
                        let _ = writeln!(out, "    - {}  <{}>  ({})", lesson.name, url, lesson.id);
                    }
                    None => {
                        let _ = writeln!(out, "    - {}  ({})", lesson.name, lesson.id);
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::store::MemoryStore;

    fn planner() -> Planner<MemoryStore> {
        Planner::load_with_ids(MemoryStore::new(), Box::new(SequentialIds::new())).unwrap()
    }

    #[test]
    fn test_resolve_date_key_normalizes() {
        assert_eq!(resolve_date_key("2024-05-09").unwrap(), "2024-5-9");
        assert_eq!(resolve_date_key("backlog").unwrap(), BACKLOG_KEY);
        assert_eq!(resolve_date_key("today").unwrap(), date_key(today()));
        assert!(matches!(resolve_date_key("tomorrow"), Err(CliError::DateParseError(_))));
    }

    #[test]
    fn test_stale_id_reports_not_found() {
        let mut planner = planner();
        let result = handle_task(
            TaskCommand::Toggle {
                date: "2024-5-9".to_string(),
                id: "t-99".to_string(),
            },
            &mut planner,
        );
        assert!(matches!(result, Err(CliError::NotFound(_))));
    }

    #[test]
    fn test_format_catalog_respects_search() {
        let mut planner = planner();
        planner.add_lesson("s1", "m1", "Biến và kiểu", Some("https://a.example")).unwrap();
        planner.set_search_query("biến");

        let tree = format_catalog(&planner);
        assert!(tree.contains("SNLT"));
        assert!(tree.contains("Biến và kiểu  <https://a.example>"));
        assert!(!tree.contains("TGVVTM"));
    }
}
