//! Club Registry Command Line Interface
//!
//! Manage club members from the terminal. Without a subcommand an interactive shell
//! starts, standing in for the club manager window and its member forms.
//!
//! # Usage
//!
//! ```bash
//! # Interactive shell (add / set / ok / cancel / search / list / exit)
//! club_cli
//!
//! # Add a member in one go
//! club_cli add soldier --id '2-1111111|3' --name Dana --surname Levi \
//!     --tel '+(972)4-8123456' --personal-num R/1234567
//!
//! # Look a member up by id, personal number or student number
//! club_cli search 12345
//!
//! # List members as JSON
//! club_cli list -o json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use club_registry::config::DEFAULT_LOG_FILTER;
use club_registry::console::{parse_line, FormView, Reply, Session, SessionError, ShellCommand, HELP};
use club_registry::{ClubConfig, FieldName, FileStore, MemberKind, MemberSummary};

#[derive(Parser)]
#[command(name = "club_cli")]
#[command(version)]
#[command(about = "Club member registry: add, edit and search club members")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Member file to load and save
    #[arg(long, short = 'f', global = true, env = "CLUB_DATA_FILE")]
    data_file: Option<PathBuf>,

    /// Log filter (tracing EnvFilter syntax)
    #[arg(long, global = true, env = "CLUB_LOG")]
    log: Option<String>,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a member and commit it
    Add {
        /// Member kind: person, soldier or student
        kind: MemberKind,

        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        surname: String,

        #[arg(long)]
        tel: String,

        /// Soldier's personal number (e.g. R/1234567)
        #[arg(long)]
        personal_num: Option<String>,

        /// Student id (e.g. ABC/12345)
        #[arg(long)]
        student_id: Option<String>,
    },

    /// Find a member by id, personal number or student number
    Search {
        key: String,
    },

    /// List all members
    List,

    /// Interactive shell (the default)
    Shell,
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.format == OutputFormat::Text {
        colored::control::set_override(false);
    }

    let mut config = ClubConfig::from_env();
    if let Some(data_file) = cli.data_file.clone() {
        config = config.with_data_file(data_file);
    }
    if let Some(log) = cli.log.clone() {
        config = config.with_log_filter(log);
    }
    init_tracing(&config.log_filter);

    let (mut session, load_error) = Session::open(FileStore::new(&config.data_file));
    if let Some(err) = load_error {
        print_error(&err.to_string());
    }

    let result = match cli.command {
        Some(Commands::Add {
            kind,
            id,
            name,
            surname,
            tel,
            personal_num,
            student_id,
        }) => {
            let mut fields = vec![
                (FieldName::Id, id),
                (FieldName::Name, name),
                (FieldName::Surname, surname),
                (FieldName::Tel, tel),
            ];
            fields.extend(personal_num.map(|v| (FieldName::PersonalNum, v)));
            fields.extend(student_id.map(|v| (FieldName::StudentId, v)));
            cmd_add(&mut session, kind, fields, cli.format)
        }
        Some(Commands::Search { key }) => cmd_search(&mut session, key, cli.format),
        Some(Commands::List) => cmd_list(&session, cli.format),
        Some(Commands::Shell) | None => run_shell(&mut session),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
            } else {
                print_error(&format!("{e:#}"));
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_add(
    session: &mut Session<FileStore>,
    kind: MemberKind,
    fields: Vec<(FieldName, String)>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        !session.save_blocked(),
        "member file could not be loaded; not adding so it is not overwritten"
    );
    session.execute(ShellCommand::Add(kind))?;
    for (field, value) in fields {
        session.execute(ShellCommand::Set { field, value })?;
    }

    let outcome = session.execute(ShellCommand::Ok);
    // the draft is saved either way; a rejected one is dropped on the next load
    session.save().context("saving member file")?;

    match outcome {
        Ok(Reply::Committed(handle)) => {
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "success": true, "handle": handle.to_string() })
                ),
                OutputFormat::Text | OutputFormat::Pretty => {
                    println!("{} {} member {}", "OK".green(), kind, handle)
                }
            }
            Ok(())
        }
        Ok(other) => anyhow::bail!("unexpected reply to commit: {other:?}"),
        Err(SessionError::Rejected { error, form }) => {
            if format != OutputFormat::Json {
                print_form(&form);
            }
            Err(error).context("member not added")
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_search(
    session: &mut Session<FileStore>,
    key: String,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match session.execute(ShellCommand::Search(key))? {
        Reply::Found(form) => {
            match format {
                OutputFormat::Json => println!("{}", form_json(&form)),
                OutputFormat::Text | OutputFormat::Pretty => print_form(&form),
            }
            Ok(())
        }
        Reply::NotFound(key) => anyhow::bail!("clubber with key {key} does not exist"),
        other => anyhow::bail!("unexpected reply to search: {other:?}"),
    }
}

fn cmd_list(session: &Session<FileStore>, format: OutputFormat) -> anyhow::Result<()> {
    let rows = session.registry().summaries();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("JSON serialization failed")?
        ),
        OutputFormat::Text | OutputFormat::Pretty => print_listing(&rows),
    }
    Ok(())
}

// =============================================================================
// INTERACTIVE SHELL
// =============================================================================

fn run_shell(session: &mut Session<FileStore>) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new().context("terminal not available")?;
    println!(
        "{} {} member(s) loaded. Type {} for commands.",
        "Club manager.".cyan().bold(),
        session.registry().len(),
        "help".bold()
    );

    loop {
        let prompt = match session.focused_form() {
            Some(form) => format!("club [{}]> ", form.kind),
            None => "club> ".to_string(),
        };

        let mut end_of_input = false;
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("Use {} to save and leave.", "exit".bold());
                continue;
            }
            // end of input behaves like "save & exit"
            Err(ReadlineError::Eof) => {
                end_of_input = true;
                "exit".to_string()
            }
            Err(e) => return Err(e).context("reading input"),
        };
        if line.trim().is_empty() {
            continue;
        }
        editor.add_history_entry(line.as_str()).ok();

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                print_error(&e.to_string());
                continue;
            }
        };

        match session.execute(command.clone()) {
            Ok(Reply::PromptForKey) => search_loop(&mut editor, session)?,
            Ok(Reply::Exit(count)) => {
                println!("Saved {count} member(s). Bye.");
                return Ok(());
            }
            Ok(reply) => print_reply(&reply),
            Err(e) if command == ShellCommand::Exit => exit_failed(e, end_of_input)?,
            Err(e) => print_session_error(&e),
        }
    }
}

/// `exit` could not save. The shell keeps running so the user can retry; with no input
/// left the members are lost, so that is an error.
fn exit_failed(error: SessionError, end_of_input: bool) -> anyhow::Result<()> {
    if end_of_input {
        return Err(error).context("input ended before the members could be saved");
    }
    print_session_error(&error);
    println!(
        "Members are still in memory. Fix the problem and {} again.",
        "exit".bold()
    );
    Ok(())
}

/// Ask for keys until one matches. Giving up saves the registry.
fn search_loop(editor: &mut DefaultEditor, session: &mut Session<FileStore>) -> anyhow::Result<()> {
    loop {
        let key = match editor.readline("Please enter the clubber's key: ") {
            Ok(key) if !key.trim().is_empty() => key.trim().to_string(),
            Ok(_) | Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                match session.save() {
                    Ok(count) => println!("Saved {count} member(s)."),
                    Err(e) => print_session_error(&e),
                }
                return Ok(());
            }
            Err(e) => return Err(e).context("reading search key"),
        };

        match session.execute(ShellCommand::Search(key)) {
            Ok(Reply::Found(form)) => {
                print_form(&form);
                return Ok(());
            }
            Ok(Reply::NotFound(key)) => {
                println!("{} clubber with key {} does not exist", "!".yellow(), key)
            }
            Ok(reply) => print_reply(&reply),
            Err(e) => print_session_error(&e),
        }
    }
}

// =============================================================================
// RENDERING
// =============================================================================

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Form(form) | Reply::Found(form) => print_form(form),
        Reply::Staged(field) => println!("  {} updated", field.label()),
        Reply::Committed(handle) => println!("{} member {} saved to the club", "OK".green(), handle),
        Reply::RolledBack(handle) => println!("Edits on member {} discarded", handle),
        Reply::NotFound(key) => println!("{} clubber with key {} does not exist", "!".yellow(), key),
        Reply::PromptForKey => {}
        Reply::Listing(rows) => print_listing(rows),
        Reply::Saved(count) | Reply::Exit(count) => println!("Saved {count} member(s)."),
        Reply::OverwriteAllowed => println!("The next save replaces the member file."),
        Reply::Help => {
            for (usage, description) in HELP {
                println!("  {:<22} {}", usage.bold(), description);
            }
        }
    }
}

fn print_form(form: &FormView) {
    println!("{}", format!("{} Clubber's Data", form.kind).cyan().bold());
    for (field, value) in &form.fields {
        let mark = if form.error_mark == Some(*field) {
            "*".red().bold().to_string()
        } else {
            " ".to_string()
        };
        println!("  {:>12}: {:<30} {}", field.label(), value, mark);
    }
    if !form.can_cancel {
        println!("  {}", "(new member: cancel is disabled until the first OK)".dimmed());
    }
}

fn print_listing(rows: &[MemberSummary]) {
    if rows.is_empty() {
        println!("No members.");
        return;
    }
    for row in rows {
        let id = row.id.as_deref().unwrap_or("-");
        let state = match row.state {
            club_registry::EditState::Committed => "committed".green(),
            club_registry::EditState::Draft => "draft".yellow(),
        };
        println!(
            "  [{}] {:<8} {:<14} {:<24} {}",
            row.position,
            row.kind.label(),
            id,
            row.name,
            state
        );
    }
}

fn print_session_error(error: &SessionError) {
    match error {
        SessionError::Rejected { error, form } => {
            print_form(form);
            print_error(&error.to_string());
        }
        other => print_error(&other.to_string()),
    }
}

fn print_error(message: &str) {
    eprintln!("{}: {}", "error".red().bold(), message);
}

fn form_json(form: &FormView) -> serde_json::Value {
    let fields: serde_json::Map<String, serde_json::Value> = form
        .fields
        .iter()
        .map(|(field, value)| (field.as_str().to_string(), value.clone().into()))
        .collect();
    serde_json::json!({
        "handle": form.handle.to_string(),
        "kind": form.kind.as_str(),
        "fields": fields,
    })
}
