//! Terminal front end: command language and session state
//!
//! A [`Session`] plays the part of the club manager window. It owns the registry and the
//! store, keeps one member form in focus, and turns parsed [`ShellCommand`]s into
//! [`Reply`] values. Rendering and the interactive search retry loop belong to the
//! binary; nothing here prints.

use club_types::{FieldName, MemberHandle, MemberKind, ParseNameError};
use thiserror::Error;
use tracing::warn;

use crate::error::{CommitError, PersistenceError, RollbackError, StageError};
use crate::member::Member;
use crate::persistence::MemberStore;
use crate::registry::{MemberSummary, Registry, SearchOutcome};

// =============================================================================
// COMMANDS
// =============================================================================

/// One line of shell input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Open a blank form of a kind
    Add(MemberKind),
    /// Type into a field of the focused form
    Set { field: FieldName, value: String },
    /// Redisplay the focused form
    Show,
    /// Commit the focused form
    Ok,
    /// Roll the focused form back
    Cancel,
    /// Look a member up by credential
    Search(String),
    /// `search` without a key: ask for keys until one matches or the user gives up
    SearchPrompt,
    List,
    /// Focus the member at a listing position
    Open(usize),
    Save,
    /// Allow saving over a member file that failed to load
    Overwrite,
    /// Save and leave
    Exit,
    Help,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for the list")]
    UnknownCommand(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error(transparent)]
    BadName(#[from] ParseNameError),

    #[error("'{0}' is not a listing position")]
    BadPosition(String),
}

/// Parse one line of shell input
pub fn parse_line(line: &str) -> Result<ShellCommand, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "add" | "new" => {
            let kind = required(rest, "add", "a member kind (person, soldier, student)")?;
            Ok(ShellCommand::Add(kind.parse()?))
        }
        "set" => {
            let rest = required(rest, "set", "a field name and a value")?;
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((field, value)) => (field, value.trim()),
                None => (rest, ""),
            };
            Ok(ShellCommand::Set {
                field: field.parse()?,
                value: value.to_string(),
            })
        }
        "show" => Ok(ShellCommand::Show),
        "ok" | "commit" => Ok(ShellCommand::Ok),
        "cancel" | "rollback" => Ok(ShellCommand::Cancel),
        "search" | "find" => match rest {
            "" => Ok(ShellCommand::SearchPrompt),
            key => Ok(ShellCommand::Search(key.to_string())),
        },
        "list" | "ls" => Ok(ShellCommand::List),
        "open" => {
            let position = required(rest, "open", "a listing position")?;
            position
                .parse()
                .map(ShellCommand::Open)
                .map_err(|_| CommandError::BadPosition(position.to_string()))
        }
        "save" => Ok(ShellCommand::Save),
        "overwrite" => Ok(ShellCommand::Overwrite),
        "exit" | "quit" => Ok(ShellCommand::Exit),
        "help" | "?" => Ok(ShellCommand::Help),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

/// Command reference shown by `help`
pub const HELP: &[(&str, &str)] = &[
    ("add <kind>", "open a blank person, soldier or student form"),
    ("set <field> <value>", "type a value into the focused form"),
    ("show", "show the focused form"),
    ("ok", "validate and commit the focused form"),
    ("cancel", "discard edits on the focused form"),
    ("search [key]", "find a member by id, personal number or student number"),
    ("list", "list all members"),
    ("open <n>", "focus the member at listing position n"),
    ("save", "write all members to the member file"),
    ("overwrite", "allow saving over a member file that failed to load"),
    ("exit", "save and exit"),
];

// =============================================================================
// SESSION
// =============================================================================

/// Snapshot of one member form for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub handle: MemberHandle,
    pub kind: MemberKind,
    /// Draft values in declaration order, unset fields as `""`
    pub fields: Vec<(FieldName, String)>,
    pub error_mark: Option<FieldName>,
    pub can_cancel: bool,
}

impl FormView {
    pub fn of(member: &Member) -> Self {
        let draft = member.draft();
        Self {
            handle: member.handle(),
            kind: member.kind(),
            fields: member
                .kind()
                .fields()
                .iter()
                .map(|f| (*f, draft.get(*f).unwrap_or_default().to_string()))
                .collect(),
            error_mark: member.error_mark(),
            can_cancel: member.can_cancel(),
        }
    }
}

/// What a command produced
#[derive(Debug)]
pub enum Reply {
    Form(FormView),
    Staged(FieldName),
    Committed(MemberHandle),
    RolledBack(MemberHandle),
    Found(FormView),
    NotFound(String),
    /// The caller should ask for search keys
    PromptForKey,
    Listing(Vec<MemberSummary>),
    Saved(usize),
    OverwriteAllowed,
    /// Members were saved; the caller should stop
    Exit(usize),
    Help,
}

/// Why a command could not be carried out
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no member form is open; use 'add', 'search' or 'open' first")]
    NoFocus,

    #[error("no member at position {0}")]
    NoSuchPosition(usize),

    #[error(transparent)]
    Stage(#[from] StageError),

    /// The form stays open; the focused form carries the error mark
    #[error("{error}")]
    Rejected { error: CommitError, form: FormView },

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{store} could not be loaded and saving would replace it; use 'overwrite' to save anyway")]
    SaveBlocked { store: String },
}

/// Registry, store and the focused form
pub struct Session<S: MemberStore> {
    registry: Registry,
    store: S,
    focus: Option<MemberHandle>,
    /// Set when the store could not be read; saves are refused until lifted
    save_blocked: bool,
}

impl<S: MemberStore> Session<S> {
    pub fn new(registry: Registry, store: S) -> Self {
        Self {
            registry,
            store,
            focus: None,
            save_blocked: false,
        }
    }

    /// Load the registry from `store`.
    ///
    /// A read failure is returned next to an empty session so the caller can report it
    /// and keep going. Such a session refuses to save over the unread file until
    /// [`Session::allow_overwrite`] is called.
    pub fn open(store: S) -> (Self, Option<PersistenceError>) {
        match Registry::load(&store) {
            Ok(registry) => (Self::new(registry, store), None),
            Err(err) => {
                warn!(error = %err, "starting with an empty registry");
                let mut session = Self::new(Registry::new(), store);
                session.save_blocked = true;
                (session, Some(err))
            }
        }
    }

    pub fn save_blocked(&self) -> bool {
        self.save_blocked
    }

    /// Let the next save replace a member file that failed to load
    pub fn allow_overwrite(&mut self) {
        if self.save_blocked {
            warn!(store = %self.store.describe(), "overwrite of unreadable member file allowed");
        }
        self.save_blocked = false;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn focus(&self) -> Option<MemberHandle> {
        self.focus
    }

    pub fn focused_form(&self) -> Option<FormView> {
        self.focus
            .and_then(|handle| self.registry.get(handle))
            .map(FormView::of)
    }

    fn focused(&self) -> Result<MemberHandle, SessionError> {
        self.focus.ok_or(SessionError::NoFocus)
    }

    fn form(&self, handle: MemberHandle) -> Result<FormView, SessionError> {
        self.registry
            .get(handle)
            .map(FormView::of)
            .ok_or(SessionError::Stage(StageError::UnknownMember(handle)))
    }

    pub fn save(&self) -> Result<usize, SessionError> {
        if self.save_blocked {
            return Err(SessionError::SaveBlocked {
                store: self.store.describe(),
            });
        }
        self.registry.save(&self.store)?;
        Ok(self.registry.len())
    }

    pub fn execute(&mut self, command: ShellCommand) -> Result<Reply, SessionError> {
        match command {
            ShellCommand::Add(kind) => {
                let handle = self.registry.add_member(kind);
                self.focus = Some(handle);
                Ok(Reply::Form(self.form(handle)?))
            }
            ShellCommand::Set { field, value } => {
                let handle = self.focused()?;
                self.registry.stage(handle, field, value)?;
                Ok(Reply::Staged(field))
            }
            ShellCommand::Show => Ok(Reply::Form(self.form(self.focused()?)?)),
            ShellCommand::Ok => {
                let handle = self.focused()?;
                match self.registry.commit(handle) {
                    Ok(()) => {
                        self.focus = None;
                        Ok(Reply::Committed(handle))
                    }
                    Err(error) => Err(SessionError::Rejected {
                        error,
                        form: self.form(handle)?,
                    }),
                }
            }
            ShellCommand::Cancel => {
                let handle = self.focused()?;
                self.registry.rollback(handle)?;
                self.focus = None;
                Ok(Reply::RolledBack(handle))
            }
            ShellCommand::Search(key) => match self.registry.search(&key) {
                SearchOutcome::Found(handle) => {
                    self.focus = Some(handle);
                    Ok(Reply::Found(self.form(handle)?))
                }
                SearchOutcome::NotFound => Ok(Reply::NotFound(key)),
            },
            ShellCommand::SearchPrompt => Ok(Reply::PromptForKey),
            ShellCommand::List => Ok(Reply::Listing(self.registry.summaries())),
            ShellCommand::Open(position) => {
                let handle = self
                    .registry
                    .at(position)
                    .map(Member::handle)
                    .ok_or(SessionError::NoSuchPosition(position))?;
                if let Some(member) = self.registry.get_mut(handle) {
                    member.show();
                }
                self.focus = Some(handle);
                Ok(Reply::Form(self.form(handle)?))
            }
            ShellCommand::Save => Ok(Reply::Saved(self.save()?)),
            ShellCommand::Overwrite => {
                self.allow_overwrite();
                Ok(Reply::OverwriteAllowed)
            }
            ShellCommand::Exit => Ok(Reply::Exit(self.save()?)),
            ShellCommand::Help => Ok(Reply::Help),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::FileStore;
    use tempfile::TempDir;

    fn session(temp: &TempDir) -> Session<FileStore> {
        let (session, err) = Session::open(FileStore::new(temp.path().join("members.dat")));
        assert!(err.is_none());
        session
    }

    fn run(session: &mut Session<FileStore>, lines: &[&str]) {
        for line in lines {
            session
                .execute(parse_line(line).unwrap())
                .unwrap_or_else(|e| panic!("{line}: {e}"));
        }
    }

    const JOHN: &[&str] = &[
        "add person",
        "set id 1-2345678|2",
        "set name John",
        "set surname Doe",
        "set tel +(1)23-4567890",
    ];

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_line("add Soldier").unwrap(),
            ShellCommand::Add(MemberKind::Soldier)
        );
        assert_eq!(
            parse_line("  set personal-num   R/1234567 ").unwrap(),
            ShellCommand::Set {
                field: FieldName::PersonalNum,
                value: "R/1234567".to_string()
            }
        );
        assert_eq!(
            parse_line("set name").unwrap(),
            ShellCommand::Set {
                field: FieldName::Name,
                value: String::new()
            }
        );
        assert_eq!(parse_line("search").unwrap(), ShellCommand::SearchPrompt);
        assert_eq!(
            parse_line("search 12345").unwrap(),
            ShellCommand::Search("12345".to_string())
        );
        assert_eq!(parse_line("open 3").unwrap(), ShellCommand::Open(3));
        assert_eq!(parse_line("OK").unwrap(), ShellCommand::Ok);
        assert_eq!(parse_line("overwrite").unwrap(), ShellCommand::Overwrite);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_line("dance"),
            Err(CommandError::UnknownCommand("dance".to_string()))
        );
        assert!(matches!(
            parse_line("add"),
            Err(CommandError::MissingArgument { command: "add", .. })
        ));
        assert!(matches!(parse_line("add robot"), Err(CommandError::BadName(_))));
        assert!(matches!(parse_line("set email x"), Err(CommandError::BadName(_))));
        assert_eq!(
            parse_line("open two"),
            Err(CommandError::BadPosition("two".to_string()))
        );
    }

    #[test]
    fn test_add_and_commit_clears_focus() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        run(&mut session, JOHN);
        assert!(session.focus().is_some());

        let reply = session.execute(ShellCommand::Ok).unwrap();
        assert!(matches!(reply, Reply::Committed(_)));
        assert!(session.focus().is_none());
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_rejected_commit_keeps_form_with_mark() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        run(&mut session, JOHN);
        run(&mut session, &["set tel 555"]);

        match session.execute(ShellCommand::Ok) {
            Err(SessionError::Rejected { form, .. }) => {
                assert_eq!(form.error_mark, Some(FieldName::Tel));
                assert!(!form.can_cancel);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(session.focus().is_some());
    }

    #[test]
    fn test_cancel_on_new_form_is_refused() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        run(&mut session, &["add student"]);
        assert!(matches!(
            session.execute(ShellCommand::Cancel),
            Err(SessionError::Rollback(RollbackError::NeverCommitted))
        ));
        assert!(session.focus().is_some());
    }

    #[test]
    fn test_search_then_edit_then_cancel() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        run(&mut session, JOHN);
        run(&mut session, &["ok", "search 1-2345678|2", "set name Johnny"]);

        let form = session.focused_form().unwrap();
        assert_eq!(form.fields[1], (FieldName::Name, "Johnny".to_string()));

        run(&mut session, &["cancel", "search 1-2345678|2"]);
        let form = session.focused_form().unwrap();
        assert_eq!(form.fields[1], (FieldName::Name, "John".to_string()));
    }

    #[test]
    fn test_search_miss_keeps_key() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        match session.execute(ShellCommand::Search("42".to_string())).unwrap() {
            Reply::NotFound(key) => assert_eq!(key, "42"),
            other => panic!("expected miss, got {other:?}"),
        }
    }

    #[test]
    fn test_commands_without_focus() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        for command in [ShellCommand::Show, ShellCommand::Ok, ShellCommand::Cancel] {
            assert!(matches!(
                session.execute(command),
                Err(SessionError::NoFocus)
            ));
        }
        assert!(matches!(
            session.execute(ShellCommand::Open(0)),
            Err(SessionError::NoSuchPosition(0))
        ));
    }

    #[test]
    fn test_exit_saves_and_reload_drops_abandoned_drafts() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        run(&mut session, JOHN);
        run(&mut session, &["ok", "add soldier", "set name Dana"]);

        match session.execute(ShellCommand::Exit).unwrap() {
            Reply::Exit(saved) => assert_eq!(saved, 2),
            other => panic!("expected exit, got {other:?}"),
        }

        let reopened = self::session(&temp);
        assert_eq!(reopened.registry().len(), 1);
        assert!(reopened.registry().find("1-2345678|2").is_some());
    }

    #[test]
    fn test_corrupt_file_is_reported_and_session_still_works() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("members.dat");
        std::fs::write(&path, b"\xff\xff\xff\xff not a snapshot").unwrap();

        let (mut session, err) = Session::open(FileStore::new(&path));
        assert!(matches!(err, Some(PersistenceError::Corrupt { .. })), "{err:?}");
        assert!(session.registry().is_empty());
        assert!(session.save_blocked());

        run(&mut session, JOHN);
        run(&mut session, &["ok", "search 1-2345678|2"]);
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_newer_member_file_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("members.dat");
        let mut first = session(&temp);
        run(&mut first, JOHN);
        run(&mut first, &["ok", "save"]);

        // bump the leading little-endian format_version
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] += 1;
        std::fs::write(&path, &bytes).unwrap();

        let (mut session, err) = Session::open(FileStore::new(&path));
        assert!(matches!(
            err,
            Some(PersistenceError::IncompatibleVersion { .. })
        ));
        run(
            &mut session,
            &[
                "add person",
                "set id 3-2345678|2",
                "set name Avi",
                "set surname Cohen",
                "set tel +(1)23-4567890",
                "ok",
            ],
        );
        for command in [ShellCommand::Save, ShellCommand::Exit] {
            assert!(matches!(
                session.execute(command),
                Err(SessionError::SaveBlocked { .. })
            ));
        }
        assert!(session.save().is_err());
        assert_eq!(std::fs::read(&path).unwrap(), bytes);

        run(&mut session, &["overwrite"]);
        assert_eq!(session.save().unwrap(), 1);
        assert_ne!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_failed_exit_keeps_members_for_retry() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("members.dat");
        let mut session = session(&temp);
        run(&mut session, JOHN);
        run(&mut session, &["ok"]);

        // a directory where the file should be
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(
            session.execute(ShellCommand::Exit),
            Err(SessionError::Persistence(PersistenceError::Write { .. }))
        ));
        assert_eq!(session.registry().len(), 1);

        std::fs::remove_dir(&path).unwrap();
        match session.execute(ShellCommand::Exit).unwrap() {
            Reply::Exit(saved) => assert_eq!(saved, 1),
            other => panic!("expected exit, got {other:?}"),
        }
        assert!(self::session(&temp).registry().find("1-2345678|2").is_some());
    }

    #[test]
    fn test_open_focuses_listing_position() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&temp);
        run(&mut session, JOHN);
        run(&mut session, &["ok", "open 0"]);
        let form = session.focused_form().unwrap();
        assert!(form.can_cancel);
        assert!(session.registry().at(0).unwrap().is_open());
    }
}
