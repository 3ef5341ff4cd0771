use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

mod cd;
mod clear;
mod exit;
mod help;

pub use cd::CdCommand;
pub use clear::ClearCommand;
pub use exit::ExitCommand;
pub use help::HelpCommand;

use super::session::{Session, SessionError};
use crate::shell::transcript::Transcript;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}: invalid arguments: {1}")]
    InvalidArguments(&'static str, String),
}

/// What a built-in may touch while it runs on the interactive task.
pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    pub transcript: &'a mut Transcript,
    /// Names the user can type, with a one-line description each.
    pub catalog: &'a BTreeMap<String, String>,
    exit_requested: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        session: &'a mut Session,
        transcript: &'a mut Transcript,
        catalog: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            session,
            transcript,
            catalog,
            exit_requested: false,
        }
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

/// A command implemented inside the shell rather than as a child process.
pub trait Command: Send + Sync {
    fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<(), CommandError>;

    fn description(&self) -> &str;
}

/// Name to built-in mapping. Hosts extend it with [`BuiltinTable::register`]
/// without touching dispatch.
#[derive(Clone, Default)]
pub struct BuiltinTable {
    commands: BTreeMap<String, Arc<dyn Command>>,
    aliases: BTreeMap<String, String>,
}

impl BuiltinTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// `cd` and `clear`.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register("cd", CdCommand::new());
        table.register("clear", ClearCommand);
        table
    }

    pub fn register(&mut self, name: &str, command: impl Command + 'static) {
        self.commands.insert(name.to_lowercase(), Arc::new(command));
    }

    /// Makes `alias` another name for the built-in `target`. Returns false
    /// when `target` is not registered.
    pub fn register_alias(&mut self, alias: &str, target: &str) -> bool {
        let target = target.to_lowercase();
        if !self.commands.contains_key(&target) {
            return false;
        }
        self.aliases.insert(alias.to_lowercase(), target);
        true
    }

    /// Registered name for `name` (already case-folded), following aliases.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.commands.get_key_value(name) {
            return Some(key);
        }
        self.aliases.get(name).map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        let canonical = self.canonical_name(name)?;
        self.commands.get(canonical).cloned()
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.canonical_name(name).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.commands
            .iter()
            .map(|(name, command)| (name.as_str(), command.description()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
    }
}

impl std::fmt::Debug for BuiltinTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinTable")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Command for Echo {
        fn execute(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<(), CommandError> {
            ctx.transcript
                .append_line(&args.join(" "), crate::shell::transcript::StyleTag::Plain);
            Ok(())
        }

        fn description(&self) -> &str {
            "Print the arguments"
        }
    }

    #[test]
    fn test_defaults_registered() {
        let table = BuiltinTable::with_defaults();
        assert!(table.is_builtin("cd"));
        assert!(table.is_builtin("clear"));
        assert!(!table.is_builtin("exit"));
        assert!(!table.is_builtin(""));
    }

    #[test]
    fn test_host_registration() {
        let mut table = BuiltinTable::with_defaults();
        table.register("Echo", Echo);
        assert!(table.is_builtin("echo"));
        assert_eq!(table.canonical_name("echo"), Some("echo"));
    }

    #[test]
    fn test_aliases() {
        let mut table = BuiltinTable::with_defaults();
        assert!(table.register_alias("cls", "CLEAR"));
        assert!(!table.register_alias("bogus", "missing"));

        assert_eq!(table.canonical_name("cls"), Some("clear"));
        assert!(table.get("cls").is_some());
        assert!(table.get("bogus").is_none());
    }

    #[test]
    fn test_registered_command_runs() {
        let mut table = BuiltinTable::new();
        table.register("echo", Echo);
        let temp = tempfile::tempdir().unwrap();
        let mut session = Session::new(temp.path(), None).unwrap();
        let mut transcript = Transcript::new();
        let catalog = BTreeMap::new();
        let mut ctx = CommandContext::new(&mut session, &mut transcript, &catalog);

        let command = table.get("echo").unwrap();
        command
            .execute(&mut ctx, &["hi".to_string(), "there".to_string()])
            .unwrap();
        assert_eq!(transcript.text(), "hi there\n");
    }
}
