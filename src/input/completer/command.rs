use std::collections::BTreeMap;

use rustyline::completion::Pair;

/// Completes the first word from the names the resolver knows about.
#[derive(Clone, Default)]
pub struct CommandCompleter {
    commands: BTreeMap<String, String>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the known names, typically with `Resolver::known_commands`.
    pub fn update_commands(&mut self, commands: BTreeMap<String, String>) {
        self.commands = commands;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn complete_command(&self, word: &str) -> Vec<Pair> {
        let input = word.trim().to_lowercase();

        self.commands
            .iter()
            .filter(|(name, _)| name.starts_with(&input))
            .map(|(name, description)| Pair {
                display: if description.starts_with("alias for") {
                    format!("{} (alias)", name)
                } else {
                    name.clone()
                },
                replacement: name.clone(),
            })
            .collect()
    }
}
