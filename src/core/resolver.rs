//! Classifies a typed command name into an execution strategy.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::commands::BuiltinTable;
use super::config::Config;

/// How a discovered script is launched. Resolved once, at classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterKind {
    /// `.py`, run through the configured Python interpreter.
    NativeScript,
    /// `.bat`, run directly. Windows only.
    Batch,
    /// `.sh`, run through `bash`. Not on Windows.
    PosixShell,
}

/// Probe order within one search directory.
#[cfg(windows)]
pub const EXTENSION_PRIORITY: [InterpreterKind; 2] =
    [InterpreterKind::NativeScript, InterpreterKind::Batch];
#[cfg(not(windows))]
pub const EXTENSION_PRIORITY: [InterpreterKind; 2] =
    [InterpreterKind::NativeScript, InterpreterKind::PosixShell];

impl InterpreterKind {
    pub fn extension(self) -> &'static str {
        match self {
            InterpreterKind::NativeScript => "py",
            InterpreterKind::Batch => "bat",
            InterpreterKind::PosixShell => "sh",
        }
    }

    pub fn supported_on_host(self) -> bool {
        match self {
            InterpreterKind::NativeScript => true,
            InterpreterKind::Batch => cfg!(windows),
            InterpreterKind::PosixShell => !cfg!(windows),
        }
    }

    /// Kind for `path`, or `None` when the extension is unknown or the
    /// interpreter does not fit this platform.
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let kind = match ext.as_str() {
            "py" => InterpreterKind::NativeScript,
            "bat" => InterpreterKind::Batch,
            "sh" => InterpreterKind::PosixShell,
            _ => return None,
        };
        kind.supported_on_host().then_some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLocation {
    /// Registered name of the built-in (aliases already followed).
    Builtin(String),
    Script { path: PathBuf, kind: InterpreterKind },
    Unresolved,
}

/// A submitted line split on whitespace. No quoting: an argument never
/// contains whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// `None` for a blank line. `name` is case-folded.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let name = parts.next()?.to_lowercase();
        Some(CommandLine {
            name,
            args: parts.map(String::from).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    builtins: BuiltinTable,
    script_aliases: BTreeMap<String, PathBuf>,
    search_dirs: Vec<PathBuf>,
    root_boundary: Option<PathBuf>,
}

impl Resolver {
    /// Splits configured aliases into built-in aliases (target names a
    /// registered built-in) and script aliases (anything else is a path).
    /// `root_boundary` must already be canonical.
    pub fn new(config: &Config, mut builtins: BuiltinTable, root_boundary: Option<PathBuf>) -> Self {
        let mut script_aliases = BTreeMap::new();
        for (alias, target) in &config.aliases {
            if !builtins.register_alias(alias, target) {
                script_aliases.insert(alias.clone(), PathBuf::from(target));
            }
        }

        Resolver {
            builtins,
            script_aliases,
            search_dirs: config.search_dirs.clone(),
            root_boundary,
        }
    }

    pub fn builtins(&self) -> &BuiltinTable {
        &self.builtins
    }

    pub fn builtins_mut(&mut self) -> &mut BuiltinTable {
        &mut self.builtins
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Built-ins first, then script aliases, then the search directories in
    /// order with [`EXTENSION_PRIORITY`] inside each. First hit wins.
    pub fn resolve(&self, name: &str) -> CommandLocation {
        let name = name.to_lowercase();

        if let Some(builtin) = self.builtins.canonical_name(&name) {
            return CommandLocation::Builtin(builtin.to_string());
        }

        if let Some(path) = self.script_aliases.get(&name) {
            return match self.script_at(path) {
                Some(location) => location,
                None => {
                    debug!(alias = %name, path = %path.display(), "alias target unusable");
                    CommandLocation::Unresolved
                }
            };
        }

        if !is_plain_name(&name) {
            return CommandLocation::Unresolved;
        }

        for dir in &self.search_dirs {
            for kind in EXTENSION_PRIORITY {
                let file_name = format!("{}.{}", name, kind.extension());
                let Some(candidate) = find_script_file(dir, &file_name) else {
                    continue;
                };
                if let Some(location) = self.script_at(&candidate) {
                    return location;
                }
            }
        }
        CommandLocation::Unresolved
    }

    /// Every name `resolve` would classify as something other than
    /// `Unresolved`, with a short description.
    pub fn known_commands(&self) -> BTreeMap<String, String> {
        let mut stems = BTreeSet::new();
        for dir in &self.search_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                let (Some(kind), Some(stem)) = (InterpreterKind::for_path(&path), path.file_stem())
                else {
                    continue;
                };
                if EXTENSION_PRIORITY.contains(&kind) {
                    stems.insert(stem.to_string_lossy().to_lowercase());
                }
            }
        }

        let mut known = BTreeMap::new();
        for stem in stems {
            if stem.contains(char::is_whitespace) {
                continue;
            }
            if let CommandLocation::Script { path, kind } = self.resolve(&stem) {
                let dir = path.parent().unwrap_or(Path::new(""));
                known.insert(stem, format!("{} script in {}", kind.extension(), dir.display()));
            }
        }
        for (alias, path) in &self.script_aliases {
            if self.script_at(path).is_some() {
                known.insert(alias.clone(), format!("alias for {}", path.display()));
            }
        }
        for (alias, target) in self.builtins.aliases() {
            known.insert(alias.to_string(), format!("alias for {target}"));
        }
        for (name, description) in self.builtins.entries() {
            known.insert(name.to_string(), description.to_string());
        }
        known
    }

    fn script_at(&self, path: &Path) -> Option<CommandLocation> {
        if !path.is_file() {
            return None;
        }
        let kind = InterpreterKind::for_path(path)?;

        if let Some(root) = &self.root_boundary {
            let canonical = fs::canonicalize(path).ok()?;
            if !canonical.starts_with(root) {
                warn!(path = %path.display(), "script outside root boundary ignored");
                return None;
            }
        }
        Some(CommandLocation::Script {
            path: path.to_path_buf(),
            kind,
        })
    }
}

/// `dir/file_name`, matching the on-disk name without regard to case.
/// `file_name` must already be lowercase. An exact match wins; among case
/// variants the lexically smallest path is taken.
fn find_script_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let exact = dir.join(file_name);
    if exact.is_file() {
        return Some(exact);
    }

    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().to_lowercase() == file_name)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .min()
}

/// Names that cannot walk out of a search directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}
