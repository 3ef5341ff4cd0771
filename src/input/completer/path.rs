use std::{
    fs,
    path::{Path, PathBuf},
};

use rustyline::completion::Pair;

/// Completes file and directory names relative to the session's working
/// directory rather than the process's.
#[derive(Clone, Default)]
pub struct PathCompleter {
    cwd: PathBuf,
}

impl PathCompleter {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = cwd.into();
    }

    pub fn complete_path(&self, incomplete: &str) -> Vec<Pair> {
        let (typed_dir, file_prefix) = split_input(incomplete);
        let dir_to_search = if typed_dir.is_absolute() {
            typed_dir.clone()
        } else {
            self.cwd.join(&typed_dir)
        };

        let Ok(entries) = fs::read_dir(&dir_to_search) else {
            return Vec::new();
        };

        let mut matches: Vec<Pair> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if !name.starts_with(&file_prefix) {
                    return None;
                }
                Some(completion_pair(&typed_dir, &name, entry.path().is_dir()))
            })
            .collect();

        matches.sort_by(|a, b| a.display.cmp(&b.display));
        matches
    }
}

/// Splits typed text into the directory part as typed and the name prefix.
fn split_input(incomplete: &str) -> (PathBuf, String) {
    if incomplete.is_empty() {
        return (PathBuf::new(), String::new());
    }
    if incomplete.ends_with('/') {
        return (PathBuf::from(incomplete), String::new());
    }

    let path = Path::new(incomplete);
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let prefix = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    (parent, prefix)
}

fn completion_pair(typed_dir: &Path, name: &str, is_dir: bool) -> Pair {
    let relative_path = if typed_dir.as_os_str().is_empty() {
        name.to_string()
    } else {
        typed_dir.join(name).to_string_lossy().into_owned()
    };

    if is_dir {
        Pair {
            display: format!("{}/", relative_path),
            replacement: format!("{}/", relative_path),
        }
    } else {
        Pair {
            display: relative_path.clone(),
            replacement: format!("{} ", relative_path),
        }
    }
}
