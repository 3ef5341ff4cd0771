//! Per-session state: the working directory and the optional root boundary.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, warn};

use super::config::Config;
use crate::path::{normalize_lexically, PathExpander};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cd: no such directory: {}", .0.display())]
    NoSuchDirectory(PathBuf),
    #[error("cd: outside of root boundary: {}", .0.display())]
    OutsideBoundary(PathBuf),
    #[error("cd: home directory not found")]
    HomeDirNotFound,
    #[error("root boundary {} does not exist or is not a directory", .0.display())]
    InvalidRoot(PathBuf),
    #[error("start directory {} does not exist or is not a directory", .0.display())]
    InvalidStart(PathBuf),
    #[error("start directory {} lies outside the root boundary", .0.display())]
    StartOutsideBoundary(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Session {
    working_directory: PathBuf,
    root_boundary: Option<PathBuf>,
    expander: PathExpander,
}

impl Session {
    /// Validates and canonicalizes the boundary and the start directory.
    /// Any failure here is fatal to startup.
    pub fn new(start: &Path, root_boundary: Option<&Path>) -> Result<Self, SessionError> {
        let root_boundary = match root_boundary {
            Some(root) => Some(
                canonical_dir(root).ok_or_else(|| SessionError::InvalidRoot(root.to_path_buf()))?,
            ),
            None => None,
        };

        let working_directory =
            canonical_dir(start).ok_or_else(|| SessionError::InvalidStart(start.to_path_buf()))?;

        let session = Session {
            working_directory,
            root_boundary,
            expander: PathExpander::new(),
        };
        if !session.within_boundary(&session.working_directory) {
            return Err(SessionError::StartOutsideBoundary(
                session.working_directory.clone(),
            ));
        }
        Ok(session)
    }

    /// Start directory precedence: `start`, then the boundary, then the
    /// process working directory.
    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        let start = match (&config.start_dir, &config.root_boundary) {
            (Some(start), _) => start.clone(),
            (None, Some(root)) => root.clone(),
            (None, None) => env::current_dir()?,
        };
        Self::new(&start, config.root_boundary.as_deref())
    }

    pub fn with_expander(mut self, expander: PathExpander) -> Self {
        self.expander = expander;
        self
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn root_boundary(&self) -> Option<&Path> {
        self.root_boundary.as_deref()
    }

    /// The prompt text, `<workingDirectory>>` with no trailing space.
    pub fn prompt(&self) -> String {
        format!("{}>", self.working_directory.display())
    }

    /// Component-wise containment check. `path` must already be canonical.
    pub fn within_boundary(&self, path: &Path) -> bool {
        match &self.root_boundary {
            Some(root) => path.starts_with(root),
            None => true,
        }
    }

    /// Implements the `cd` built-in. Multiple arguments are joined with
    /// spaces into a single path. State is untouched on error.
    pub fn change_directory(&mut self, args: &[String]) -> Result<&Path, SessionError> {
        let target = if args.is_empty() {
            self.expander
                .get_home_dir()
                .map_err(|_| SessionError::HomeDirNotFound)?
        } else {
            let joined = args.join(" ");
            let expanded = self
                .expander
                .expand(&joined)
                .map_err(|_| SessionError::HomeDirNotFound)?;
            self.working_directory.join(expanded)
        };

        let display_path = normalize_lexically(&target);
        let canonical =
            canonical_dir(&target).ok_or_else(|| SessionError::NoSuchDirectory(display_path.clone()))?;

        if !self.within_boundary(&canonical) {
            warn!(target = %canonical.display(), "cd rejected by root boundary");
            return Err(SessionError::OutsideBoundary(display_path));
        }

        debug!(from = %self.working_directory.display(), to = %canonical.display(), "cd");
        self.working_directory = canonical;
        Ok(&self.working_directory)
    }
}

/// Canonical form of `path` if it exists and is a directory.
fn canonical_dir(path: &Path) -> Option<PathBuf> {
    let canonical = fs::canonicalize(path).ok()?;
    canonical.is_dir().then_some(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(path: &Path) -> PathBuf {
        fs::canonicalize(path).unwrap()
    }

    #[test]
    fn test_cd_into_subdir() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        let mut session = Session::new(temp.path(), None).unwrap();

        session.change_directory(&["sub".to_string()]).unwrap();
        assert_eq!(session.working_directory(), canonical(&temp.path().join("sub")));
    }

    #[test]
    fn test_cd_joins_args_with_spaces() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("my games")).unwrap();
        let mut session = Session::new(temp.path(), None).unwrap();

        session
            .change_directory(&["my".to_string(), "games".to_string()])
            .unwrap();
        assert_eq!(
            session.working_directory(),
            canonical(&temp.path().join("my games"))
        );
    }

    #[test]
    fn test_cd_missing_leaves_state() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = Session::new(temp.path(), None).unwrap();
        let before = session.working_directory().to_path_buf();

        let err = session.change_directory(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, SessionError::NoSuchDirectory(_)));
        assert!(err.to_string().starts_with("cd: no such directory: "));
        assert!(err.to_string().ends_with("nope"));
        assert_eq!(session.working_directory(), before);
    }

    #[test]
    fn test_cd_onto_file_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("file.txt"), "x").unwrap();
        let mut session = Session::new(temp.path(), None).unwrap();

        assert!(matches!(
            session.change_directory(&["file.txt".to_string()]),
            Err(SessionError::NoSuchDirectory(_))
        ));
    }

    #[test]
    fn test_cd_without_args_goes_home() {
        let temp = tempfile::tempdir().unwrap();
        let home = temp.path().join("home");
        fs::create_dir(&home).unwrap();
        let mut session = Session::new(temp.path(), None)
            .unwrap()
            .with_expander(PathExpander::with_home(&home));

        session.change_directory(&[]).unwrap();
        assert_eq!(session.working_directory(), canonical(&home));
    }

    #[test]
    fn test_boundary_rejects_parent_escape() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("root");
        fs::create_dir(&root).unwrap();
        let mut session = Session::new(&root, Some(&root)).unwrap();

        let err = session.change_directory(&["..".to_string()]).unwrap_err();
        assert!(matches!(err, SessionError::OutsideBoundary(_)));
        assert_eq!(session.working_directory(), canonical(&root));
    }

    #[test]
    fn test_boundary_is_not_a_string_prefix() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("root");
        let sibling = temp.path().join("root-other");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&sibling).unwrap();
        let mut session = Session::new(&root, Some(&root)).unwrap();

        assert!(matches!(
            session.change_directory(&[sibling.display().to_string()]),
            Err(SessionError::OutsideBoundary(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_boundary_sees_through_symlinks() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("root");
        let outside = temp.path().join("outside");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("escape")).unwrap();
        let mut session = Session::new(&root, Some(&root)).unwrap();

        assert!(matches!(
            session.change_directory(&["escape".to_string()]),
            Err(SessionError::OutsideBoundary(_))
        ));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing");
        assert!(matches!(
            Session::new(temp.path(), Some(&missing)),
            Err(SessionError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_start_outside_root_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("root");
        fs::create_dir(&root).unwrap();
        assert!(matches!(
            Session::new(temp.path(), Some(&root)),
            Err(SessionError::StartOutsideBoundary(_))
        ));
    }

    #[test]
    fn test_prompt_format() {
        let temp = tempfile::tempdir().unwrap();
        let session = Session::new(temp.path(), None).unwrap();
        assert_eq!(
            session.prompt(),
            format!("{}>", canonical(temp.path()).display())
        );
    }
}
