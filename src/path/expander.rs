use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Home directory not found")]
    HomeDirNotFound,
}

/// Expands a leading `~` to the user's home directory.
#[derive(Debug, Clone, Default)]
pub struct PathExpander {
    home_override: Option<PathBuf>,
}

impl PathExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `home` instead of asking the platform for the home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home_override: Some(home.into()),
        }
    }

    pub fn expand(&self, path: &str) -> Result<PathBuf, PathError> {
        if path.starts_with('~') {
            self.expand_tilde(path)
        } else {
            Ok(Path::new(path).to_path_buf())
        }
    }

    fn expand_tilde(&self, path: &str) -> Result<PathBuf, PathError> {
        if path.len() == 1 {
            return self.get_home_dir();
        }

        let without_tilde = &path[1..];
        match without_tilde.strip_prefix('/') {
            Some(stripped) => {
                let mut home_path = self.get_home_dir()?;
                for part in stripped.split('/') {
                    if !part.is_empty() {
                        home_path.push(part);
                    }
                }
                Ok(home_path)
            }
            // "~username/path" is left alone
            None => Ok(Path::new(path).to_path_buf()),
        }
    }

    pub fn get_home_dir(&self) -> Result<PathBuf, PathError> {
        match &self.home_override {
            Some(home) => Ok(home.clone()),
            None => dirs::home_dir().ok_or(PathError::HomeDirNotFound),
        }
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// Used for diagnostics about paths that may not exist; boundary checks go
/// through `fs::canonicalize` instead.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_plain_path() {
        let expander = PathExpander::with_home("/home/tester");
        assert_eq!(
            expander.expand("/usr/bin").unwrap(),
            PathBuf::from("/usr/bin")
        );
    }

    #[test]
    fn test_expand_tilde() {
        let expander = PathExpander::with_home("/home/tester");
        assert_eq!(expander.expand("~").unwrap(), PathBuf::from("/home/tester"));
        assert_eq!(
            expander.expand("~/programs//games").unwrap(),
            PathBuf::from("/home/tester/programs/games")
        );
    }

    #[test]
    fn test_other_user_untouched() {
        let expander = PathExpander::with_home("/home/tester");
        assert_eq!(
            expander.expand("~bob/x").unwrap(),
            PathBuf::from("~bob/x")
        );
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(
            normalize_lexically(Path::new("/a/../../b")),
            PathBuf::from("/b")
        );
    }
}
