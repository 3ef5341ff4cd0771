use std::path::PathBuf;

use super::ConfigError;
use crate::path::PathExpander;

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub rc_path: PathBuf,
    pub history_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self, ConfigError> {
        let home = PathExpander::new()
            .get_home_dir()
            .map_err(|_| ConfigError::HomeDirNotFound)?;
        Ok(Self::under(home))
    }

    /// Lays the files out beneath `home`.
    pub fn under(home: impl Into<PathBuf>) -> Self {
        let home_path = home.into();
        ConfigPaths {
            rc_path: home_path.join(".embershrc"),
            history_path: home_path.join(".embersh_history"),
            data_dir: home_path.join(".embersh"),
        }
    }

    pub fn with_rc_path(mut self, rc_path: PathBuf) -> Self {
        self.rc_path = rc_path;
        self
    }

    /// Script directories used when the rc file names none.
    pub fn default_search_dirs(&self) -> Vec<PathBuf> {
        let programs = self.data_dir.join("programs");
        vec![
            programs.clone(),
            programs.join("games"),
            self.data_dir.join("cmdlets"),
        ]
    }
}
