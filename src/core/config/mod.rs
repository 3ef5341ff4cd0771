use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use thiserror::Error;

mod loader;
mod paths;

pub use loader::ConfigLoader;
pub use paths::ConfigPaths;

/// Wall-clock budget for one job unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[cfg(windows)]
const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
const DEFAULT_PYTHON: &str = "python3";

/// Everything the engine needs to know about its host, built once at
/// startup and handed to the resolver, session and worker.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_dirs: Vec<PathBuf>,
    /// Alias name to target, either a built-in name or a script path.
    pub aliases: BTreeMap<String, String>,
    pub root_boundary: Option<PathBuf>,
    pub start_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub python: String,
    pub shell_fallback: bool,
    pub banner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            search_dirs: Vec::new(),
            aliases: BTreeMap::new(),
            root_boundary: None,
            start_dir: None,
            timeout: DEFAULT_TIMEOUT,
            python: DEFAULT_PYTHON.to_string(),
            shell_fallback: true,
            banner: true,
        }
    }
}

impl Config {
    /// Reads the rc file named by `paths` (if present) on top of the
    /// defaults. Falls back to the default search directories when the rc
    /// file lists none.
    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        Self::load_from(paths, false)
    }

    /// Like [`Config::load`], but a missing rc file is an error when
    /// `require_rc` is set (an explicit `--config`).
    pub fn load_from(paths: &ConfigPaths, require_rc: bool) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        ConfigLoader::new(paths)
            .require_rc(require_rc)
            .load_configs(&mut config)?;

        if config.search_dirs.is_empty() {
            config.search_dirs = paths.default_search_dirs();
        }
        Ok(config)
    }

    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    pub fn with_root_boundary(mut self, root: PathBuf) -> Self {
        self.root_boundary = Some(root);
        self
    }

    pub fn with_start_dir(mut self, dir: PathBuf) -> Self {
        self.start_dir = Some(dir);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shell_fallback(mut self, enabled: bool) -> Self {
        self.shell_fallback = enabled;
        self
    }

    pub fn with_alias(mut self, name: &str, target: &str) -> Self {
        self.aliases.insert(name.to_lowercase(), target.to_string());
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("Config file not found: {0}")]
    ConfigFileNotFound(String),
    #[error("{path}:{line}: invalid value for `{directive}`: {value}")]
    InvalidValue {
        path: String,
        line: usize,
        directive: &'static str,
        value: String,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
