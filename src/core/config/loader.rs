use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::{debug, warn};

use super::{Config, ConfigError, ConfigPaths};
use crate::path::PathExpander;

/// Parses the line-oriented rc file into a [`Config`].
pub struct ConfigLoader<'a> {
    paths: &'a ConfigPaths,
    expander: PathExpander,
    require_rc: bool,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(paths: &'a ConfigPaths) -> Self {
        Self {
            paths,
            expander: PathExpander::new(),
            require_rc: false,
        }
    }

    /// A missing rc file becomes an error instead of being skipped. Used
    /// when the file was named explicitly on the command line.
    pub fn require_rc(mut self, required: bool) -> Self {
        self.require_rc = required;
        self
    }

    pub fn with_expander(mut self, expander: PathExpander) -> Self {
        self.expander = expander;
        self
    }

    pub fn load_configs(&self, config: &mut Config) -> Result<(), ConfigError> {
        let rc_path = &self.paths.rc_path;
        if !rc_path.exists() {
            if self.require_rc {
                return Err(ConfigError::ConfigFileNotFound(
                    rc_path.display().to_string(),
                ));
            }
            debug!(path = %rc_path.display(), "no rc file, using defaults");
            return Ok(());
        }
        self.source(rc_path, config)
    }

    fn source(&self, path: &Path, config: &mut Config) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path)?;
        for (index, line) in content.lines().enumerate() {
            self.process_line(path, index + 1, line, config)?;
        }
        Ok(())
    }

    fn process_line(
        &self,
        path: &Path,
        line_no: usize,
        line: &str,
        config: &mut Config,
    ) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let (directive, value) = match line.split_once(char::is_whitespace) {
            Some((directive, value)) => (directive, unquote(value.trim())),
            None => (line, ""),
        };
        let invalid = |directive: &'static str| ConfigError::InvalidValue {
            path: path.display().to_string(),
            line: line_no,
            directive,
            value: value.to_string(),
        };

        match directive {
            "search" => {
                let dir = self.expand(value).ok_or_else(|| invalid("search"))?;
                config.search_dirs.push(dir);
            }
            "alias" => self.process_alias(value, config).ok_or_else(|| invalid("alias"))?,
            "root" => {
                let dir = self.expand(value).ok_or_else(|| invalid("root"))?;
                config.root_boundary = Some(dir);
            }
            "start" => {
                let dir = self.expand(value).ok_or_else(|| invalid("start"))?;
                config.start_dir = Some(dir);
            }
            "timeout" => {
                let secs: u64 = value
                    .parse()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| invalid("timeout"))?;
                config.timeout = Duration::from_secs(secs);
            }
            "python" => {
                if value.is_empty() {
                    return Err(invalid("python"));
                }
                config.python = value.to_string();
            }
            "fallback" => config.shell_fallback = parse_switch(value).ok_or_else(|| invalid("fallback"))?,
            "banner" => config.banner = parse_switch(value).ok_or_else(|| invalid("banner"))?,
            other => warn!(path = %path.display(), line = line_no, directive = other, "unknown rc directive"),
        }
        Ok(())
    }

    fn process_alias(&self, value: &str, config: &mut Config) -> Option<()> {
        let (name, target) = value.split_once('=')?;
        let name = name.trim();
        let target = unquote(target.trim());
        if name.is_empty() || target.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }

        // Targets that look like paths get tilde expansion; bare words are
        // kept as-is so they can name a built-in.
        let target = if target.starts_with('~') {
            self.expander.expand(target).ok()?.to_string_lossy().into_owned()
        } else {
            target.to_string()
        };
        config.aliases.insert(name.to_lowercase(), target);
        Some(())
    }

    fn expand(&self, value: &str) -> Option<PathBuf> {
        if value.is_empty() {
            return None;
        }
        self.expander.expand(value).ok()
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_from(content: &str) -> Result<Config, ConfigError> {
        let home = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::under(home.path());
        fs::write(&paths.rc_path, content).unwrap();

        let loader = ConfigLoader::new(&paths).with_expander(PathExpander::with_home("/home/tester"));
        let mut config = Config::default();
        loader.load_configs(&mut config)?;
        Ok(config)
    }

    #[test]
    fn test_full_rc_file() {
        let config = load_from(
            r#"
            # scripts
            search ~/progs
            search /opt/cmdlets
            alias About="~/progs/about.py"
            alias cls=clear
            root /home/tester
            start ~/work
            timeout 5
            python /usr/bin/python3.12
            fallback off
            banner no
            "#,
        )
        .unwrap();

        assert_eq!(
            config.search_dirs,
            vec![PathBuf::from("/home/tester/progs"), PathBuf::from("/opt/cmdlets")]
        );
        assert_eq!(config.aliases.get("about").unwrap(), "/home/tester/progs/about.py");
        assert_eq!(config.aliases.get("cls").unwrap(), "clear");
        assert_eq!(config.root_boundary, Some(PathBuf::from("/home/tester")));
        assert_eq!(config.start_dir, Some(PathBuf::from("/home/tester/work")));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.python, "/usr/bin/python3.12");
        assert!(!config.shell_fallback);
        assert!(!config.banner);
    }

    #[test]
    fn test_bad_timeout_reports_line() {
        let err = load_from("search /a\ntimeout soon\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { line, directive, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(directive, "timeout");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load_from("timeout 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { line: 1, directive: "timeout", .. }
        ));
    }

    #[test]
    fn test_malformed_alias() {
        assert!(matches!(
            load_from("alias nothing-here"),
            Err(ConfigError::InvalidValue { directive: "alias", .. })
        ));
    }

    #[test]
    fn test_unknown_directive_is_skipped() {
        let config = load_from("colour purple\ntimeout 7").unwrap();
        assert_eq!(config.timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_required_rc_missing() {
        let paths = ConfigPaths::under("/nonexistent/home/for/embersh");
        let loader = ConfigLoader::new(&paths).require_rc(true);
        assert!(matches!(
            loader.load_configs(&mut Config::default()),
            Err(ConfigError::ConfigFileNotFound(_))
        ));
    }
}
