use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::core::config::Config;

/// An embeddable shell that runs scripts from configured program directories
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "embersh")]
#[command(version)]
pub struct Flags {
    /// Path to the rc file (default: ~/.embershrc)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Confine the session to this directory tree
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Initial working directory
    #[arg(long, value_name = "DIR")]
    pub start: Option<PathBuf>,

    /// Script search directory, in priority order; replaces the rc list
    #[arg(short, long = "search", value_name = "DIR")]
    pub search: Vec<PathBuf>,

    /// Job timeout in seconds
    #[arg(short, long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Report unresolved commands instead of handing them to the host shell
    #[arg(long)]
    pub no_shell_fallback: bool,

    /// Skip the startup banner
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub debug: bool,
}

impl Flags {
    /// Layers command-line overrides over the loaded config.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(root) = &self.root {
            config.root_boundary = Some(root.clone());
        }
        if let Some(start) = &self.start {
            config.start_dir = Some(start.clone());
        }
        if !self.search.is_empty() {
            config.search_dirs = self.search.clone();
        }
        if let Some(seconds) = self.timeout {
            config.timeout = Duration::from_secs(seconds);
        }
        if self.no_shell_fallback {
            config.shell_fallback = false;
        }
        if self.quiet {
            config.banner = false;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let flags = Flags::try_parse_from([
            "embersh",
            "--root",
            "/srv/shell",
            "-s",
            "/a",
            "--search",
            "/b",
            "--timeout",
            "5",
            "--no-shell-fallback",
            "-q",
        ])
        .unwrap();

        assert_eq!(flags.root, Some(PathBuf::from("/srv/shell")));
        assert_eq!(flags.search, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(flags.timeout, Some(5));
        assert!(flags.no_shell_fallback);
        assert!(flags.quiet);
        assert!(!flags.debug);
    }

    #[test]
    fn test_bad_timeout_rejected() {
        assert!(Flags::try_parse_from(["embersh", "--timeout", "soon"]).is_err());
        assert!(Flags::try_parse_from(["embersh", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let base = Config::default().with_search_dirs(vec![PathBuf::from("/rc")]);
        let flags = Flags {
            search: vec![PathBuf::from("/cli")],
            timeout: Some(3),
            quiet: true,
            ..Flags::default()
        };

        let config = flags.apply(base);
        assert_eq!(config.search_dirs, vec![PathBuf::from("/cli")]);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!config.banner);
        assert!(config.shell_fallback);
    }

    #[test]
    fn test_apply_keeps_rc_when_unset() {
        let base = Config::default().with_search_dirs(vec![PathBuf::from("/rc")]);
        let config = Flags::default().apply(base);
        assert_eq!(config.search_dirs, vec![PathBuf::from("/rc")]);
    }
}
