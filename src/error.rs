use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::session::SessionError;
use crate::process::ProcessError;

/// Errors that end the program. Everything that can go wrong once the loop
/// is running is written to the transcript instead.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),
    #[error("Process error: {0}")]
    ProcessError(#[from] ProcessError),
    #[error("Ctrl-C error: {0}")]
    CtrlC(#[from] ctrlc::Error),
}
