use thiserror::Error;

pub mod executor;
pub mod signal;

pub use executor::{run_job, Invocation, InvocationOrigin, JobOutcome};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("signal error: {0}")]
    Signal(std::io::Error),
    #[error("process id {0} out of range")]
    InvalidPid(u32),
}
