use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    process::{Child, ChildStdout, Command},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

use super::{signal, ProcessError};
use crate::core::resolver::InterpreterKind;
use crate::shell::sink::{EventSender, JobId};

pub const TIMEOUT_MESSAGE: &str = "Error: Process timed out.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOrigin {
    Script,
    /// Unresolved command handed to the host's default command interpreter.
    HostShell,
}

/// A fully built argv plus the working directory snapshot it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub origin: InvocationOrigin,
}

impl Invocation {
    /// `[interpreter-or-script, script?, ...args]` for `kind`.
    pub fn script(
        path: &Path,
        kind: InterpreterKind,
        args: &[String],
        python: &str,
        cwd: &Path,
    ) -> Self {
        let script = path.to_string_lossy().into_owned();
        let (program, mut argv) = match launcher(kind, python) {
            Some(interpreter) => (interpreter.to_string(), vec![script]),
            None => (script, Vec::new()),
        };
        argv.extend(args.iter().cloned());

        Invocation {
            program,
            args: argv,
            cwd: cwd.to_path_buf(),
            origin: InvocationOrigin::Script,
        }
    }

    pub fn host_shell(command_line: &str, cwd: &Path) -> Self {
        #[cfg(windows)]
        let (program, flag) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (program, flag) = ("sh", "-c");

        Invocation {
            program: program.to_string(),
            args: vec![flag.to_string(), command_line.to_string()],
            cwd: cwd.to_path_buf(),
            origin: InvocationOrigin::HostShell,
        }
    }

    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// Interpreter to prepend for `kind`; `None` means run the file directly.
fn launcher(kind: InterpreterKind, python: &str) -> Option<&str> {
    match kind {
        InterpreterKind::NativeScript => Some(python),
        InterpreterKind::PosixShell => Some("bash"),
        InterpreterKind::Batch => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Exited(Option<i32>),
    TimedOut,
    SpawnFailed,
    /// The job task ended without reporting, e.g. it panicked.
    Aborted,
}

struct RunningJob {
    id: JobId,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: JoinHandle<Vec<u8>>,
    started: Instant,
    deadline: Instant,
}

impl RunningJob {
    /// Streams stdout lines as they arrive, then reaps the child and
    /// collects stderr.
    async fn drain(&mut self, events: &EventSender) -> std::io::Result<(ExitStatus, Vec<u8>)> {
        if let Some(stdout) = self.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                events.output(self.id, decode_line(&buf));
            }
        }

        let status = self.child.wait().await?;
        let stderr = (&mut self.stderr).await.unwrap_or_default();
        Ok((status, stderr))
    }

    /// Kills the whole process group and reaps the child. Once this returns
    /// nothing that held our pipes can write to them.
    async fn terminate(&mut self) {
        if let Some(pid) = self.child.id() {
            if let Err(e) = signal::kill_process_group(pid) {
                warn!(job = self.id, pid, error = %e, "failed to signal process group");
            }
        }
        if let Err(e) = self.child.kill().await {
            debug!(job = self.id, error = %e, "kill after group signal");
        }
        self.stderr.abort();
    }
}

/// Runs one job to completion, streaming its output into `events`. Every
/// failure mode is reported as transcript text; nothing here is fatal.
pub async fn run_job(
    job: JobId,
    invocation: &Invocation,
    timeout: Duration,
    events: &EventSender,
) -> JobOutcome {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(source) => {
            let message = match invocation.origin {
                InvocationOrigin::Script => format!("Error: {source}"),
                InvocationOrigin::HostShell => format!("Shell error: {source}"),
            };
            let err = ProcessError::Spawn {
                program: invocation.program.clone(),
                source,
            };
            warn!(job, error = %err, "spawn failed");
            events.diagnostic(job, message);
            return JobOutcome::SpawnFailed;
        }
    };

    let started = Instant::now();
    let stderr = tokio::spawn(read_all(child.stderr.take()));
    let mut running = RunningJob {
        id: job,
        stdout: child.stdout.take(),
        child,
        stderr,
        started,
        deadline: started + timeout,
    };
    debug!(job, argv = ?invocation.argv(), cwd = %invocation.cwd.display(), "job started");

    let finished = tokio::time::timeout_at(running.deadline, running.drain(events)).await;
    match finished {
        Ok(Ok((status, stderr))) => {
            info!(
                job,
                code = ?status.code(),
                elapsed_ms = running.started.elapsed().as_millis() as u64,
                "job finished"
            );
            let stderr = String::from_utf8_lossy(&stderr);
            let stderr = stderr.trim_end();
            if !stderr.is_empty() {
                events.diagnostic(job, format!("Error: {stderr}"));
            }
            JobOutcome::Exited(status.code())
        }
        Ok(Err(e)) => {
            warn!(job, error = %e, "lost contact with child");
            running.terminate().await;
            events.diagnostic(job, format!("Error: {e}"));
            JobOutcome::Exited(None)
        }
        Err(_) => {
            warn!(job, timeout_secs = timeout.as_secs_f64(), "job timed out");
            running.terminate().await;
            events.diagnostic(job, TIMEOUT_MESSAGE.to_string());
            JobOutcome::TimedOut
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "stderr read ended early");
        }
    }
    buf
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::sink::{ShellEvent, TranscriptSink};

    #[test]
    fn test_script_argv() {
        let cwd = Path::new("/work");
        let args = vec!["-v".to_string()];

        let py = Invocation::script(
            Path::new("/progs/about.py"),
            InterpreterKind::NativeScript,
            &args,
            "python3",
            cwd,
        );
        assert_eq!(py.argv(), vec!["python3", "/progs/about.py", "-v"]);
        assert_eq!(py.cwd, PathBuf::from("/work"));

        let sh = Invocation::script(
            Path::new("/progs/run.sh"),
            InterpreterKind::PosixShell,
            &args,
            "python3",
            cwd,
        );
        assert_eq!(sh.argv(), vec!["bash", "/progs/run.sh", "-v"]);

        let bat = Invocation::script(
            Path::new("C:/progs/run.bat"),
            InterpreterKind::Batch,
            &args,
            "python3",
            cwd,
        );
        assert_eq!(bat.argv(), vec!["C:/progs/run.bat", "-v"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_host_shell_argv() {
        let inv = Invocation::host_shell("echo hi there", Path::new("/"));
        assert_eq!(inv.argv(), vec!["sh", "-c", "echo hi there"]);
        assert_eq!(inv.origin, InvocationOrigin::HostShell);
    }

    fn collect(sink: &mut TranscriptSink) -> Vec<ShellEvent> {
        let mut events = Vec::new();
        while let Some(event) = sink.try_next() {
            events.push(event);
        }
        events
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_then_stderr() {
        let mut sink = TranscriptSink::new();
        let inv = Invocation::host_shell(
            "echo err >&2; echo one; echo two",
            &std::env::temp_dir(),
        );

        let outcome = run_job(7, &inv, Duration::from_secs(10), &sink.sender()).await;
        assert_eq!(outcome, JobOutcome::Exited(Some(0)));
        assert_eq!(
            collect(&mut sink),
            vec![
                ShellEvent::Output { job: 7, line: "one".into() },
                ShellEvent::Output { job: 7, line: "two".into() },
                ShellEvent::Diagnostic { job: 7, text: "Error: err".into() },
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let mut sink = TranscriptSink::new();
        let inv = Invocation::host_shell("exit 3", &std::env::temp_dir());

        let outcome = run_job(1, &inv, Duration::from_secs(10), &sink.sender()).await;
        assert_eq!(outcome, JobOutcome::Exited(Some(3)));
        assert!(collect(&mut sink).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_snapshot_cwd() {
        let temp = tempfile::tempdir().unwrap();
        let cwd = std::fs::canonicalize(temp.path()).unwrap();
        let mut sink = TranscriptSink::new();
        let inv = Invocation::host_shell("pwd -P", &cwd);

        run_job(1, &inv, Duration::from_secs(10), &sink.sender()).await;
        assert_eq!(
            collect(&mut sink),
            vec![ShellEvent::Output {
                job: 1,
                line: cwd.display().to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut sink = TranscriptSink::new();
        let inv = Invocation::script(
            Path::new("/progs/about.py"),
            InterpreterKind::NativeScript,
            &[],
            "/nonexistent/interpreter/python",
            &std::env::temp_dir(),
        );

        let outcome = run_job(2, &inv, Duration::from_secs(10), &sink.sender()).await;
        assert_eq!(outcome, JobOutcome::SpawnFailed);
        let events = collect(&mut sink);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ShellEvent::Diagnostic { job: 2, text } if text.starts_with("Error: ")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_group() {
        let mut sink = TranscriptSink::new();
        // The background sleep inherits stdout; killing only `sh` would
        // leave it holding the pipe open.
        let inv = Invocation::host_shell(
            "echo started; sleep 30 & sleep 30; echo never",
            &std::env::temp_dir(),
        );

        let begin = std::time::Instant::now();
        let outcome = run_job(3, &inv, Duration::from_millis(500), &sink.sender()).await;
        assert_eq!(outcome, JobOutcome::TimedOut);
        assert!(begin.elapsed() < Duration::from_secs(5));

        // Give any straggler a chance to write before checking.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            collect(&mut sink),
            vec![
                ShellEvent::Output { job: 3, line: "started".into() },
                ShellEvent::Diagnostic { job: 3, text: TIMEOUT_MESSAGE.into() },
            ]
        );
    }

    #[test]
    fn test_decode_line_is_lossy() {
        assert_eq!(decode_line(b"ok\r\n"), "ok");
        assert_eq!(decode_line(&[0x66, 0xff, 0x0a]), "f\u{fffd}");
    }
}
