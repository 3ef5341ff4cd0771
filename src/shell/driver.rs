//! The interactive side of a session: reads submitted lines, runs built-ins
//! in place and hands everything else to the [`ExecutionWorker`].

use std::path::Path;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use super::sink::{JobId, TranscriptSink};
use super::transcript::{StyleTag, Transcript};
use super::worker::ExecutionWorker;
use crate::core::commands::{BuiltinTable, CommandContext};
use crate::core::config::Config;
use crate::core::resolver::{CommandLine, CommandLocation, Resolver};
use crate::core::session::Session;
use crate::error::ShellError;
use crate::process::Invocation;

/// Everything up to and including the last one of these is prompt text.
pub const PROMPT_DELIMITER: char = '>';

const SETTLE_LIMIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    Busy(JobId),
}

/// What became of a submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Empty,
    Builtin(String),
    Dispatched(JobId),
    /// No built-in or script matched and host-shell fallback is off.
    Unresolved(String),
    /// A job is still running; the line was not accepted.
    Busy,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

pub struct CommandLoop {
    session: Session,
    resolver: Resolver,
    sink: TranscriptSink,
    worker: ExecutionWorker,
    state: LoopState,
    python: String,
    shell_fallback: bool,
    exit_requested: bool,
    // Dropped last: shutting the runtime down kills any live child.
    runtime: Runtime,
}

impl CommandLoop {
    /// Builds the session and starts the job runtime. Fails only on
    /// conditions that must abort startup.
    pub fn new(config: &Config, builtins: BuiltinTable) -> Result<Self, ShellError> {
        let session = Session::from_config(config)?;
        let resolver = Resolver::new(
            config,
            builtins,
            session.root_boundary().map(Path::to_path_buf),
        );
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("embersh-job")
            .enable_all()
            .build()?;
        let sink = TranscriptSink::new();
        let worker = ExecutionWorker::new(runtime.handle().clone(), sink.sender(), config.timeout);

        info!(
            cwd = %session.working_directory().display(),
            root = ?session.root_boundary(),
            search_dirs = ?config.search_dirs,
            "session started"
        );

        Ok(CommandLoop {
            session,
            resolver,
            sink,
            worker,
            state: LoopState::AwaitingInput,
            python: config.python.clone(),
            shell_fallback: config.shell_fallback,
            exit_requested: false,
            runtime,
        })
    }

    /// Writes the optional banner and the first prompt.
    pub fn start(&mut self, banner: Option<&str>) {
        if let Some(banner) = banner {
            let transcript = self.sink.transcript_mut();
            transcript.append_line(banner, StyleTag::Banner);
            transcript.append("\n", StyleTag::Banner);
        }
        self.render_prompt();
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, LoopState::Busy(_))
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        self.sink.transcript()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn builtins_mut(&mut self) -> &mut BuiltinTable {
        self.resolver.builtins_mut()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn render_prompt(&mut self) {
        let prompt = self.session.prompt();
        self.sink.transcript_mut().append(&prompt, StyleTag::Prompt);
        self.sink.mark_prompt_start();
        self.state = LoopState::AwaitingInput;
    }

    /// Appends typed text at the end of the editable region.
    pub fn type_text(&mut self, text: &str) -> bool {
        if self.is_busy() {
            return false;
        }
        let end = self.sink.transcript().len();
        self.sink.transcript_mut().insert(end, text)
    }

    /// Types `input` after the prompt and submits it.
    pub fn submit_line(&mut self, input: &str) -> Submission {
        if self.is_busy() {
            return self.reject_busy();
        }
        self.type_text(input);
        self.submit()
    }

    /// Submits the transcript's current line, prompt text included.
    pub fn submit(&mut self) -> Submission {
        if self.is_busy() {
            return self.reject_busy();
        }

        let line = self.sink.transcript().current_line();
        let command_text = extract_command(&line).to_string();
        self.sink.transcript_mut().append("\n", StyleTag::Input);

        let Some(command) = CommandLine::parse(&command_text) else {
            self.render_prompt();
            return Submission::Empty;
        };

        let location = self.resolver.resolve(&command.name);
        debug!(command = %command.name, ?location, "resolved");
        let cwd = self.session.working_directory().to_path_buf();

        match location {
            CommandLocation::Builtin(name) => self.run_builtin(&name, &command.args),
            CommandLocation::Script { path, kind } => {
                let invocation = Invocation::script(&path, kind, &command.args, &self.python, &cwd);
                self.dispatch(invocation)
            }
            CommandLocation::Unresolved if self.shell_fallback => {
                self.dispatch(Invocation::host_shell(&command_text, &cwd))
            }
            CommandLocation::Unresolved => {
                self.sink.append_line(
                    &format!("{}: command not found", command.name),
                    StyleTag::Diagnostic,
                );
                self.render_prompt();
                Submission::Unresolved(command.name)
            }
        }
    }

    /// Applies whatever the running job has produced so far without
    /// blocking. Returns true once the job has finished and a fresh prompt
    /// is up.
    pub fn pump(&mut self) -> bool {
        if !self.is_busy() {
            return false;
        }
        match self.sink.drain() {
            Some((job, outcome)) => {
                debug!(job, ?outcome, "job complete");
                self.render_prompt();
                true
            }
            None => false,
        }
    }

    /// Blocks on the event queue until the running job finishes.
    pub fn wait_idle(&mut self) {
        let LoopState::Busy(job) = self.state else {
            return;
        };
        match self.sink.wait_finished() {
            Some((_, outcome)) => debug!(job, ?outcome, "job complete"),
            None => warn!(job, "event queue closed while waiting"),
        }
        self.render_prompt();
    }

    /// Applies one keystroke at `caret`. Navigation always passes; edits are
    /// refused while busy or when they would touch text before the prompt
    /// mark. Returns whether the key was accepted.
    pub fn handle_key(&mut self, key: Key, caret: usize) -> bool {
        match key {
            Key::Left | Key::Right | Key::Up | Key::Down | Key::Home | Key::End => true,
            _ if self.is_busy() => false,
            Key::Char(c) => {
                let mut buf = [0u8; 4];
                self.sink.transcript_mut().insert(caret, c.encode_utf8(&mut buf))
            }
            Key::Backspace => {
                caret > self.sink.transcript().prompt_start()
                    && self.sink.transcript_mut().delete(caret - 1)
            }
            Key::Delete => self.sink.transcript_mut().delete(caret),
        }
    }

    fn run_builtin(&mut self, name: &str, args: &[String]) -> Submission {
        let Some(command) = self.resolver.builtins().get(name) else {
            warn!(builtin = name, "resolved built-in vanished");
            self.render_prompt();
            return Submission::Unresolved(name.to_string());
        };

        let catalog = self.resolver.known_commands();
        let mut ctx = CommandContext::new(&mut self.session, self.sink.transcript_mut(), &catalog);
        let result = command.execute(&mut ctx, args);
        let exit = ctx.exit_requested();

        if let Err(e) = result {
            debug!(builtin = name, error = %e, "built-in failed");
            self.sink.append_line(&e.to_string(), StyleTag::Diagnostic);
        }
        if exit {
            self.exit_requested = true;
            return Submission::Exit;
        }
        self.render_prompt();
        Submission::Builtin(name.to_string())
    }

    fn dispatch(&mut self, invocation: Invocation) -> Submission {
        // The loop only dispatches after the previous job's Finished event.
        self.worker.settle(SETTLE_LIMIT);
        match self.worker.submit(invocation) {
            Ok(job) => {
                self.sink.accept(job);
                self.state = LoopState::Busy(job);
                Submission::Dispatched(job)
            }
            Err(e) => {
                self.sink.append_line(&e.to_string(), StyleTag::Diagnostic);
                self.render_prompt();
                Submission::Busy
            }
        }
    }

    fn reject_busy(&self) -> Submission {
        warn!(state = ?self.state, "submission while busy");
        Submission::Busy
    }
}

/// Drops the rendered prompt from a submitted line.
pub fn extract_command(line: &str) -> &str {
    match line.rfind(PROMPT_DELIMITER) {
        Some(pos) => line[pos + PROMPT_DELIMITER.len_utf8()..].trim(),
        None => line.trim(),
    }
}
