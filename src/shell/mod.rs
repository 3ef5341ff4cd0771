use std::{
    io::{self, Write},
    path::PathBuf,
    thread,
    time::Duration,
};

use rustyline::{config::Configurer, error::ReadlineError, history::FileHistory, Editor};
use tracing::{debug, warn};

pub mod driver;
pub mod sink;
pub mod transcript;
pub mod worker;

pub use driver::{CommandLoop, Key, LoopState, Submission};
pub use sink::{EventSender, JobId, ShellEvent, TranscriptSink};
pub use transcript::{Segment, StyleTag, Transcript};
pub use worker::{ExecutionWorker, SubmitError};

use crate::{
    core::{
        commands::{BuiltinTable, ExitCommand, HelpCommand},
        config::{Config, ConfigPaths},
    },
    error::ShellError,
    highlight::SyntaxHighlighter,
    input::ShellCompleter,
};

const HISTORY_SIZE: usize = 1000;
const POLL_INTERVAL: Duration = Duration::from_millis(15);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Terminal front end: reads lines with rustyline and prints whatever the
/// command loop appends to the transcript.
pub struct Shell {
    editor: Editor<ShellCompleter, FileHistory>,
    command_loop: CommandLoop,
    renderer: TranscriptRenderer,
    history_path: PathBuf,
}

impl Shell {
    pub fn new(config: &Config, paths: &ConfigPaths) -> Result<Self, ShellError> {
        let mut builtins = BuiltinTable::with_defaults();
        builtins.register("help", HelpCommand);
        builtins.register("exit", ExitCommand);

        let mut command_loop = CommandLoop::new(config, builtins)?;
        let banner = config
            .banner
            .then(|| format!("embersh {}", env!("CARGO_PKG_VERSION")));
        command_loop.start(banner.as_deref());

        let completer = ShellCompleter::new(command_loop.session().working_directory());
        let mut editor = Editor::<ShellCompleter, FileHistory>::new()?;
        editor.set_helper(Some(completer));
        editor.set_auto_add_history(true);
        editor.set_max_history_size(HISTORY_SIZE)?;

        let history_path = paths.history_path.clone();
        if let Err(e) = editor.load_history(&history_path) {
            debug!(path = %history_path.display(), error = %e, "no history loaded");
        }

        // Jobs run in their own process group, so Ctrl-C only reaches us.
        ctrlc::set_handler(move || {
            println!("\nUse 'exit' to exit the shell");
        })?;

        Ok(Shell {
            editor,
            command_loop,
            renderer: TranscriptRenderer::new(SyntaxHighlighter::new()),
            history_path,
        })
    }

    pub fn command_loop(&self) -> &CommandLoop {
        &self.command_loop
    }

    pub fn run(&mut self) -> Result<(), ShellError> {
        let mut stdout = io::stdout();
        self.renderer
            .render(self.command_loop.transcript(), &mut stdout)?;

        loop {
            self.refresh_completer();
            let prompt = self.command_loop.session().prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let submission = self.command_loop.submit_line(&line);
                    debug!(?submission, "line submitted");
                    self.follow_job(&mut stdout)?;
                    if submission == Submission::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    self.save_history();
                    return Err(e.into());
                }
            }
        }

        self.save_history();
        Ok(())
    }

    /// Streams the running job's output until it finishes.
    fn follow_job(&mut self, out: &mut impl Write) -> io::Result<()> {
        loop {
            let idle = !self.command_loop.is_busy() || self.command_loop.pump();
            self.renderer.render(self.command_loop.transcript(), out)?;
            if idle {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn refresh_completer(&mut self) {
        let cwd = self.command_loop.session().working_directory().to_path_buf();
        let commands = self.command_loop.resolver().known_commands();
        if let Some(helper) = self.editor.helper_mut() {
            helper.refresh(cwd, commands);
        }
    }

    fn save_history(&mut self) {
        if let Err(e) = self.editor.save_history(&self.history_path) {
            warn!(path = %self.history_path.display(), error = %e, "couldn't save history");
        }
    }
}

/// Writes transcript text to a terminal as it is appended. Prompt and input
/// segments are skipped because the line editor has already drawn them.
struct TranscriptRenderer {
    highlighter: SyntaxHighlighter,
    generation: u64,
    rendered: usize,
}

impl TranscriptRenderer {
    fn new(highlighter: SyntaxHighlighter) -> Self {
        TranscriptRenderer {
            highlighter,
            generation: 0,
            rendered: 0,
        }
    }

    fn render(&mut self, transcript: &Transcript, out: &mut impl Write) -> io::Result<()> {
        if transcript.generation() != self.generation {
            self.generation = transcript.generation();
            self.rendered = 0;
            out.write_all(CLEAR_SCREEN.as_bytes())?;
        }

        for segment in transcript.segments_from(self.rendered) {
            if matches!(segment.style, StyleTag::Prompt | StyleTag::Input) {
                continue;
            }
            out.write_all(self.highlighter.render_segment(&segment).as_bytes())?;
        }
        self.rendered = transcript.len();
        out.flush()
    }
}
