//! The single serialization point for transcript writes.
//!
//! Background jobs never touch the [`Transcript`]; they only enqueue
//! [`ShellEvent`]s through an [`EventSender`]. The task that owns the
//! [`TranscriptSink`] drains the queue and applies events in order.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use super::transcript::{StyleTag, Transcript};
use crate::process::JobOutcome;

pub type JobId = u64;

/// Two-character prefix marking a `label:value` line in job output.
pub const LABEL_MARKER: &str = ">>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    Output { job: JobId, line: String },
    Diagnostic { job: JobId, text: String },
    Finished { job: JobId, outcome: JobOutcome },
}

impl ShellEvent {
    pub fn job(&self) -> JobId {
        match self {
            ShellEvent::Output { job, .. }
            | ShellEvent::Diagnostic { job, .. }
            | ShellEvent::Finished { job, .. } => *job,
        }
    }
}

/// Producer half handed to background jobs.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: UnboundedSender<ShellEvent>,
}

impl EventSender {
    pub fn output(&self, job: JobId, line: String) {
        self.send(ShellEvent::Output { job, line });
    }

    pub fn diagnostic(&self, job: JobId, text: String) {
        self.send(ShellEvent::Diagnostic { job, text });
    }

    pub fn finished(&self, job: JobId, outcome: JobOutcome) {
        self.send(ShellEvent::Finished { job, outcome });
    }

    fn send(&self, event: ShellEvent) {
        // The receiver only goes away when the session is torn down.
        if self.tx.send(event).is_err() {
            debug!("transcript sink closed, dropping event");
        }
    }
}

pub struct TranscriptSink {
    transcript: Transcript,
    rx: UnboundedReceiver<ShellEvent>,
    tx: EventSender,
    accepting: Option<JobId>,
}

impl Default for TranscriptSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSink {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        TranscriptSink {
            transcript: Transcript::new(),
            rx,
            tx: EventSender { tx },
            accepting: None,
        }
    }

    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// Only events from `job` are applied from now on; anything else still
    /// in the queue is discarded when drained.
    pub fn accept(&mut self, job: JobId) {
        self.accepting = Some(job);
    }

    pub fn append_line(&mut self, text: &str, style: StyleTag) {
        self.transcript.append_line(text, style);
    }

    pub fn mark_prompt_start(&mut self) {
        self.transcript.mark_prompt_start();
    }

    pub fn is_editable(&self, offset: usize) -> bool {
        self.transcript.is_editable(offset)
    }

    /// Next queued event without applying it.
    pub fn try_next(&mut self) -> Option<ShellEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Applies queued events without blocking. Stops right after the
    /// accepted job's `Finished` so the caller can render a prompt before
    /// anything else lands.
    pub fn drain(&mut self) -> Option<(JobId, JobOutcome)> {
        while let Some(event) = self.try_next() {
            if let Some(finished) = self.apply(event) {
                return Some(finished);
            }
        }
        None
    }

    /// Blocks on the queue until the accepted job finishes. Must not be
    /// called from inside the async runtime.
    pub fn wait_finished(&mut self) -> Option<(JobId, JobOutcome)> {
        self.accepting?;
        while let Some(event) = self.rx.blocking_recv() {
            if let Some(finished) = self.apply(event) {
                return Some(finished);
            }
        }
        None
    }

    fn apply(&mut self, event: ShellEvent) -> Option<(JobId, JobOutcome)> {
        if Some(event.job()) != self.accepting {
            debug!(job = event.job(), "dropping event from inactive job");
            return None;
        }
        trace!(?event, "applying");
        match event {
            ShellEvent::Output { line, .. } => {
                render_output_line(&mut self.transcript, &line);
                None
            }
            ShellEvent::Diagnostic { text, .. } => {
                self.transcript.append_line(&text, StyleTag::Diagnostic);
                None
            }
            ShellEvent::Finished { job, outcome } => {
                self.accepting = None;
                Some((job, outcome))
            }
        }
    }
}

/// Appends one line of job output. `>>label:value` lines render the label
/// emphasised; everything else is plain.
pub fn render_output_line(transcript: &mut Transcript, line: &str) {
    if let Some(rest) = line.strip_prefix(LABEL_MARKER) {
        if let Some((label, value)) = rest.split_once(':') {
            transcript.append(&format!("{}:", label.trim()), StyleTag::Label);
            transcript.append_line(value, StyleTag::Plain);
            return;
        }
    }
    transcript.append_line(line, StyleTag::Plain);
}
