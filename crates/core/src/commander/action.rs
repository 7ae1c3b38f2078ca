//! Single-shot executable actions produced by key resolution.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::keybinds::Mode;
use crate::ports::{Attach, ExecError, Executor};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("action has already run")]
    AlreadyRun,

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("failed to start action thread: {reason}")]
    Spawn { reason: String },

    #[error("action ended without reporting an outcome")]
    Abandoned,
}

pub type ActionOutcome = Result<(), ActionError>;

type Hook = Box<dyn FnOnce(&ActionOutcome) + Send>;

#[derive(Clone)]
enum Kind {
    Exit { message: String },
    Shell { command: String, executor: Arc<dyn Executor> },
}

/// Everything consumed by the one run an action gets
struct Job {
    hooks: Vec<Hook>,
    output: Option<Sender<String>>,
    done_tx: Sender<ActionOutcome>,
}

impl Job {
    fn execute(&self, kind: &Kind, mode: Mode) -> ActionOutcome {
        let (command, executor) = match kind {
            Kind::Exit { .. } => return Ok(()),
            Kind::Shell { command, executor } => (command, executor),
        };

        debug!(%command, %mode, "running action");
        match mode {
            Mode::Background => executor.run(command)?,
            Mode::ReadOnly => {
                let mut handle = executor.run_interactive(command, Attach::Capture)?;
                handle.start()?;
                if let Some(lines) = handle.output() {
                    for line in lines.iter() {
                        if let Some(sink) = &self.output {
                            // a departed reader only loses the display
                            let _ = sink.send(line);
                        }
                    }
                }
                handle.wait()?;
            }
            Mode::Interactive => executor.run_interactive(command, Attach::Terminal)?.run()?,
        }
        Ok(())
    }

    /// Fire every hook, then publish the outcome exactly once
    fn finish(self, outcome: ActionOutcome) -> ActionOutcome {
        if let Err(err) = &outcome {
            warn!(error = %err, "action failed");
        }
        for hook in self.hooks {
            hook(&outcome);
        }
        // bounded(1) and sent once, so this never blocks
        let _ = self.done_tx.try_send(outcome.clone());
        outcome
    }
}

/// Observes an action's single outcome.
///
/// The outcome is delivered once; when several `Completion`s exist for the
/// same action, only one of them receives it.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: Receiver<ActionOutcome>,
}

impl Completion {
    fn ready(outcome: ActionOutcome) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(outcome);
        Self { rx }
    }

    /// Block until the action has run and finished
    pub fn wait(&self) -> ActionOutcome {
        self.rx.recv().unwrap_or(Err(ActionError::Abandoned))
    }

    pub fn try_wait(&self) -> Option<ActionOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ActionError::Abandoned)),
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<ActionOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(ActionError::Abandoned)),
        }
    }
}

/// A resolved key binding, ready to run once.
///
/// Exit actions never touch the executor; running one only fires its hooks.
pub struct Action {
    mode: Mode,
    kind: Kind,
    job: Option<Job>,
    done_rx: Receiver<ActionOutcome>,
}

impl Action {
    fn with_kind(mode: Mode, kind: Kind) -> Self {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        Self {
            mode,
            kind,
            job: Some(Job {
                hooks: Vec::new(),
                output: None,
                done_tx,
            }),
            done_rx,
        }
    }

    pub fn shell(command: impl Into<String>, mode: Mode, executor: Arc<dyn Executor>) -> Self {
        Self::with_kind(
            mode,
            Kind::Shell {
                command: command.into(),
                executor,
            },
        )
    }

    pub fn exit(message: impl Into<String>) -> Self {
        Self::with_kind(
            Mode::Background,
            Kind::Exit {
                message: message.into(),
            },
        )
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_exit(&self) -> bool {
        matches!(self.kind, Kind::Exit { .. })
    }

    pub fn exit_message(&self) -> Option<&str> {
        match &self.kind {
            Kind::Exit { message } => Some(message),
            Kind::Shell { .. } => None,
        }
    }

    /// The rendered shell command, `None` for built-ins
    pub fn command(&self) -> Option<&str> {
        match &self.kind {
            Kind::Shell { command, .. } => Some(command),
            Kind::Exit { .. } => None,
        }
    }

    pub fn has_run(&self) -> bool {
        self.job.is_none()
    }

    /// Register a hook fired after the action finishes, failed or not.
    /// Hooks run in registration order on the thread that ran the action.
    pub fn on_finished(&mut self, hook: impl FnOnce(&ActionOutcome) + Send + 'static) {
        match &mut self.job {
            Some(job) => job.hooks.push(Box::new(hook)),
            None => warn!("hook registered on an action that has already run"),
        }
    }

    /// Forward captured output lines of a read-only action to `sink`
    pub fn stream_output(&mut self, sink: Sender<String>) {
        if let Some(job) = &mut self.job {
            job.output = Some(sink);
        }
    }

    pub fn completion(&self) -> Completion {
        Completion {
            rx: self.done_rx.clone(),
        }
    }

    /// Run on the calling thread. A second call returns
    /// [`ActionError::AlreadyRun`] without executing anything.
    pub fn run(&mut self) -> ActionOutcome {
        let job = self.job.take().ok_or(ActionError::AlreadyRun)?;
        let outcome = job.execute(&self.kind, self.mode);
        job.finish(outcome)
    }

    /// Run on a detached thread and return its completion
    pub fn run_async(&mut self) -> Completion {
        self.run_detached(|task| {
            thread::Builder::new()
                .name("action".to_string())
                .spawn(task)
                .map(drop)
        })
    }

    /// Hand the job to `spawn`. When spawning fails the job is reclaimed and
    /// finished with [`ActionError::Spawn`], so hooks still fire.
    fn run_detached<F>(&mut self, spawn: F) -> Completion
    where
        F: FnOnce(Box<dyn FnOnce() + Send>) -> io::Result<()>,
    {
        let Some(job) = self.job.take() else {
            return Completion::ready(Err(ActionError::AlreadyRun));
        };

        let completion = self.completion();
        let slot = Arc::new(Mutex::new(Some(job)));
        let task_slot = Arc::clone(&slot);
        let kind = self.kind.clone();
        let mode = self.mode;
        let task = Box::new(move || {
            let job = task_slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(job) = job {
                let outcome = job.execute(&kind, mode);
                job.finish(outcome);
            }
        });

        if let Err(err) = spawn(task) {
            error!(error = %err, "failed to spawn action thread");
            let job = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(job) = job {
                job.finish(Err(ActionError::Spawn {
                    reason: err.to_string(),
                }));
            }
        }
        completion
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Action");
        debug.field("mode", &self.mode);
        match &self.kind {
            Kind::Exit { message } => debug.field("exit", message),
            Kind::Shell { command, .. } => debug.field("command", command),
        };
        debug.field("has_run", &self.has_run()).finish()
    }
}
