use crossbeam_channel::Receiver;
use thiserror::Error;

/// Process execution failures. Cloneable so one outcome can be handed to
/// completion hooks and to the completion channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("failed to start '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("'{command}' exited with {}", describe_code(.code))]
    Exit { command: String, code: Option<i32> },

    #[error("failed waiting for '{command}': {reason}")]
    Wait { command: String, reason: String },

    #[error("'{command}' has not been started")]
    NotStarted { command: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Where a spawned command's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// stdout and stderr are captured line by line onto [`CommandHandle::output`]
    Capture,
    /// The process inherits the terminal for input and output
    Terminal,
}

/// A spawned (or ready to spawn) command
pub trait CommandHandle: Send {
    fn start(&mut self) -> Result<(), ExecError>;

    fn wait(&mut self) -> Result<(), ExecError>;

    fn run(&mut self) -> Result<(), ExecError> {
        self.start()?;
        self.wait()
    }

    /// Captured output lines; disconnects once the process closes its output.
    /// `None` for [`Attach::Terminal`] handles.
    fn output(&self) -> Option<Receiver<String>>;
}

/// Port for process execution
pub trait Executor: Send + Sync {
    /// Run to completion, discarding output
    fn run(&self, command: &str) -> Result<(), ExecError>;

    /// Prepare a command whose lifetime the caller drives through the handle
    fn run_interactive(&self, command: &str, attach: Attach) -> Result<Box<dyn CommandHandle>, ExecError>;
}
