//! Runs rendered commands through a shell.

use crossbeam_channel::{Receiver, Sender};
use repodeck_core::ports::{Attach, CommandHandle, ExecError, Executor};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Executes commands as `<shell> -c <command>`
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        cmd
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), ExecError> {
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::Exit {
            command: command.to_string(),
            code: status.code(),
        })
    }
}

impl Executor for ShellExecutor {
    fn run(&self, command: &str) -> Result<(), ExecError> {
        debug!(shell = %self.shell, command, "running command");
        let status = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| ExecError::Spawn {
                command: command.to_string(),
                reason: err.to_string(),
            })?;
        check_status(command, status)
    }

    fn run_interactive(&self, command: &str, attach: Attach) -> Result<Box<dyn CommandHandle>, ExecError> {
        Ok(Box::new(ShellHandle::new(self.command(command), command, attach)))
    }
}

/// A shell command driven through start and wait
pub struct ShellHandle {
    cmd: Command,
    command: String,
    attach: Attach,
    child: Option<Child>,
    readers: Vec<JoinHandle<()>>,
    // held until start hands clones to the reader threads
    output_tx: Option<Sender<String>>,
    output_rx: Receiver<String>,
}

impl ShellHandle {
    fn new(cmd: Command, command: &str, attach: Attach) -> Self {
        let (output_tx, output_rx) = crossbeam_channel::unbounded();
        Self {
            cmd,
            command: command.to_string(),
            attach,
            child: None,
            readers: Vec::new(),
            output_tx: Some(output_tx),
            output_rx,
        }
    }

    fn spawn_reader(&mut self, stream: impl Read + Send + 'static, tx: Sender<String>) {
        let spawned = thread::Builder::new()
            .name("command-output".to_string())
            .spawn(move || {
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        match spawned {
            Ok(handle) => self.readers.push(handle),
            Err(err) => warn!(error = %err, "failed to spawn output reader"),
        }
    }
}

impl CommandHandle for ShellHandle {
    fn start(&mut self) -> Result<(), ExecError> {
        if self.child.is_some() {
            return Ok(());
        }

        match self.attach {
            Attach::Capture => {
                self.cmd
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            Attach::Terminal => {
                self.cmd
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }

        debug!(command = %self.command, attach = ?self.attach, "starting command");
        let mut child = self.cmd.spawn().map_err(|err| ExecError::Spawn {
            command: self.command.clone(),
            reason: err.to_string(),
        })?;

        // dropping the last sender here lets output() disconnect at EOF
        if let Some(tx) = self.output_tx.take() {
            if let Some(stdout) = child.stdout.take() {
                self.spawn_reader(stdout, tx.clone());
            }
            if let Some(stderr) = child.stderr.take() {
                self.spawn_reader(stderr, tx);
            }
        }

        self.child = Some(child);
        Ok(())
    }

    fn wait(&mut self) -> Result<(), ExecError> {
        let mut child = self.child.take().ok_or_else(|| ExecError::NotStarted {
            command: self.command.clone(),
        })?;

        let status = child.wait().map_err(|err| ExecError::Wait {
            command: self.command.clone(),
            reason: err.to_string(),
        })?;
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        check_status(&self.command, status)
    }

    fn output(&self) -> Option<Receiver<String>> {
        match self.attach {
            Attach::Capture => Some(self.output_rx.clone()),
            Attach::Terminal => None,
        }
    }
}
