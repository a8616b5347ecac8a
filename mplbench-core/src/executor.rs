//! Process Executor
//!
//! Runs external commands to completion and hands back their captured stdout.
//!
//! `ProcessExecutor` is the seam the runner invokes the workload generator
//! through. `SystemExecutor` spawns real processes; `MockExecutor` records the
//! commands it is given and replays scripted output.

use std::cell::RefCell;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Errors raised while invoking an external command
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Cannot execute an empty command")]
    EmptyCommand,

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read output of `{command}`: {source}")]
    Read {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    NonZeroExit { command: String, status: ExitStatus },

    #[error("`{command}` failed: {message}")]
    Scripted { command: String, message: String },
}

/// Invokes an external command given as an argument list.
///
/// Implementations block until the command has exited and return its complete
/// standard output. There is no timeout: a hung process hangs the caller.
pub trait ProcessExecutor {
    /// Run `args[0]` with `args[1..]` and return everything it wrote to stdout.
    fn execute(&self, args: &[String]) -> Result<String, ExecutorError>;
}

/// Production executor backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl ProcessExecutor for SystemExecutor {
    fn execute(&self, args: &[String]) -> Result<String, ExecutorError> {
        let (program, rest) = args.split_first().ok_or(ExecutorError::EmptyCommand)?;
        let command = args.join(" ");
        tracing::debug!(command = %command, "spawning");

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                command: command.clone(),
                source,
            })?;

        let mut stdout = String::new();
        let read = match child.stdout.take() {
            Some(mut pipe) => pipe.read_to_string(&mut stdout).map(|_| ()),
            None => Ok(()),
        };

        if let Err(source) = read {
            // Reap the child so it doesn't linger as a zombie
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecutorError::Read { command, source });
        }

        let status = child.wait().map_err(|source| ExecutorError::Wait {
            command: command.clone(),
            source,
        })?;

        if !status.success() {
            return Err(ExecutorError::NonZeroExit { command, status });
        }

        Ok(stdout)
    }
}

/// Test double that records commands and returns pre-configured outputs in order.
///
/// Once the script is exhausted every further command yields empty output.
pub struct MockExecutor {
    responses: RefCell<Vec<Result<String, String>>>,
    commands: RefCell<Vec<Vec<String>>>,
}

impl MockExecutor {
    /// Create an executor that answers every command with empty output.
    pub fn new() -> Self {
        MockExecutor {
            responses: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Create an executor that replays `responses` in order. An `Err` entry
    /// makes the corresponding command fail.
    pub fn with_responses(responses: Vec<Result<String, String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockExecutor {
            responses: RefCell::new(reversed),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Every command executed so far, in order.
    pub fn executed_commands(&self) -> Vec<Vec<String>> {
        self.commands.borrow().clone()
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessExecutor for MockExecutor {
    fn execute(&self, args: &[String]) -> Result<String, ExecutorError> {
        if args.is_empty() {
            return Err(ExecutorError::EmptyCommand);
        }
        self.commands.borrow_mut().push(args.to_vec());
        match self.responses.borrow_mut().pop() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(ExecutorError::Scripted {
                command: args.join(" "),
                message,
            }),
            None => Ok(String::new()),
        }
    }
}

// Lets callers share one executor between the runner and their own assertions.
impl<E: ProcessExecutor + ?Sized> ProcessExecutor for std::rc::Rc<E> {
    fn execute(&self, args: &[String]) -> Result<String, ExecutorError> {
        (**self).execute(args)
    }
}
