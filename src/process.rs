// src/process.rs
//! Invocation of external tools (Cosbench CLI, sibench).
//!
//! Backends describe what to run as an [`ExternalCommand`] and hand it to a
//! [`CommandRunner`]. The system runner spawns a real process; tests plug in
//! a fake that records the command and replays canned output.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::error::{BenchError, Result};

/// A program and its arguments. No shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Runs external commands to completion.
pub trait CommandRunner {
    /// Run `cmd` and return its stdout. A non-zero exit is an
    /// [`BenchError::ExternalProcess`] carrying the tool's stderr.
    fn run(&self, cmd: &ExternalCommand) -> Result<String>;
}

/// Spawns real processes and blocks until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ExternalCommand) -> Result<String> {
        debug!("Running command: {}", cmd);

        let output = Command::new(&cmd.program)
            .args(&cmd.args)
            .output()
            .map_err(|e| BenchError::ExternalProcess {
                program: cmd.program.display().to_string(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(BenchError::ExternalProcess {
                program: cmd.program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
