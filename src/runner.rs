use std::fmt;
use std::io;
use std::process::{Command, Stdio};

use crate::command::ToolCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Tool output goes straight to this process's stdout/stderr.
    Inherit,
    Stdout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn describe_status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait ProcessRunner: Send + Sync + fmt::Debug {
    fn run(&self, command: &ToolCommand, capture: Capture) -> io::Result<ProcessOutput>;
}

/// Runs the tool as a child process and blocks until it exits.
///
/// There is no timeout: a tool that never returns blocks the calling module
/// indefinitely.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &ToolCommand, capture: Capture) -> io::Result<ProcessOutput> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args()).stdin(Stdio::null());

        let output = match capture {
            Capture::Inherit => {
                let status = cmd.status().map_err(|err| launch_error(command, err))?;
                ProcessOutput {
                    code: status.code(),
                    stdout: String::new(),
                }
            }
            Capture::Stdout => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::inherit());
                let out = cmd.output().map_err(|err| launch_error(command, err))?;
                ProcessOutput {
                    code: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                }
            }
        };
        Ok(output)
    }
}

fn launch_error(command: &ToolCommand, err: io::Error) -> io::Error {
    io::Error::new(err.kind(), format!("failed to spawn `{command}`: {err}"))
}
