//! Subprocess execution with combined output capture
//!
//! stdout and stderr share one pipe so the captured text keeps the order in
//! which the child wrote it.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::RebuildError;

/// A command line to run, resolved from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

/// Exit status plus everything the child wrote to stdout and stderr
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub text: String,
}

impl CommandSpec {
    pub fn from_argv(argv: &[String], working_dir: Option<PathBuf>) -> Result<Self, RebuildError> {
        let (program, args) = argv.split_first().ok_or(RebuildError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir,
        })
    }

    /// Run to completion, blocking the calling thread.
    pub fn run_captured(&self) -> Result<CapturedOutput, RebuildError> {
        let capture_err = |source| RebuildError::Capture {
            program: self.program.clone(),
            source,
        };

        let (mut reader, writer) = std::io::pipe().map_err(capture_err)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(capture_err)?)
            .stderr(writer);
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(RebuildError::WorkingDir(dir.clone()));
            }
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| RebuildError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        // The parent's copies of the write end live in `cmd`; reading only
        // reaches EOF once they are closed.
        drop(cmd);

        let mut raw = Vec::new();
        let read_result = reader.read_to_end(&mut raw);
        let status = child.wait().map_err(capture_err)?;
        read_result.map_err(capture_err)?;

        Ok(CapturedOutput {
            status,
            text: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Split captured output into log records: one per non-empty line, in order
pub fn output_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}
