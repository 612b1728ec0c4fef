//! Error types shared across the server.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration problems. Fatal: the process exits before binding.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        source: std::net::AddrParseError,
    },
}

/// Reasons a request path cannot be mapped onto the content root.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is not valid UTF-8 after percent-decoding")]
    InvalidEncoding,
    #[error("path contains a forbidden character")]
    ForbiddenCharacter,
    #[error("path escapes the content root")]
    Traversal,
}

/// Subprocess plumbing failures during a rebuild step.
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("command line is empty")]
    EmptyCommand,
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("failed to capture output of '{program}': {source}")]
    Capture {
        program: String,
        source: std::io::Error,
    },
    #[error("working directory '{}' is not accessible", .0.display())]
    WorkingDir(PathBuf),
}

/// Logging setup failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}
