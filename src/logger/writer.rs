//! Log writer module
//!
//! Chooses where the subscriber writes: stdout, or a file opened in append
//! mode.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::LoggingError;

/// Build the subscriber's writer for an optional log file path
pub fn make_writer(log_file: Option<&str>) -> Result<BoxMakeWriter, LoggingError> {
    match log_file {
        Some(path) => {
            let file = open_log_file(path).map_err(|source| LoggingError::Open {
                path: path.to_string(),
                source,
            })?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(io::stdout)),
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
