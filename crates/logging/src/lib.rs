#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` renders mirroring events as `timestamp - LEVEL - message` lines
//! and streams them to a set of writers, typically a log file paired with
//! the console. The capability is passed explicitly as [`EventLog`] rather
//! than held in process-global state, so the engine can be exercised under
//! test with a capturing implementation.
//!
//! # Design
//!
//! - [`EventLog`] is the object-safe seam consumed by the engine: `info` and
//!   `error` operations, each emitting one line per event.
//! - [`Logger`] is the production implementation. Every event is rendered
//!   once and written to each sink in order with a trailing newline,
//!   flushing after the line so tail readers observe events promptly. Sink
//!   write failures are swallowed; the diagnostics channel has nowhere to
//!   report its own failures.
//! - [`CapturingLog`] records events in memory for assertions.
//!
//! # Errors
//!
//! Constructing a [`Logger`] over a log file is setup-fatal when the parent
//! directory cannot be created or the file cannot be opened; both surface as
//! [`LoggerError`] values carrying the offending path.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]");

/// Severity of a logged event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Routine operational event.
    Info,
    /// Failure description with enough context to diagnose it.
    Error,
}

impl Level {
    /// Returns the level's log-line token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

/// Event-log capability consumed by the mirroring engine.
///
/// Implementations must emit each recorded event exactly once.
pub trait EventLog {
    /// Records an event at `level`.
    fn record(&self, level: Level, message: &str);

    /// Records a routine operational event.
    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    /// Records a failure description.
    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

/// Production event log writing rendered lines to a set of sinks.
pub struct Logger {
    sinks: Mutex<Vec<Box<dyn Write + Send>>>,
}

impl Logger {
    /// Creates a logger over an explicit set of sinks.
    #[must_use]
    pub fn with_sinks(sinks: Vec<Box<dyn Write + Send>>) -> Self {
        Self {
            sinks: Mutex::new(sinks),
        }
    }

    /// Creates a logger writing to `log_file` and standard output.
    ///
    /// Missing parent directories of `log_file` are created; the file itself
    /// is opened in append mode so successive runs extend the same log. The
    /// "Logging initialized" event is emitted exactly once on success.
    pub fn to_file_and_console(log_file: &Path) -> Result<Self, LoggerError> {
        if let Some(parent) = log_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|error| LoggerError::CreateLogDir {
                    path: parent.to_path_buf(),
                    source: error,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|error| LoggerError::OpenLogFile {
                path: log_file.to_path_buf(),
                source: error,
            })?;

        let logger = Self::with_sinks(vec![Box::new(file), Box::new(io::stdout())]);
        logger.info(&format!(
            "Logging initialized. Log file: {}",
            log_file.display()
        ));
        Ok(logger)
    }
}

impl EventLog for Logger {
    fn record(&self, level: Level, message: &str) {
        let line = format!("{} - {} - {}\n", timestamp(), level.as_str(), message);
        let mut sinks = self
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter_mut() {
            let _ = sink.write_all(line.as_bytes());
            let _ = sink.flush();
        }
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| String::from("0000-00-00 00:00:00,000"))
}

/// In-memory event log for tests.
#[derive(Debug, Default)]
pub struct CapturingLog {
    events: Mutex<Vec<(Level, String)>>,
}

impl CapturingLog {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events in order.
    #[must_use]
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the messages recorded at `level`, in order.
    #[must_use]
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(recorded, _)| *recorded == level)
            .map(|(_, message)| message)
            .collect()
    }

    /// Reports whether any event at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages_at(level)
            .iter()
            .any(|message| message.contains(needle))
    }
}

impl EventLog for CapturingLog {
    fn record(&self, level: Level, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

/// Failure while constructing a [`Logger`].
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The log file's parent directory could not be created.
    #[error("cannot create log directory '{path}': {source}")]
    CreateLogDir {
        /// Directory that failed to be created.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The log file could not be opened for appending.
    #[error("cannot open log file '{path}': {source}")]
    OpenLogFile {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}
