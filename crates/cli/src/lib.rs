#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` hosts everything around the reconciliation core: parsing the
//! invocation into a [`MirrorConfig`], constructing the file-and-console
//! logger, and driving sync passes on a fixed interval until a shutdown
//! signal arrives.
//!
//! # Design
//!
//! - [`parse_config`] builds the `clap` command and validates the four
//!   positional operands; the interval must be a positive number of
//!   seconds.
//! - [`run_loop`] is the scheduler: an immediate first pass, then one pass
//!   per ticker beat. The shutdown channel is the explicit cancellation
//!   seam; the production binary passes a channel that never fires and is
//!   stopped by terminating the process between sleeps. Ticker beats that
//!   elapse while a pass is running coalesce, so a slow pass is followed by
//!   the next one back to back without overlap.
//! - [`run_with`] maps the outcome onto an [`ExitCode`]: usage errors
//!   follow clap's convention, setup-fatal failures print to stderr and
//!   exit non-zero, and per-entry failures inside a pass never change the
//!   exit status.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Arg, Command, value_parser};
use crossbeam_channel::{Receiver, never, select, tick};
use engine::{Reconciler, SyncError};
use logging::{EventLog, Logger};

/// Validated invocation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Directory treated as ground truth.
    pub source: PathBuf,
    /// Directory kept identical to the source.
    pub replica: PathBuf,
    /// Delay between the end of one pass and the start of the next.
    pub interval: Duration,
    /// Log file receiving a copy of every event.
    pub log_file: PathBuf,
}

fn command() -> Command {
    Command::new("dirmirror")
        .about("Periodically mirrors a source directory tree onto a replica")
        .arg(
            Arg::new("source")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the source directory"),
        )
        .arg(
            Arg::new("replica")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the replica directory, created if absent"),
        )
        .arg(
            Arg::new("interval")
                .required(true)
                .value_parser(value_parser!(u64).range(1..))
                .help("Seconds between synchronization passes"),
        )
        .arg(
            Arg::new("log_file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the log file, parent directories created if absent"),
        )
}

/// Parses an argument iterator (binary name first) into a [`MirrorConfig`].
pub fn parse_config<I, S>(args: I) -> Result<MirrorConfig, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let mut matches = command().try_get_matches_from(args)?;
    let seconds = matches
        .remove_one::<u64>("interval")
        .expect("required argument");
    Ok(MirrorConfig {
        source: matches
            .remove_one::<PathBuf>("source")
            .expect("required argument"),
        replica: matches
            .remove_one::<PathBuf>("replica")
            .expect("required argument"),
        interval: Duration::from_secs(seconds),
        log_file: matches
            .remove_one::<PathBuf>("log_file")
            .expect("required argument"),
    })
}

/// Runs sync passes until `shutdown` fires or its sender is dropped.
///
/// The first pass starts immediately; subsequent passes follow the ticker.
/// Per-entry failures are already logged by the engine and do not end the
/// loop; only a setup-fatal [`SyncError`] does.
pub fn run_loop(
    config: &MirrorConfig,
    log: &dyn EventLog,
    shutdown: &Receiver<()>,
) -> Result<(), SyncError> {
    let reconciler = Reconciler::new(&config.source, &config.replica, log);
    let ticker = tick(config.interval);

    loop {
        reconciler.sync()?;
        log.info("Synchronization complete. Waiting for next interval...");

        select! {
            recv(ticker) -> _ => {}
            recv(shutdown) -> _ => return Ok(()),
        }
    }
}

/// Entry point: parses `args`, sets up logging, and drives the scheduler.
///
/// Returns the process exit status; diagnostics for setup-fatal failures go
/// to `stderr` because the logger may be the component that failed.
pub fn run_with<I, S>(args: I, stderr: &mut dyn Write) -> ExitCode
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let config = match parse_config(args) {
        Ok(config) => config,
        Err(error) => {
            let _ = error.print();
            return ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2));
        }
    };

    let logger = match Logger::to_file_and_console(&config.log_file) {
        Ok(logger) => logger,
        Err(error) => {
            let _ = writeln!(stderr, "dirmirror: {error}");
            return ExitCode::FAILURE;
        }
    };

    logger.info(&format!(
        "Starting synchronization. Source: {}, Replica: {}, Interval: {} seconds",
        config.source.display(),
        config.replica.display(),
        config.interval.as_secs()
    ));

    match run_loop(&config, &logger, &never()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "dirmirror: {error}");
            ExitCode::FAILURE
        }
    }
}
