#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` reconciles a replica directory tree with a source tree in a
//! single stateless pass: after [`Reconciler::sync`] completes without a
//! fatal error, every relative path under the source has an identical
//! `(path, content)` counterpart under the replica, and no path exists under
//! the replica that the source lacks. Nothing is persisted between passes;
//! each pass re-evaluates both trees from scratch, which keeps an
//! interrupted pass harmless: the next one self-heals by repeating the
//! work.
//!
//! # Design
//!
//! A pass runs two sequential phases:
//!
//! - **Forward mirror** walks the source depth-first, creating missing
//!   replica directories and copying every file whose replica counterpart
//!   is absent or whose content fingerprint differs. Copies preserve the
//!   source's modification time.
//! - **Reverse prune** walks the replica and removes every file and
//!   directory without a source counterpart. An unmatched directory is
//!   removed as one recursive operation, so its contents are never
//!   considered entry by entry.
//!
//! Failures scoped to one entry are reported through the injected
//! [`EventLog`], counted in the [`SyncSummary`], and skipped; the pass
//! carries on and the entry is retried implicitly on the next pass. Only
//! two conditions abort a pass, captured by [`SyncError`]: the replica root
//! cannot be created, or the source root cannot be traversed at all.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use checksums::fingerprint_file;
use filetime::FileTime;
use logging::EventLog;
use thiserror::Error;
use walk::{WalkError, Walker};

/// Per-pass counters describing the work a [`Reconciler::sync`] performed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    files_copied: u64,
    dirs_created: u64,
    files_removed: u64,
    dirs_removed: u64,
    entries_failed: u64,
}

impl SyncSummary {
    /// Number of files copied into the replica, creations and overwrites.
    #[must_use]
    pub const fn files_copied(&self) -> u64 {
        self.files_copied
    }

    /// Number of directories created under the replica, root included.
    #[must_use]
    pub const fn dirs_created(&self) -> u64 {
        self.dirs_created
    }

    /// Number of replica files removed.
    #[must_use]
    pub const fn files_removed(&self) -> u64 {
        self.files_removed
    }

    /// Number of replica directories removed, each counted once for its
    /// whole subtree.
    #[must_use]
    pub const fn dirs_removed(&self) -> u64 {
        self.dirs_removed
    }

    /// Number of entries skipped after a recoverable failure.
    #[must_use]
    pub const fn entries_failed(&self) -> u64 {
        self.entries_failed
    }

    /// Reports whether the pass changed nothing and nothing failed.
    ///
    /// A second pass immediately after a successful one must be clean.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.files_copied == 0
            && self.dirs_created == 0
            && self.files_removed == 0
            && self.dirs_removed == 0
            && self.entries_failed == 0
    }

    fn record_file_copied(&mut self) {
        self.files_copied += 1;
    }

    fn record_dir_created(&mut self) {
        self.dirs_created += 1;
    }

    fn record_file_removed(&mut self) {
        self.files_removed += 1;
    }

    fn record_dir_removed(&mut self) {
        self.dirs_removed += 1;
    }

    fn record_failure(&mut self) {
        self.entries_failed += 1;
    }
}

/// Fatal failure that aborts a sync pass.
///
/// Everything else the pass encounters is scoped to a single entry, logged,
/// and skipped.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The replica root could not be created; no mirroring can proceed.
    #[error("cannot create replica root '{path}': {source}")]
    CreateReplicaRoot {
        /// Replica root that failed to be created.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The source root could not be opened for traversal.
    #[error("cannot traverse source root: {source}")]
    SourceWalk {
        /// Traversal failure reported by the walker.
        source: WalkError,
    },
}

/// Mirrors a source tree onto a replica tree, one stateless pass at a time.
pub struct Reconciler<'a> {
    source: PathBuf,
    replica: PathBuf,
    log: &'a dyn EventLog,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler for the given roots, reporting through `log`.
    pub fn new<S, R>(source: S, replica: R, log: &'a dyn EventLog) -> Self
    where
        S: Into<PathBuf>,
        R: Into<PathBuf>,
    {
        Self {
            source: source.into(),
            replica: replica.into(),
            log,
        }
    }

    /// Runs one sync pass: forward mirror, then reverse prune.
    ///
    /// Idempotent: running it again immediately after a successful pass
    /// performs no filesystem mutations.
    pub fn sync(&self) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();
        self.mirror_source(&mut summary)?;
        self.prune_directory(&self.replica, &self.source, &mut summary);
        Ok(summary)
    }

    /// Phase A: walk the source and bring the replica up to date.
    fn mirror_source(&self, summary: &mut SyncSummary) -> Result<(), SyncError> {
        if !self.replica.exists() {
            if let Err(error) = fs::create_dir_all(&self.replica) {
                self.log.error(&format!(
                    "Cannot create replica directory '{}': {}",
                    self.replica.display(),
                    error
                ));
                return Err(SyncError::CreateReplicaRoot {
                    path: self.replica.clone(),
                    source: error,
                });
            }
            self.log
                .info(&format!("Replica directory created: {}", self.replica.display()));
            summary.record_dir_created();
        }

        let walker = match Walker::new(&self.source) {
            Ok(walker) => walker,
            Err(error) => {
                self.log
                    .error(&format!("Cannot traverse source '{}': {}", self.source.display(), error));
                return Err(SyncError::SourceWalk { source: error });
            }
        };

        for item in walker {
            match item {
                Ok(entry) => {
                    let target = self.replica.join(entry.relative_path());
                    if entry.is_dir() {
                        self.mirror_directory(&target, summary);
                    } else {
                        self.mirror_file(entry.full_path(), &target, summary);
                    }
                }
                Err(error) => {
                    self.log.error(&format!("Error traversing source: {error}"));
                    summary.record_failure();
                }
            }
        }

        Ok(())
    }

    fn mirror_directory(&self, target: &Path, summary: &mut SyncSummary) {
        if target.is_dir() {
            return;
        }
        match fs::create_dir_all(target) {
            Ok(()) => {
                self.log
                    .info(&format!("Directory created: {}", target.display()));
                summary.record_dir_created();
            }
            Err(error) => {
                self.log.error(&format!(
                    "Error creating directory '{}': {}",
                    target.display(),
                    error
                ));
                summary.record_failure();
            }
        }
    }

    fn mirror_file(&self, source: &Path, target: &Path, summary: &mut SyncSummary) {
        if !self.needs_copy(source, target) {
            return;
        }
        match copy_with_mtime(source, target) {
            Ok(()) => {
                self.log.info(&format!(
                    "Synchronizing {} to {}",
                    source.display(),
                    target.display()
                ));
                summary.record_file_copied();
            }
            Err(error) => {
                self.log.error(&format!(
                    "Error synchronizing file '{}' to '{}': {}",
                    source.display(),
                    target.display(),
                    error
                ));
                summary.record_failure();
            }
        }
    }

    /// Decides whether `source` must be copied over `target`.
    ///
    /// A missing target always copies. When both files exist their
    /// fingerprints decide; a fingerprint failure on either side makes the
    /// comparison inconclusive and errs toward copying, so two unreadable
    /// files can never pass as identical.
    fn needs_copy(&self, source: &Path, target: &Path) -> bool {
        if !target.exists() {
            return true;
        }

        let source_digest = match fingerprint_file(source) {
            Ok(digest) => digest,
            Err(error) => {
                self.log.error(&error.to_string());
                return true;
            }
        };
        let target_digest = match fingerprint_file(target) {
            Ok(digest) => digest,
            Err(error) => {
                self.log.error(&error.to_string());
                return true;
            }
        };

        source_digest != target_digest
    }

    /// Phase B: remove replica entries without a source counterpart.
    ///
    /// Recurses only into directories that are kept; an unmatched directory
    /// is removed as a single recursive operation, so its contents are never
    /// double-processed.
    fn prune_directory(&self, replica_dir: &Path, source_dir: &Path, summary: &mut SyncSummary) {
        let read_dir = match fs::read_dir(replica_dir) {
            Ok(iter) => iter,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return,
            Err(error) => {
                self.log.error(&format!(
                    "Error reading replica directory '{}': {}",
                    replica_dir.display(),
                    error
                ));
                summary.record_failure();
                return;
            }
        };

        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    self.log.error(&format!(
                        "Error reading entry in '{}': {}",
                        replica_dir.display(),
                        error
                    ));
                    summary.record_failure();
                    continue;
                }
            };

            let name = entry.file_name();
            let replica_path = replica_dir.join(&name);
            let source_path = source_dir.join(&name);

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(error) => {
                    self.log.error(&format!(
                        "Error inspecting replica entry '{}': {}",
                        replica_path.display(),
                        error
                    ));
                    summary.record_failure();
                    continue;
                }
            };

            if fs::symlink_metadata(&source_path).is_ok() {
                if file_type.is_dir() {
                    self.prune_directory(&replica_path, &source_path, summary);
                }
                continue;
            }

            if file_type.is_dir() {
                match remove_entry(&replica_path, true) {
                    Ok(true) => {
                        self.log
                            .info(&format!("Directory removed: {}", replica_path.display()));
                        summary.record_dir_removed();
                    }
                    Ok(false) => {}
                    Err(error) => {
                        self.log.error(&format!(
                            "Error removing directory '{}': {}",
                            replica_path.display(),
                            error
                        ));
                        summary.record_failure();
                    }
                }
            } else {
                match remove_entry(&replica_path, false) {
                    Ok(true) => {
                        self.log
                            .info(&format!("File removed: {}", replica_path.display()));
                        summary.record_file_removed();
                    }
                    Ok(false) => {}
                    Err(error) => {
                        self.log.error(&format!(
                            "Error removing file '{}': {}",
                            replica_path.display(),
                            error
                        ));
                        summary.record_failure();
                    }
                }
            }
        }
    }
}

/// Copies `source` over `target`, then restores the source's mtime.
///
/// Content is written before metadata so a partially applied copy is still
/// detected as changed on the next pass.
fn copy_with_mtime(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target)?;
    let metadata = fs::metadata(source)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(target, mtime)
}

/// Removes a replica entry, recursively for directories.
///
/// Returns `Ok(false)` when the entry vanished before removal; it is
/// already reconciled and nothing should be logged for it.
fn remove_entry(path: &Path, is_dir: bool) -> io::Result<bool> {
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_summary_is_clean() {
        assert!(SyncSummary::default().is_clean());
    }

    #[test]
    fn any_recorded_work_marks_summary_dirty() {
        let mut copied = SyncSummary::default();
        copied.record_file_copied();
        assert!(!copied.is_clean());
        assert_eq!(copied.files_copied(), 1);

        let mut failed = SyncSummary::default();
        failed.record_failure();
        assert!(!failed.is_clean());
        assert_eq!(failed.entries_failed(), 1);
    }
}
