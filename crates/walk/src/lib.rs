#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `walk` provides the depth-first filesystem traversal the mirroring engine
//! runs over the source tree. The walker enumerates directories and files
//! beneath a root, yielding each entry together with its path relative to
//! that root so callers can map it onto a second tree. Directory entries are
//! yielded before their contents; entries within a directory arrive in
//! whatever order the operating system returns them, and no ordering beyond
//! depth-first nesting is guaranteed.
//!
//! # Design
//!
//! - [`Walker`] implements [`Iterator`] over `Result<WalkEntry, WalkError>`.
//!   The root entry itself is not emitted; traversal starts with the root's
//!   children.
//! - [`WalkEntry`] carries the absolute path, the relative path, and the
//!   [`fs::Metadata`] captured via `symlink_metadata`, so symbolic links are
//!   reported as themselves and never followed.
//! - [`WalkError`] describes per-entry failures. A failure is yielded as an
//!   `Err` item and traversal continues with the remaining entries, so one
//!   unreadable subtree cannot end the walk.
//!
//! # Invariants
//!
//! - Relative paths never contain `..` segments.
//! - Every reachable entry is yielded exactly once.
//! - A directory entry is always yielded before anything beneath it.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeSet;
//! use std::fs;
//! use walk::Walker;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let root = temp.path().join("src");
//! fs::create_dir_all(root.join("nested"))?;
//! fs::write(root.join("file.txt"), b"data")?;
//! fs::write(root.join("nested/more.txt"), b"data")?;
//!
//! let mut seen = BTreeSet::new();
//! for entry in Walker::new(&root)? {
//!     seen.insert(entry?.relative_path().to_path_buf());
//! }
//!
//! assert!(seen.contains(std::path::Path::new("file.txt")));
//! assert!(seen.contains(std::path::Path::new("nested")));
//! assert!(seen.contains(std::path::Path::new("nested/more.txt")));
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Depth-first iterator over the entries beneath a root directory.
pub struct Walker {
    stack: Vec<DirectoryState>,
    queued_error: Option<WalkError>,
}

impl Walker {
    /// Starts a traversal rooted at `root`.
    ///
    /// The root must be a readable directory; failing to open it is the one
    /// failure reported here rather than during iteration, since no walk can
    /// proceed without it.
    pub fn new(root: &Path) -> Result<Self, WalkError> {
        let state = DirectoryState::open(root.to_path_buf(), PathBuf::new())?;
        Ok(Self {
            stack: vec![state],
            queued_error: None,
        })
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.queued_error.take() {
            return Some(Err(error));
        }

        loop {
            let state = self.stack.last_mut()?;

            let entry = match state.entries.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(error)) => {
                    // The listing itself failed; drop the rest of this
                    // directory and let the caller decide what to do.
                    let path = state.fs_path.clone();
                    self.stack.pop();
                    return Some(Err(WalkError::ReadDirEntry {
                        path,
                        source: error,
                    }));
                }
                Some(Ok(entry)) => entry,
            };

            let name = entry.file_name();
            let full_path = state.fs_path.join(&name);
            let relative_path = if state.relative_prefix.as_os_str().is_empty() {
                PathBuf::from(&name)
            } else {
                state.relative_prefix.join(&name)
            };

            let metadata = match fs::symlink_metadata(&full_path) {
                Ok(metadata) => metadata,
                Err(error) => {
                    return Some(Err(WalkError::Metadata {
                        path: full_path,
                        source: error,
                    }));
                }
            };

            if metadata.file_type().is_dir() {
                match DirectoryState::open(full_path.clone(), relative_path.clone()) {
                    Ok(child) => self.stack.push(child),
                    // Still yield the directory entry; the failure surfaces
                    // on the following call.
                    Err(error) => self.queued_error = Some(error),
                }
            }

            return Some(Ok(WalkEntry {
                full_path,
                relative_path,
                metadata,
            }));
        }
    }
}

struct DirectoryState {
    fs_path: PathBuf,
    relative_prefix: PathBuf,
    entries: fs::ReadDir,
}

impl DirectoryState {
    fn open(fs_path: PathBuf, relative_prefix: PathBuf) -> Result<Self, WalkError> {
        let entries = fs::read_dir(&fs_path).map_err(|error| WalkError::ReadDir {
            path: fs_path.clone(),
            source: error,
        })?;
        Ok(Self {
            fs_path,
            relative_prefix,
            entries,
        })
    }
}

/// Result of a single traversal step.
#[derive(Debug)]
pub struct WalkEntry {
    full_path: PathBuf,
    relative_path: PathBuf,
    metadata: fs::Metadata,
}

impl WalkEntry {
    /// Returns the absolute path to the filesystem entry.
    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Returns the path relative to the traversal root.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Provides access to the metadata captured for the entry.
    ///
    /// Metadata is taken without following symbolic links, so a symlink
    /// reports its own file type rather than its target's.
    #[must_use]
    pub fn metadata(&self) -> &fs::Metadata {
        &self.metadata
    }

    /// Reports whether the entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.metadata.file_type().is_dir()
    }
}

/// Failure encountered while traversing.
#[derive(Debug)]
pub enum WalkError {
    /// Failed to open a directory for listing.
    ReadDir {
        /// Directory whose contents could not be listed.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to obtain an entry while listing a directory.
    ReadDirEntry {
        /// Directory containing the problematic entry.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Failed to retrieve metadata for an entry.
    Metadata {
        /// Path whose metadata could not be retrieved.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

impl WalkError {
    /// Returns the path the failure refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::ReadDir { path, .. }
            | Self::ReadDirEntry { path, .. }
            | Self::Metadata { path, .. } => path,
        }
    }
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadDir { path, source } => {
                write!(f, "failed to read directory '{}': {}", path.display(), source)
            }
            Self::ReadDirEntry { path, source } => {
                write!(f, "failed to read entry in '{}': {}", path.display(), source)
            }
            Self::Metadata { path, source } => {
                write!(
                    f,
                    "failed to inspect metadata for '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl Error for WalkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReadDir { source, .. }
            | Self::ReadDirEntry { source, .. }
            | Self::Metadata { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;

    fn collect_relative_paths(walker: Walker) -> BTreeSet<PathBuf> {
        walker
            .map(|entry| entry.expect("walker entry").relative_path().to_path_buf())
            .collect()
    }

    #[test]
    fn walk_errors_when_root_missing() {
        let error = match Walker::new(Path::new("/nonexistent/path/for/walker")) {
            Ok(_) => panic!("missing root should fail"),
            Err(error) => error,
        };
        assert!(matches!(error, WalkError::ReadDir { .. }));
    }

    #[test]
    fn walk_yields_every_entry_exactly_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("a")).expect("dir a");
        fs::create_dir_all(root.join("b")).expect("dir b");
        fs::write(root.join("a/inner.txt"), b"data").expect("write inner");
        fs::write(root.join("c.txt"), b"data").expect("write file");

        let walker = Walker::new(&root).expect("build walker");
        let paths = collect_relative_paths(walker);
        let expected: BTreeSet<PathBuf> = [
            PathBuf::from("a"),
            PathBuf::from("a/inner.txt"),
            PathBuf::from("b"),
            PathBuf::from("c.txt"),
        ]
        .into_iter()
        .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn directories_precede_their_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("outer/inner")).expect("dirs");
        fs::write(root.join("outer/inner/leaf.txt"), b"data").expect("write");

        let walker = Walker::new(&root).expect("build walker");
        let order: Vec<PathBuf> = walker
            .map(|entry| entry.expect("walker entry").relative_path().to_path_buf())
            .collect();

        let position = |needle: &str| {
            order
                .iter()
                .position(|p| p == Path::new(needle))
                .expect(needle)
        };
        assert!(position("outer") < position("outer/inner"));
        assert!(position("outer/inner") < position("outer/inner/leaf.txt"));
    }

    #[test]
    fn entry_exposes_full_path_and_metadata() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir_all(&root).expect("root");
        fs::write(root.join("file.bin"), b"xyz").expect("write");

        let mut walker = Walker::new(&root).expect("build walker");
        let entry = walker.next().expect("one entry").expect("entry ok");
        assert_eq!(entry.full_path(), root.join("file.bin"));
        assert_eq!(entry.relative_path(), Path::new("file.bin"));
        assert!(!entry.is_dir());
        assert_eq!(entry.metadata().len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn walk_does_not_follow_directory_symlinks() {
        use std::os::unix::fs::symlink;

        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        let target = temp.path().join("target");
        fs::create_dir(&root).expect("create root");
        fs::create_dir(&target).expect("create target");
        fs::write(target.join("inner.txt"), b"data").expect("write inner");
        symlink(&target, root.join("link")).expect("create symlink");

        let walker = Walker::new(&root).expect("build walker");
        let paths = collect_relative_paths(walker);
        let expected: BTreeSet<PathBuf> = [PathBuf::from("link")].into_iter().collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn walk_errors_when_root_is_a_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("not-a-dir");
        fs::write(&file, b"contents").expect("write");

        let error = match Walker::new(&file) {
            Ok(_) => panic!("file root should fail"),
            Err(error) => error,
        };
        assert!(matches!(error, WalkError::ReadDir { .. }));
        assert_eq!(error.path(), file.as_path());
    }

    #[test]
    fn empty_directory_yields_single_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("hollow")).expect("dirs");

        let walker = Walker::new(&root).expect("build walker");
        let paths = collect_relative_paths(walker);
        let expected: BTreeSet<PathBuf> = [PathBuf::from("hollow")].into_iter().collect();
        assert_eq!(paths, expected);
    }
}
