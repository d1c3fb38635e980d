#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `checksums` computes the content fingerprints that the mirroring engine
//! uses as its equality proxy. A fingerprint is the 128-bit MD5 digest of a
//! file's bytes, folded from fixed-size chunks so memory use stays bounded
//! regardless of file size. MD5 is deterministic and collision-resistant
//! enough for change detection between two local trees; it is not an
//! adversarial integrity mechanism.
//!
//! # Design
//!
//! - [`Md5`] wraps the streaming hash state with `new`/`update`/`finalize`
//!   so the chunked fold can be tested against the RFC 1321 vectors.
//! - [`fingerprint_file`] drives the state from a [`CHUNK_SIZE`]-byte read
//!   loop until end-of-stream.
//! - [`FileDigest`] is the finalized output, comparable for equality and
//!   rendered as a 32-character lowercase hexadecimal string.
//!
//! # Errors
//!
//! [`fingerprint_file`] reports open and read failures as [`ChecksumError`]
//! values carrying the offending path. Callers comparing two files must
//! treat a failed fingerprint as "comparison inconclusive" and err toward
//! copying; collapsing failures into a sentinel digest would make two
//! unreadable files compare equal.
//!
//! # Examples
//!
//! ```
//! use checksums::fingerprint_file;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let path = temp.path().join("greeting.txt");
//! std::fs::write(&path, b"hello")?;
//!
//! let digest = fingerprint_file(&path)?;
//! assert_eq!(digest.to_hex(), "5d41402abc4b2a76b9719d911017c592");
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use digest::Digest;
use thiserror::Error;

/// Number of bytes read from disk per hashing step.
pub const CHUNK_SIZE: usize = 4096;

/// Streaming MD5 hasher over file content.
#[derive(Clone, Default)]
pub struct Md5 {
    inner: md5::Md5,
}

impl Md5 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: md5::Md5::new(),
        }
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the state and returns the 128-bit digest.
    #[must_use]
    pub fn finalize(self) -> FileDigest {
        FileDigest(self.inner.finalize().into())
    }

    /// Convenience helper that digests `data` in one shot.
    #[must_use]
    pub fn digest(data: &[u8]) -> FileDigest {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

impl fmt::Debug for Md5 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Md5")
    }
}

/// Finalized content fingerprint used as an equality proxy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileDigest([u8; 16]);

impl FileDigest {
    /// Length of the digest in bytes.
    pub const LEN: usize = 16;

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Renders the digest as a 32-character lowercase hexadecimal string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::with_capacity(Self::LEN * 2);
        for byte in &self.0 {
            let _ = write!(&mut out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileDigest").field(&self.to_hex()).finish()
    }
}

/// Failure while fingerprinting a file.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The file could not be opened for reading.
    #[error("cannot open '{path}' for fingerprinting: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// A read from the open file failed before end-of-stream.
    #[error("cannot read '{path}' while fingerprinting: {source}")]
    Read {
        /// Path whose content could not be read.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
}

impl ChecksumError {
    /// Returns the path the failure refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }
}

/// Computes the fingerprint of the file at `path`.
///
/// The file is read in [`CHUNK_SIZE`]-byte chunks until end-of-stream, each
/// chunk folded into the running hash state. The digest of an empty file is
/// the MD5 of zero bytes.
pub fn fingerprint_file(path: &Path) -> Result<FileDigest, ChecksumError> {
    let mut file = File::open(path).map_err(|error| ChecksumError::Open {
        path: path.to_path_buf(),
        source: error,
    })?;

    let mut hasher = Md5::new();
    let mut chunk = [0_u8; CHUNK_SIZE];
    loop {
        let read = match file.read(&mut chunk) {
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(ChecksumError::Read {
                    path: path.to_path_buf(),
                    source: error,
                });
            }
        };
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }

    Ok(hasher.finalize())
}
