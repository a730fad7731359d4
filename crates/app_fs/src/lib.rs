//! OmniFiler File System Abstraction Layer
//!
//! Provides a single entry model over three storage backends:
//! - Local: the host file system
//! - Archive: ZIP files mounted as read-only directory trees
//! - Remote: FTP sessions
//!
//! Plus content classification, legacy encoding decoding and
//! desktop integration helpers.

mod archive;
mod classify;
mod encoding;
mod entry;
mod local;
mod open;
mod remote;

pub use archive::{ArchiveCache, MountedArchive};
pub use classify::{classify, classify_with_limit, is_image_extension, is_text_mime, FileType, SNIFF_BYTES};
pub use encoding::{decode_bytes, decode_preview, detect_encoding, system_encoding_hint, EncodingHint};
pub use entry::{ArchiveEntry, Entry, LocalEntry, RemoteEntry};
pub use local::{is_root, list_roots, normalize_separators};
pub use open::{DesktopOpener, NoopOpener, SystemOpener};
pub use remote::{
    parse_list_line, ConnectParams, Connector, FtpConnector, RemoteNode, RemoteSession,
    DEFAULT_FTP_PORT,
};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Operation canceled")]
    Canceled,
}

impl FsError {
    /// Classify an I/O error against the path it was raised for
    pub fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => FsError::AccessDenied(path.display().to_string()),
            std::io::ErrorKind::NotFound => FsError::NotFound(path.display().to_string()),
            _ => FsError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Liveness check handed to listing and reading code.
///
/// Backends call it before emitting each element and abort with
/// [`FsError::Canceled`] once it returns `false`.
pub type Liveness<'a> = &'a (dyn Fn() -> bool + Sync);

/// List the immediate children of a directory-like entry, in backend order.
pub fn list_children(entry: &Entry, live: Liveness<'_>) -> Result<Vec<Entry>> {
    match entry {
        Entry::Local(local) => local::list_children(local, live),
        Entry::Archive(archive) => archive.list_children(live),
        Entry::Remote(remote) => remote.list_children(live),
    }
}

/// Verify that an entry can be opened for reading before listing it.
pub fn ensure_readable(entry: &Entry) -> Result<()> {
    match entry {
        Entry::Local(local) => local::ensure_readable(local.path()),
        Entry::Archive(archive) => archive.ensure_exists(),
        Entry::Remote(_) => Ok(()),
    }
}

/// Read at most `limit` bytes from the start of a file entry.
pub fn read_head(entry: &Entry, limit: usize) -> Result<Vec<u8>> {
    match entry {
        Entry::Local(local) => local::read_head(local.path(), limit),
        Entry::Archive(archive) => archive.read_head(limit),
        Entry::Remote(remote) => remote.read_head(limit),
    }
}

/// Read a whole file entry into memory.
pub fn read_all(entry: &Entry) -> Result<Vec<u8>> {
    match entry {
        Entry::Local(local) => {
            std::fs::read(local.path()).map_err(|e| FsError::from_io(e, local.path()))
        }
        Entry::Archive(archive) => archive.read_all(),
        Entry::Remote(remote) => remote.read_all(),
    }
}
