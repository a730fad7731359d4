//! Unified entry model over the local, archive and remote backends

use crate::archive::{ArchiveNode, MountedArchive};
use crate::remote::{RemoteNode, RemoteSession};
use crate::{classify, FileType, FsError, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One addressable node: a directory, a regular file or an archive mount point.
///
/// Entries are immutable values. A fresh one is built for every observed file;
/// two entries of the same variant and address are the same location.
#[derive(Debug, Clone)]
pub enum Entry {
    Local(LocalEntry),
    Archive(ArchiveEntry),
    Remote(RemoteEntry),
}

impl Entry {
    /// Base name, without any path separator
    pub fn name(&self) -> &str {
        match self {
            Entry::Local(e) => &e.name,
            Entry::Archive(e) => e.node.name.as_str(),
            Entry::Remote(e) => e.node.name.as_str(),
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            Entry::Local(e) => e.is_dir,
            Entry::Archive(e) => e.node.is_dir,
            Entry::Remote(e) => e.node.is_dir,
        }
    }

    /// Size in bytes, `None` for directories
    pub fn size(&self) -> Option<u64> {
        match self {
            Entry::Local(e) => e.size,
            Entry::Archive(e) => e.node.size,
            Entry::Remote(e) => e.node.size,
        }
    }

    pub fn modified(&self) -> Option<DateTime<Local>> {
        match self {
            Entry::Local(e) => e.modified,
            Entry::Archive(e) => e.node.modified,
            Entry::Remote(e) => e.node.modified,
        }
    }

    /// Address in the backend's own scheme: file system path,
    /// in-archive path or FTP URI.
    pub fn path_string(&self) -> String {
        match self {
            Entry::Local(e) => e.path.display().to_string(),
            Entry::Archive(e) => e.node.path.clone(),
            Entry::Remote(e) => e.uri(),
        }
    }

    pub fn extension(&self) -> String {
        extension_of(self.name(), self.is_dir())
    }

    /// Directories and ZIP files can be entered
    pub fn is_navigable(&self) -> bool {
        is_navigable(self.name(), self.is_dir())
    }

    /// Logical parent; `None` only at a backend root.
    ///
    /// An archive root resolves to the local directory holding the archive.
    pub fn parent(&self) -> Option<Entry> {
        match self {
            Entry::Local(e) => e.parent().map(Entry::Local),
            Entry::Archive(e) => Some(e.parent()),
            Entry::Remote(e) => e.parent().map(Entry::Remote),
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Entry::Local(e) => e.path.parent().is_none(),
            Entry::Archive(_) => false,
            Entry::Remote(e) => e.is_root(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Entry::Local(_))
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Entry::Archive(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Entry::Remote(_))
    }

    /// Content category. May read the file, so keep it off the UI thread.
    pub fn file_type(&self) -> FileType {
        classify(self)
    }

    /// Variant tag used in logs
    pub fn backend(&self) -> &'static str {
        match self {
            Entry::Local(_) => "local",
            Entry::Archive(_) => "archive",
            Entry::Remote(_) => "remote",
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Entry::Local(a), Entry::Local(b)) => a.path == b.path,
            (Entry::Archive(a), Entry::Archive(b)) => {
                a.archive.path() == b.archive.path() && a.node.path == b.node.path
            }
            (Entry::Remote(a), Entry::Remote(b)) => a.uri() == b.uri(),
            _ => false,
        }
    }
}

impl Eq for Entry {}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend(), self.path_string())
    }
}

/// Substring after the last `.` of a file name; empty for directories
pub fn extension_of(name: &str, is_dir: bool) -> String {
    if is_dir {
        return String::new();
    }
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default()
}

pub(crate) fn is_zip_name(name: &str, is_dir: bool) -> bool {
    extension_of(name, is_dir).eq_ignore_ascii_case("zip")
}

fn is_navigable(name: &str, is_dir: bool) -> bool {
    is_dir || is_zip_name(name, is_dir)
}

pub(crate) fn system_time_to_local(time: std::time::SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

/// Node on the host file system
#[derive(Debug, Clone)]
pub struct LocalEntry {
    path: PathBuf,
    name: String,
    is_dir: bool,
    size: Option<u64>,
    modified: Option<DateTime<Local>>,
}

impl LocalEntry {
    /// Build an entry by reading the path's metadata
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| FsError::from_io(e, path))?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }

    pub(crate) fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let is_dir = metadata.is_dir() || path.parent().is_none();
        Self {
            name: local_name(&path),
            size: if is_dir { None } else { Some(metadata.len()) },
            modified: metadata.modified().ok().map(system_time_to_local),
            is_dir,
            path,
        }
    }

    /// Directory entry built without touching the disk
    pub fn directory<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        Self {
            name: local_name(&path),
            is_dir: true,
            size: None,
            modified: None,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn parent(&self) -> Option<LocalEntry> {
        self.path.parent().map(LocalEntry::directory)
    }

    /// A regular file that can be mounted as an archive
    pub fn is_archive(&self) -> bool {
        is_zip_name(&self.name, self.is_dir)
    }
}

fn local_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Node inside a mounted ZIP archive
#[derive(Clone)]
pub struct ArchiveEntry {
    pub(crate) archive: Arc<MountedArchive>,
    pub(crate) node: ArchiveNode,
    pub(crate) mount_exit: Arc<LocalEntry>,
}

impl ArchiveEntry {
    /// Root of a mount, remembering where to go when leaving it
    pub fn root(archive: Arc<MountedArchive>, mount_exit: LocalEntry) -> Self {
        let node = archive.root_node();
        Self {
            archive,
            node,
            mount_exit: Arc::new(mount_exit),
        }
    }

    pub(crate) fn child(&self, node: ArchiveNode) -> Self {
        Self {
            archive: Arc::clone(&self.archive),
            node,
            mount_exit: Arc::clone(&self.mount_exit),
        }
    }

    /// Path inside the archive, `/` for the root
    pub fn inner_path(&self) -> &str {
        &self.node.path
    }

    pub fn archive(&self) -> &Arc<MountedArchive> {
        &self.archive
    }

    /// Local directory containing the archive file
    pub fn mount_exit(&self) -> &LocalEntry {
        &self.mount_exit
    }

    pub fn is_mount_root(&self) -> bool {
        self.node.path == "/"
    }

    fn parent(&self) -> Entry {
        if self.is_mount_root() {
            return Entry::Local((*self.mount_exit).clone());
        }
        match self.archive.parent_node(&self.node.path) {
            Some(node) => Entry::Archive(self.child(node)),
            None => Entry::Local((*self.mount_exit).clone()),
        }
    }
}

impl fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("archive", &self.archive.path())
            .field("path", &self.node.path)
            .field("is_dir", &self.node.is_dir)
            .field("mount_exit", &self.mount_exit.path())
            .finish()
    }
}

/// Node reached through a remote session
#[derive(Clone)]
pub struct RemoteEntry {
    pub(crate) session: Arc<dyn RemoteSession>,
    pub(crate) node: RemoteNode,
}

impl RemoteEntry {
    /// The session's starting directory
    pub fn root(session: Arc<dyn RemoteSession>) -> Self {
        let root = session.root().to_string();
        let node = RemoteNode::directory(&root);
        Self { session, node }
    }

    pub(crate) fn child(&self, node: RemoteNode) -> Self {
        Self {
            session: Arc::clone(&self.session),
            node,
        }
    }

    pub fn session(&self) -> &Arc<dyn RemoteSession> {
        &self.session
    }

    /// Absolute path on the server
    pub fn remote_path(&self) -> &str {
        &self.node.path
    }

    pub fn uri(&self) -> String {
        format!("{}{}", self.session.uri(), self.node.path)
    }

    pub fn is_root(&self) -> bool {
        self.node.path == self.session.root()
    }

    fn parent(&self) -> Option<RemoteEntry> {
        if self.is_root() {
            return None;
        }
        let parent = crate::remote::parent_path(&self.node.path)?;
        Some(self.child(RemoteNode::directory(&parent)))
    }
}

impl fmt::Debug for RemoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEntry")
            .field("uri", &self.uri())
            .field("is_dir", &self.node.is_dir)
            .finish()
    }
}
