//! ZIP archives mounted as read-only directory trees

use crate::entry::{ArchiveEntry, LocalEntry};
use crate::{encoding, Entry, FsError, Liveness, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Metadata of one file or directory inside an archive
#[derive(Debug, Clone)]
pub(crate) struct ArchiveNode {
    pub name: String,
    /// Absolute in-archive path, `/` for the root
    pub path: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Local>>,
    /// Index in the central directory; `None` for implied directories
    pub index: Option<usize>,
}

impl ArchiveNode {
    fn directory(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            is_dir: true,
            size: None,
            modified: None,
            index: None,
        }
    }
}

/// Directory tree built once from the central directory
#[derive(Debug, Default)]
struct ArchiveIndex {
    nodes: HashMap<String, ArchiveNode>,
    /// Child paths per directory, in central-directory order
    children: HashMap<String, Vec<String>>,
}

impl ArchiveIndex {
    fn new(root_name: &str) -> Self {
        let mut index = Self::default();
        index
            .nodes
            .insert("/".to_string(), ArchiveNode::directory(root_name, "/"));
        index.children.insert("/".to_string(), Vec::new());
        index
    }

    /// Register a raw central-directory name, creating implied parent directories
    fn insert(&mut self, raw_name: &str, mut node: ArchiveNode) {
        let components: Vec<&str> = raw_name
            .split(['/', '\\'])
            .filter(|c| !c.is_empty() && *c != "." && *c != "..")
            .collect();
        let Some((last, dirs)) = components.split_last() else {
            return;
        };

        let mut parent = "/".to_string();
        for dir in dirs {
            let path = join(&parent, dir);
            if !self.nodes.contains_key(&path) {
                self.attach(&parent, ArchiveNode::directory(dir, &path));
            }
            parent = path;
        }

        node.name = (*last).to_string();
        node.path = join(&parent, last);
        match self.nodes.get_mut(&node.path) {
            // An explicit directory record after its implied creation
            Some(existing) => {
                if node.is_dir && existing.is_dir {
                    existing.modified = node.modified;
                    existing.index = node.index;
                }
            }
            None => self.attach(&parent, node),
        }
    }

    fn attach(&mut self, parent: &str, node: ArchiveNode) {
        if node.is_dir {
            self.children.entry(node.path.clone()).or_default();
        }
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(node.path.clone());
        self.nodes.insert(node.path.clone(), node);
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// An opened ZIP file
pub struct MountedArchive {
    path: PathBuf,
    index: ArchiveIndex,
    zip: Mutex<Option<zip::ZipArchive<File>>>,
}

impl MountedArchive {
    /// Open the archive and index its central directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FsError::from_io(e, path))?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| FsError::Archive(e.to_string()))?;

        let root_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let hint = encoding::system_encoding_hint();
        let mut index = ArchiveIndex::new(&root_name);

        for i in 0..zip.len() {
            let file = zip
                .by_index_raw(i)
                .map_err(|e| FsError::Archive(e.to_string()))?;

            let raw_name = file.name_raw();
            let name = match std::str::from_utf8(raw_name) {
                Ok(s) => s.to_string(),
                Err(_) => encoding::decode_bytes(raw_name, hint).0,
            };
            let is_dir = file.is_dir();

            index.insert(
                &name,
                ArchiveNode {
                    name: String::new(),
                    path: String::new(),
                    is_dir,
                    size: if is_dir { None } else { Some(file.size()) },
                    modified: file.last_modified().and_then(zip_time_to_local),
                    index: Some(i),
                },
            );
        }

        tracing::info!("Mounted archive {} ({} records)", path.display(), zip.len());

        Ok(Self {
            path: path.to_path_buf(),
            index,
            zip: Mutex::new(Some(zip)),
        })
    }

    /// Archive file on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.zip.lock().is_some()
    }

    /// Release the underlying file handle
    pub fn close(&self) {
        if self.zip.lock().take().is_some() {
            tracing::debug!("Closed archive {}", self.path.display());
        }
    }

    pub(crate) fn root_node(&self) -> ArchiveNode {
        self.index
            .nodes
            .get("/")
            .cloned()
            .unwrap_or_else(|| ArchiveNode::directory("", "/"))
    }

    pub(crate) fn node(&self, path: &str) -> Option<ArchiveNode> {
        self.index.nodes.get(path).cloned()
    }

    pub(crate) fn parent_node(&self, path: &str) -> Option<ArchiveNode> {
        parent_of(path).and_then(|p| self.node(p))
    }

    fn children(&self, path: &str) -> Option<&[String]> {
        self.index.children.get(path).map(Vec::as_slice)
    }

    fn read_node(&self, node: &ArchiveNode, limit: Option<usize>) -> Result<Vec<u8>> {
        if node.is_dir {
            return Err(FsError::Archive(format!("Is a directory: {}", node.path)));
        }
        let index = node
            .index
            .ok_or_else(|| FsError::Archive(format!("Entry not found: {}", node.path)))?;

        let mut guard = self.zip.lock();
        let zip = guard
            .as_mut()
            .ok_or_else(|| FsError::Archive(format!("Archive closed: {}", self.path.display())))?;
        let zip_file = zip
            .by_index(index)
            .map_err(|e| FsError::Archive(e.to_string()))?;

        let mut buffer = Vec::new();
        match limit {
            Some(limit) => {
                zip_file.take(limit as u64).read_to_end(&mut buffer)?;
            }
            None => {
                let mut zip_file = zip_file;
                buffer.reserve(zip_file.size() as usize);
                zip_file.read_to_end(&mut buffer)?;
            }
        }
        Ok(buffer)
    }
}

fn zip_time_to_local(dt: zip::DateTime) -> Option<DateTime<Local>> {
    let naive = NaiveDate::from_ymd_opt(dt.year() as i32, dt.month() as u32, dt.day() as u32)?
        .and_hms_opt(dt.hour() as u32, dt.minute() as u32, dt.second() as u32)?;
    Local.from_local_datetime(&naive).earliest()
}

impl ArchiveEntry {
    pub(crate) fn ensure_exists(&self) -> Result<()> {
        if !self.archive.is_open() {
            return Err(FsError::Archive(format!(
                "Archive closed: {}",
                self.archive.path().display()
            )));
        }
        if self.archive.node(&self.node.path).is_none() {
            return Err(FsError::NotFound(self.node.path.clone()));
        }
        Ok(())
    }

    pub(crate) fn list_children(&self, live: Liveness<'_>) -> Result<Vec<Entry>> {
        if !self.node.is_dir {
            return Err(FsError::NotADirectory(self.node.path.clone()));
        }
        let paths = self
            .archive
            .children(&self.node.path)
            .ok_or_else(|| FsError::NotFound(self.node.path.clone()))?;

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            if !live() {
                return Err(FsError::Canceled);
            }
            if let Some(node) = self.archive.node(path) {
                entries.push(Entry::Archive(self.child(node)));
            }
        }
        Ok(entries)
    }

    pub(crate) fn read_head(&self, limit: usize) -> Result<Vec<u8>> {
        self.archive.read_node(&self.node, Some(limit))
    }

    pub(crate) fn read_all(&self) -> Result<Vec<u8>> {
        self.archive.read_node(&self.node, None)
    }
}

/// Mounted archives keyed by canonical file path.
///
/// Background jobs race to mount the same file, so every access goes
/// through the mutex.
#[derive(Default)]
pub struct ArchiveCache {
    mounts: Mutex<HashMap<PathBuf, Arc<MountedArchive>>>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reuse) the archive behind a local file and return its root entry
    pub fn mount(&self, file: &LocalEntry) -> Result<ArchiveEntry> {
        let path = file
            .path()
            .canonicalize()
            .map_err(|e| FsError::from_io(e, file.path()))?;
        // Leave the archive the way the user came in, not through resolved links
        let mount_exit = file
            .parent()
            .filter(|exit| !exit.path().as_os_str().is_empty())
            .or_else(|| path.parent().map(LocalEntry::directory))
            .ok_or_else(|| FsError::Archive(format!("No containing directory: {}", path.display())))?;

        let archive = {
            let mut mounts = self.mounts.lock();
            match mounts.get(&path) {
                Some(archive) if archive.is_open() => Arc::clone(archive),
                _ => {
                    let archive = Arc::new(MountedArchive::open(&path)?);
                    mounts.insert(path.clone(), Arc::clone(&archive));
                    archive
                }
            }
        };

        Ok(ArchiveEntry::root(archive, mount_exit))
    }

    pub fn len(&self) -> usize {
        self.mounts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.lock().is_empty()
    }

    /// Close every mounted archive, called at shutdown
    pub fn close_all(&self) {
        let mut mounts = self.mounts.lock();
        for archive in mounts.values() {
            archive.close();
        }
        let count = mounts.len();
        mounts.clear();
        if count > 0 {
            tracing::info!("Closed {} mounted archives", count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(dir: &Path) -> PathBuf {
        let path = dir.join("bundle.zip");
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        writer.add_directory("docs/", options).unwrap();
        writer.start_file("docs/readme.txt", options).unwrap();
        writer.write_all(b"inside the archive").unwrap();
        writer.start_file("top.txt", options).unwrap();
        writer.write_all(b"top level").unwrap();
        // No explicit record for "deep/"
        writer.start_file("deep/nested/file.bin", options).unwrap();
        writer.write_all(&[0u8, 1, 2, 3]).unwrap();
        writer.finish().unwrap();
        path
    }

    fn names(entries: &[Entry]) -> Vec<String> {
        entries.iter().map(|e| e.name().to_string()).collect()
    }

    #[test]
    fn test_mount_lists_root_in_archive_order() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = build_zip(dir.path());
        let cache = ArchiveCache::new();

        let root = cache.mount(&LocalEntry::from_path(&zip_path).unwrap()).unwrap();
        assert_eq!(root.inner_path(), "/");
        assert_eq!(root.node.name, "bundle.zip");

        let children = root.list_children(&|| true).unwrap();
        assert_eq!(names(&children), vec!["docs", "top.txt", "deep"]);
        assert!(children[0].is_dir());
        assert_eq!(children[1].size(), Some(9));
        assert_eq!(children[1].path_string(), "/top.txt");
    }

    #[test]
    fn test_implied_directories() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = build_zip(dir.path());
        let cache = ArchiveCache::new();
        let root = cache.mount(&LocalEntry::from_path(&zip_path).unwrap()).unwrap();

        let deep = root.archive.node("/deep").unwrap();
        assert!(deep.is_dir);
        assert!(deep.index.is_none());
        let nested = root.child(root.archive.node("/deep/nested").unwrap());
        let files = nested.list_children(&|| true).unwrap();
        assert_eq!(names(&files), vec!["file.bin"]);
    }

    #[test]
    fn test_parent_of_root_is_mount_exit() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = build_zip(dir.path());
        let cache = ArchiveCache::new();
        let root = cache.mount(&LocalEntry::from_path(&zip_path).unwrap()).unwrap();

        let docs = root.child(root.archive.node("/docs").unwrap());
        let up = Entry::Archive(docs).parent().unwrap();
        assert!(up.is_archive());
        assert_eq!(up.path_string(), "/");

        let exit = up.parent().unwrap();
        assert!(exit.is_local());
        assert_eq!(exit.path_string(), dir.path().display().to_string());
    }

    #[cfg(unix)]
    #[test]
    fn test_mount_exit_keeps_linked_directory() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let zip_path = build_zip(&real);
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let cache = ArchiveCache::new();

        let via_link = cache
            .mount(&LocalEntry::from_path(link.join("bundle.zip")).unwrap())
            .unwrap();
        let direct = cache.mount(&LocalEntry::from_path(&zip_path).unwrap()).unwrap();

        assert_eq!(via_link.mount_exit().path(), link.as_path());
        assert_eq!(direct.mount_exit().path(), real.as_path());
        assert!(Arc::ptr_eq(&via_link.archive, &direct.archive));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_read_head_and_all() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = build_zip(dir.path());
        let cache = ArchiveCache::new();
        let root = cache.mount(&LocalEntry::from_path(&zip_path).unwrap()).unwrap();

        let readme = root.child(root.archive.node("/docs/readme.txt").unwrap());
        assert_eq!(readme.read_head(6).unwrap(), b"inside");
        assert_eq!(readme.read_all().unwrap(), b"inside the archive");
        assert!(root.read_all().is_err());
    }

    #[test]
    fn test_mount_is_cached_until_closed() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = build_zip(dir.path());
        let cache = ArchiveCache::new();
        let file = LocalEntry::from_path(&zip_path).unwrap();

        let first = cache.mount(&file).unwrap();
        let second = cache.mount(&file).unwrap();
        assert!(Arc::ptr_eq(&first.archive, &second.archive));
        assert_eq!(cache.len(), 1);

        cache.close_all();
        assert!(cache.is_empty());
        assert!(!first.archive.is_open());
        assert!(first.ensure_exists().is_err());
    }

    #[test]
    fn test_corrupt_archive_fails_to_mount() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"this is not a zip file").unwrap();

        let cache = ArchiveCache::new();
        let result = cache.mount(&LocalEntry::from_path(&path).unwrap());
        assert!(matches!(result, Err(FsError::Archive(_))));
    }

    #[test]
    fn test_listing_stops_when_canceled() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = build_zip(dir.path());
        let cache = ArchiveCache::new();
        let root = cache.mount(&LocalEntry::from_path(&zip_path).unwrap()).unwrap();

        let result = root.list_children(&|| false);
        assert!(matches!(result, Err(FsError::Canceled)));
    }
}
