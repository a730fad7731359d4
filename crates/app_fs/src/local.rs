//! Local file system backend - directory listing and reads

use crate::entry::LocalEntry;
use crate::{Entry, FsError, Liveness, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// List a directory in the order the OS enumerates it
pub(crate) fn list_children(dir: &LocalEntry, live: Liveness<'_>) -> Result<Vec<Entry>> {
    let path = dir.path();
    if !path.is_dir() {
        return Err(FsError::NotADirectory(path.display().to_string()));
    }

    let mut entries = Vec::new();
    for item in fs::read_dir(path).map_err(|e| FsError::from_io(e, path))? {
        if !live() {
            return Err(FsError::Canceled);
        }
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", path.display(), e);
                continue;
            }
        };
        let child = item.path();

        // Broken symlinks still show up, as plain files
        let metadata = match fs::metadata(&child).or_else(|_| fs::symlink_metadata(&child)) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry {}: {}", child.display(), e);
                continue;
            }
        };

        entries.push(Entry::Local(LocalEntry::from_metadata(child, &metadata)));
    }

    Ok(entries)
}

/// Fail with `AccessDenied` when the path cannot be opened
pub(crate) fn ensure_readable(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::read_dir(path).map(drop)
    } else {
        fs::File::open(path).map(drop)
    };
    result.map_err(|e| FsError::from_io(e, path))
}

pub(crate) fn read_head(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = fs::File::open(path).map_err(|e| FsError::from_io(e, path))?;
    let mut buffer = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Turn user-typed `\` separators into `/`
pub fn normalize_separators(text: &str) -> PathBuf {
    PathBuf::from(text.trim().replace('\\', "/"))
}

/// Check if path is a root/drive
pub fn is_root<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().parent().is_none()
}

/// List available drives (Windows) or mount points
#[cfg(windows)]
pub fn list_roots() -> Vec<LocalEntry> {
    (b'A'..=b'Z')
        .map(|letter| format!("{}:\\", letter as char))
        .filter(|drive| Path::new(drive).exists())
        .map(LocalEntry::directory)
        .collect()
}

#[cfg(not(windows))]
pub fn list_roots() -> Vec<LocalEntry> {
    vec![LocalEntry::directory("/")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_matches_os_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::write(dir.path().join("b.png"), [0u8; 4]).unwrap();

        let expected: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();

        let entry = LocalEntry::from_path(dir.path()).unwrap();
        let children = list_children(&entry, &|| true).unwrap();
        let names: Vec<String> = children.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, expected);

        let sub = children.iter().find(|e| e.name() == "sub").unwrap();
        assert!(sub.is_dir());
        assert_eq!(sub.size(), None);
        let text = children.iter().find(|e| e.name() == "a.txt").unwrap();
        assert_eq!(text.size(), Some(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_listing_keeps_going_past_dangling_links() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let entry = LocalEntry::from_path(dir.path()).unwrap();
        let children = list_children(&entry, &|| true).unwrap();
        let mut names: Vec<&str> = children.iter().map(Entry::name).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a.txt", "dangling"]);
    }

    #[test]
    fn test_listing_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let entry = LocalEntry::from_path(&path).unwrap();
        assert!(matches!(
            list_children(&entry, &|| true),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_listing_checks_liveness() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let entry = LocalEntry::from_path(dir.path()).unwrap();
        assert!(matches!(list_children(&entry, &|| false), Err(FsError::Canceled)));
    }

    #[test]
    fn test_read_head_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.txt");
        fs::write(&path, "x".repeat(1000)).unwrap();

        assert_eq!(read_head(&path, 10).unwrap().len(), 10);
    }

    #[test]
    fn test_missing_path_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let result = ensure_readable(&dir.path().join("gone"));
        assert!(matches!(result, Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize_separators("C:\\Users\\me"), PathBuf::from("C:/Users/me"));
        assert_eq!(normalize_separators(" /tmp "), PathBuf::from("/tmp"));
    }

    #[test]
    fn test_roots() {
        let roots = list_roots();
        assert!(!roots.is_empty());
        assert!(roots.iter().all(|r| is_root(r.path())));
    }
}
