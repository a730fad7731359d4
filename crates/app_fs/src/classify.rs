//! Content categories for preview dispatch

use crate::Entry;

/// Bytes inspected when sniffing a file's content
pub const SNIFF_BYTES: usize = 8192;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "bmp", "gif"];

/// MIME fragments treated as text: plain text, scripts, structured data and markup
const TEXT_MARKERS: &[&str] = &["text", "javascript", "json", "xml", "html", "ecmascript"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Directory,
    Text,
    Image,
    Unknown,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Directory => "directory",
            FileType::Text => "text",
            FileType::Image => "image",
            FileType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determine an entry's content category.
///
/// Never fails: anything unreadable or unrecognised is `Unknown`.
pub fn classify(entry: &Entry) -> FileType {
    classify_with_limit(entry, SNIFF_BYTES)
}

/// [`classify`], sniffing at most `sniff_bytes` of content
pub fn classify_with_limit(entry: &Entry, sniff_bytes: usize) -> FileType {
    if entry.is_dir() {
        return FileType::Directory;
    }
    if is_image_extension(&entry.extension()) {
        return FileType::Image;
    }

    let mime = match entry {
        Entry::Remote(_) => mime_from_name(entry.name()),
        _ => match crate::read_head(entry, sniff_bytes) {
            Ok(head) => sniff_mime(&head, entry.name()),
            Err(e) => {
                tracing::debug!("Cannot sniff {}: {}", entry, e);
                return FileType::Unknown;
            }
        },
    };

    match mime {
        Some(mime) if is_text_mime(&mime) => FileType::Text,
        _ => FileType::Unknown,
    }
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

pub fn is_text_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    TEXT_MARKERS.iter().any(|marker| mime.contains(marker))
}

/// Magic numbers first, then a text/binary check refined by the file name
fn sniff_mime(head: &[u8], name: &str) -> Option<String> {
    if let Some(kind) = infer::get(head) {
        return Some(kind.mime_type().to_string());
    }
    if content_inspector::inspect(head).is_text() {
        let by_name = mime_from_name(name).filter(|m| is_text_mime(m));
        return Some(by_name.unwrap_or_else(|| "text/plain".to_string()));
    }
    None
}

fn mime_from_name(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalEntry;
    use std::fs;

    fn local(path: &std::path::Path) -> Entry {
        Entry::Local(LocalEntry::from_path(path).unwrap())
    }

    #[test]
    fn test_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(classify(&local(dir.path())), FileType::Directory);
    }

    #[test]
    fn test_image_by_extension_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PHOTO.JPG");
        fs::write(&path, b"not really a jpeg").unwrap();
        assert_eq!(classify(&local(&path)), FileType::Image);
    }

    #[test]
    fn test_text_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("notes");
        fs::write(&plain, "just some words\nover two lines\n").unwrap();
        assert_eq!(classify(&local(&plain)), FileType::Text);

        let json = dir.path().join("data.json");
        fs::write(&json, r#"{"key": 1}"#).unwrap();
        assert_eq!(classify(&local(&json)), FileType::Text);
    }

    #[test]
    fn test_binary_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 159, 146, 150, 0, 1, 2, 3]).unwrap();
        assert_eq!(classify(&local(&path)), FileType::Unknown);
    }

    #[test]
    fn test_zip_content_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packed.dat");
        fs::write(&path, [b'P', b'K', 3, 4, 20, 0, 0, 0, 8, 0]).unwrap();
        assert_eq!(classify(&local(&path)), FileType::Unknown);
    }

    #[test]
    fn test_unreadable_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        fs::write(&path, "soon deleted").unwrap();
        let entry = local(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(classify(&entry), FileType::Unknown);
    }

    #[test]
    fn test_text_mime_markers() {
        assert!(is_text_mime("text/plain"));
        assert!(is_text_mime("application/javascript"));
        assert!(is_text_mime("application/xhtml+xml"));
        assert!(!is_text_mime("application/zip"));
        assert!(!is_text_mime("image/png"));
    }
}
