//! Browsing error types

use app_fs::FsError;
use thiserror::Error;

/// Errors reported by the browsing engine
#[derive(Error, Debug)]
pub enum BrowseError {
    // ===== User-facing (reported, state unchanged) =====
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Cannot open archive: {0}")]
    ArchiveOpen(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Read failed: {0}")]
    Read(String),

    // ===== Contract violations =====
    #[error("History is empty")]
    EmptyHistory,

    // ===== Not an error =====
    #[error("Canceled")]
    Canceled,

    // ===== Everything else =====
    #[error("Initialization failed: {0}")]
    Init(String),

    #[error("{0}")]
    Other(String),
}

impl BrowseError {
    /// Message shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            BrowseError::AccessDenied(_) => "Access denied.",
            BrowseError::ArchiveOpen(_) => "Can't open the archive.",
            BrowseError::InvalidPath(_) => "Path should lead to a directory.",
            BrowseError::Connection(_) => "Can't connect to FTP with provided data.",
            BrowseError::Read(_) => "Can't read contents of the file.",
            _ => "Something went wrong.",
        }
    }

    /// Cancellation produces no user-visible signal
    pub fn is_canceled(&self) -> bool {
        matches!(self, BrowseError::Canceled)
    }

    /// Map a failure inside a preview job
    pub fn read(e: FsError) -> Self {
        match e {
            FsError::Canceled => BrowseError::Canceled,
            other => BrowseError::Read(other.to_string()),
        }
    }

    /// Map a failure inside a connect job
    pub fn connection(e: FsError) -> Self {
        match e {
            FsError::Canceled => BrowseError::Canceled,
            other => BrowseError::Connection(other.to_string()),
        }
    }
}

impl From<FsError> for BrowseError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::AccessDenied(p) => BrowseError::AccessDenied(p),
            FsError::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                BrowseError::AccessDenied(io.to_string())
            }
            FsError::Archive(msg) => BrowseError::ArchiveOpen(msg),
            FsError::Canceled => BrowseError::Canceled,
            other => BrowseError::Other(other.to_string()),
        }
    }
}

impl From<image::ImageError> for BrowseError {
    fn from(e: image::ImageError) -> Self {
        BrowseError::Read(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrowseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(BrowseError::AccessDenied("x".into()).user_message(), "Access denied.");
        assert_eq!(BrowseError::ArchiveOpen("x".into()).user_message(), "Can't open the archive.");
        assert_eq!(
            BrowseError::InvalidPath("x".into()).user_message(),
            "Path should lead to a directory."
        );
        assert_eq!(
            BrowseError::Connection("x".into()).user_message(),
            "Can't connect to FTP with provided data."
        );
        assert_eq!(BrowseError::Read("x".into()).user_message(), "Can't read contents of the file.");
        assert_eq!(BrowseError::Other("x".into()).user_message(), "Something went wrong.");
        assert_eq!(BrowseError::EmptyHistory.user_message(), "Something went wrong.");
    }

    #[test]
    fn test_from_fs_error() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(BrowseError::from(FsError::Io(denied)), BrowseError::AccessDenied(_)));
        assert!(BrowseError::from(FsError::Canceled).is_canceled());
        assert!(matches!(
            BrowseError::from(FsError::NotFound("/x".into())),
            BrowseError::Other(_)
        ));
        assert!(matches!(
            BrowseError::connection(FsError::Remote("530".into())),
            BrowseError::Connection(_)
        ));
        assert!(BrowseError::read(FsError::Canceled).is_canceled());
    }
}
