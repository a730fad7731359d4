//! Handing files to the desktop's default application

use crate::{FsError, Result};
use std::path::Path;

/// Opens a local file outside the browser
pub trait DesktopOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Uses the platform's registered handler
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DesktopOpener for SystemOpener {
    #[cfg(feature = "open-external")]
    fn open(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(FsError::NotFound(path.display().to_string()));
        }

        open::that_detached(path).map_err(|e| FsError::from_io(e, path))?;

        tracing::info!("Opened externally: {}", path.display());
        Ok(())
    }

    #[cfg(not(feature = "open-external"))]
    fn open(&self, path: &Path) -> Result<()> {
        Err(FsError::AccessDenied(format!(
            "Open external feature not enabled: {}",
            path.display()
        )))
    }
}

/// Ignores open requests; for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOpener;

impl DesktopOpener for NoopOpener {
    fn open(&self, path: &Path) -> Result<()> {
        tracing::debug!("Open request ignored: {}", path.display());
        Ok(())
    }
}
