//! Single "current job" slot shared by navigation, previews and connects
//!
//! Every new job bumps a generation counter and keeps its own value. A job
//! is live while its value is still the current one, so starting a job
//! cancels whatever ran before it.

use crate::error::BrowseError;
use app_fs::{Entry, RemoteSession};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct JobSlot {
    generation: Arc<AtomicU64>,
}

impl JobSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede the current job and hand out a token for the next one
    pub fn begin(&self) -> JobToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        JobToken {
            slot: Arc::clone(&self.generation),
            generation,
        }
    }

    /// Cancel the current job without starting another
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// Captured generation of one job
#[derive(Debug, Clone)]
pub struct JobToken {
    slot: Arc<AtomicU64>,
    generation: u64,
}

impl JobToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.slot.load(Ordering::SeqCst) == self.generation
    }

    /// `Err(Canceled)` once superseded
    pub fn check(&self) -> Result<(), BrowseError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(BrowseError::Canceled)
        }
    }
}

/// History bookkeeping applied when a navigation succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Plain navigate: previous entry to back, forward cleared
    Fresh,
    /// Target was taken from the back stack
    Back,
    /// Target was taken from the forward stack
    Forward,
}

/// What a finished background job hands back to the UI thread
pub enum JobOutcome {
    Listed {
        target: Entry,
        children: Vec<Entry>,
        transition: Transition,
    },
    Text(String),
    Image(crate::PreviewImage),
    /// Selected entry has no previewable content
    NoPreview,
    Connected(Arc<dyn RemoteSession>),
    Failed {
        error: BrowseError,
        kind: JobKind,
    },
}

/// Which action a job belongs to; decides where failures are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Navigate,
    Preview,
    Connect,
}

pub struct JobEvent {
    pub generation: u64,
    pub outcome: JobOutcome,
}
