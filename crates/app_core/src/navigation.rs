//! Navigation state: current location and its history

use crate::history::HistoryStack;
use crate::job::Transition;
use crate::view::Affordance;
use app_fs::Entry;

/// Current location plus back/forward stacks.
///
/// Only mutated on the UI thread, after a job has reported success.
#[derive(Debug, Clone)]
pub struct NavigationState {
    current: Option<Entry>,
    back: HistoryStack,
    forward: HistoryStack,
}

impl NavigationState {
    pub fn new(capacity: usize) -> Self {
        Self {
            current: None,
            back: HistoryStack::new(capacity),
            forward: HistoryStack::new(capacity),
        }
    }

    /// Last successfully listed entry
    pub fn current(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    pub fn back(&self) -> &HistoryStack {
        &self.back
    }

    pub fn forward(&self) -> &HistoryStack {
        &self.forward
    }

    /// Target for a back navigation, without removing it yet
    pub fn peek_back(&self) -> Option<Entry> {
        self.back.peek().cloned()
    }

    pub fn peek_forward(&self) -> Option<Entry> {
        self.forward.peek().cloned()
    }

    /// Record a successful navigation to `target`
    pub fn commit(&mut self, target: Entry, transition: Transition) {
        let previous = self.current.take();

        match transition {
            Transition::Fresh => {
                self.forward.clear();
                if let Some(prev) = previous {
                    self.back.push(prev);
                }
            }
            Transition::Back => {
                if let Err(e) = self.back.pop() {
                    tracing::warn!("Back navigation committed on {}", e);
                }
                if let Some(prev) = previous {
                    self.forward.push(prev);
                }
            }
            Transition::Forward => {
                if let Err(e) = self.forward.pop() {
                    tracing::warn!("Forward navigation committed on {}", e);
                }
                if let Some(prev) = previous {
                    self.back.push(prev);
                }
            }
        }

        self.current = Some(target);
    }

    /// Button states for the location just committed
    pub fn affordance(&self) -> Affordance {
        let up = self
            .current
            .as_ref()
            .map(|target| target.is_archive() || !target.is_root())
            .unwrap_or(false);

        Affordance {
            back: self.back.is_not_empty(),
            forward: self.forward.is_not_empty(),
            up,
        }
    }

    /// Forget both stacks; used when a remote session ends
    pub fn clear_history(&mut self) {
        self.back.clear();
        self.forward.clear();
    }

    /// Drop the current location if it belongs to a closed remote session
    pub fn forget_remote(&mut self) {
        if self.current.as_ref().map(Entry::is_remote).unwrap_or(false) {
            self.current = None;
        }
    }
}
