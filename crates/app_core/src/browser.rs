//! Browsing engine
//!
//! Owns the navigation state, the remote session and the single job slot.
//! Background work runs on a tokio blocking pool; its results come back
//! over a channel and are applied on whichever thread calls [`Browser::pump`].

use crate::connection::{self, ConnectionState};
use crate::error::{BrowseError, Result};
use crate::job::{JobEvent, JobKind, JobOutcome, JobSlot, JobToken, Transition};
use crate::navigation::NavigationState;
use crate::preview;
use crate::view::{Affordance, View};
use crate::AppConfig;
use app_fs::{
    ArchiveCache, ConnectParams, Connector, DesktopOpener, EncodingHint, Entry, FsError,
    FtpConnector, LocalEntry, RemoteEntry, RemoteSession, SystemOpener,
};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine activity as seen by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing listed yet, or the last job failed or was canceled
    Idle,
    Listing,
    Reading,
    Connecting,
    /// Last listing succeeded
    Ready,
}

pub struct Browser {
    view: Box<dyn View>,
    config: AppConfig,
    runtime: Option<tokio::runtime::Runtime>,
    jobs: JobSlot,
    events_tx: Sender<JobEvent>,
    events_rx: Receiver<JobEvent>,
    archives: Arc<ArchiveCache>,
    connector: Arc<dyn Connector>,
    opener: Arc<dyn DesktopOpener>,
    nav: NavigationState,
    connection: ConnectionState,
    phase: Phase,
    pending: Option<JobKind>,
    hint: EncodingHint,
}

impl Browser {
    pub fn new(view: Box<dyn View>, config: AppConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.runtime.io_threads.max(1))
            .thread_name("omnifiler-io")
            .enable_all()
            .build()
            .map_err(|e| BrowseError::Init(e.to_string()))?;

        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let connector = FtpConnector::new(config.remote.connect_timeout())
            .with_default_port(config.remote.default_port);

        tracing::debug!("Browser started with {} io threads", config.runtime.io_threads);

        Ok(Self {
            view,
            nav: NavigationState::new(config.history.capacity),
            config,
            runtime: Some(runtime),
            jobs: JobSlot::new(),
            events_tx,
            events_rx,
            archives: Arc::new(ArchiveCache::new()),
            connector: Arc::new(connector),
            opener: Arc::new(SystemOpener),
            connection: ConnectionState::new(),
            phase: Phase::Idle,
            pending: None,
            hint: app_fs::system_encoding_hint(),
        })
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn DesktopOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_encoding_hint(mut self, hint: EncodingHint) -> Self {
        self.hint = hint;
        self
    }

    // ========================================
    // Navigation
    // ========================================

    /// List `target`, mounting it first if it is a ZIP file
    pub fn navigate(&mut self, target: Entry) {
        self.start_navigation(target, Transition::Fresh);
    }

    /// No-op when there is nothing to go back to
    pub fn navigate_back(&mut self) {
        if let Some(target) = self.nav.peek_back() {
            self.start_navigation(target, Transition::Back);
        }
    }

    pub fn navigate_forward(&mut self) {
        if let Some(target) = self.nav.peek_forward() {
            self.start_navigation(target, Transition::Forward);
        }
    }

    /// Go to the parent of the current location; archive roots lead to
    /// the directory holding the archive
    pub fn navigate_up(&mut self) {
        if let Some(parent) = self.nav.current().and_then(Entry::parent) {
            self.navigate(parent);
        }
    }

    /// Navigate to a typed local directory. Relative paths resolve against
    /// the current local folder, or the working directory otherwise.
    pub fn navigate_by_path(&mut self, text: &str) {
        let typed = app_fs::normalize_separators(text);
        let path = match self.nav.current() {
            Some(Entry::Local(current)) if typed.is_relative() => current.path().join(&typed),
            _ => typed,
        };
        let target = if path.is_dir() {
            std::path::absolute(&path)
                .ok()
                .and_then(|path| LocalEntry::from_path(path).ok())
        } else {
            None
        };

        match target {
            Some(entry) => self.navigate(Entry::Local(entry)),
            None => {
                let error = BrowseError::InvalidPath(path.display().to_string());
                tracing::debug!("{}", error);
                self.view.on_error(error.user_message());
            }
        }
    }

    /// Double-click: enter navigable entries, hand local files to the desktop
    pub fn activate(&mut self, entry: &Entry) {
        if entry.is_navigable() {
            self.navigate(entry.clone());
            return;
        }

        let Entry::Local(local) = entry else {
            tracing::debug!("No external open for {}", entry);
            return;
        };
        let opener = Arc::clone(&self.opener);
        let path = local.path().to_path_buf();
        if let Some(runtime) = &self.runtime {
            runtime.spawn_blocking(move || {
                if let Err(e) = opener.open(&path) {
                    tracing::warn!("Failed to open {}: {}", path.display(), e);
                }
            });
        }
    }

    fn start_navigation(&mut self, target: Entry, transition: Transition) {
        let archives = Arc::clone(&self.archives);
        tracing::debug!("Navigate to {} ({:?})", target, transition);

        self.spawn_job(JobKind::Navigate, move |token| {
            let target = resolve_mount(&archives, target)?;
            token.check()?;

            app_fs::ensure_readable(&target)?;
            token.check()?;

            let live = || token.is_current();
            let children = app_fs::list_children(&target, &live)?;
            Ok(JobOutcome::Listed {
                target,
                children,
                transition,
            })
        });
    }

    // ========================================
    // Content preview
    // ========================================

    /// Single click: report metadata, then preview text or image content
    pub fn select(&mut self, entry: &Entry) {
        self.view
            .on_preview_meta(entry.name(), entry.modified(), entry.size());
        if entry.is_dir() {
            return;
        }

        let entry = entry.clone();
        let config = self.config.preview.clone();
        let hint = self.hint;
        self.spawn_job(JobKind::Preview, move |token| {
            preview::preview(&entry, &config, hint, token)
        });
    }

    pub fn read_text(&mut self, entry: &Entry) {
        let entry = entry.clone();
        let max_chars = self.config.preview.text_chars;
        let hint = self.hint;
        self.spawn_job(JobKind::Preview, move |token| {
            preview::read_text(&entry, max_chars, hint, token).map(JobOutcome::Text)
        });
    }

    pub fn read_image(&mut self, entry: &Entry) {
        let entry = entry.clone();
        let size = self.config.preview.image_size;
        self.spawn_job(JobKind::Preview, move |token| {
            preview::read_image(&entry, size, token).map(JobOutcome::Image)
        });
    }

    /// Abandon the in-flight job, if any
    pub fn cancel(&mut self) {
        if let Some(kind) = self.pending.take() {
            tracing::debug!("Canceled {:?} job", kind);
            self.jobs.cancel();
            self.settle();
        }
        self.view.on_idle();
    }

    // ========================================
    // Remote sessions
    // ========================================

    pub fn connect(&mut self, host: &str, port: &str, user: &str, pass: &str) {
        let params = ConnectParams::new(host, port, user, pass);
        let connector = Arc::clone(&self.connector);
        tracing::info!("Connecting to {}", params.display_uri());

        self.spawn_job(JobKind::Connect, move |token| {
            connection::open_session(connector.as_ref(), &params, token).map(JobOutcome::Connected)
        });
    }

    /// Close the session and forget its history. Always notifies the view.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.connection.detach() {
            self.close_in_background(session);
            if self.pending.take().is_some() {
                self.jobs.cancel();
                self.view.on_idle();
            }
            self.nav.clear_history();
            self.nav.forget_remote();
            self.settle();
            tracing::info!("Remote session disconnected");
            self.view.on_navigation_affordance(self.nav.affordance());
        }
        self.view.on_remote_disconnected();
    }

    /// Shutdown: release the session and mounted archives without notifying anyone
    pub fn cleanup(&mut self) {
        self.jobs.cancel();
        self.pending = None;
        self.connection.close();
        self.archives.close_all();
    }

    // ========================================
    // Event delivery
    // ========================================

    /// Apply every finished job result without blocking. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for a job result, then drain the rest
    pub fn pump_timeout(&mut self, timeout: Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle(event);
                self.pump();
                true
            }
            Err(_) => false,
        }
    }

    /// Pump until no job is in flight. Returns `false` on timeout.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            self.pump_timeout(left);
        }
        true
    }

    fn handle(&mut self, event: JobEvent) {
        if !self.jobs.is_current(event.generation) {
            tracing::debug!("Dropping result of superseded job {}", event.generation);
            if let JobOutcome::Connected(session) = event.outcome {
                self.close_in_background(session);
            }
            return;
        }
        self.pending = None;

        match event.outcome {
            JobOutcome::Listed {
                target,
                children,
                transition,
            } => {
                tracing::debug!("Listed {} ({} entries)", target, children.len());
                self.nav.commit(target.clone(), transition);
                self.phase = Phase::Ready;

                let parent = target.parent();
                self.view
                    .on_address_changed(&target.path_string(), target.is_local());
                self.view.on_list_updated(parent.as_ref(), &children);
                self.view.on_navigation_affordance(self.nav.affordance());
                self.view.on_idle();
            }
            JobOutcome::Text(text) => {
                self.settle();
                self.view.on_preview_text(&text);
                self.view.on_idle();
            }
            JobOutcome::Image(image) => {
                self.settle();
                self.view.on_preview_image(&image);
                self.view.on_idle();
            }
            JobOutcome::NoPreview => {
                self.settle();
                self.view.on_idle();
            }
            JobOutcome::Connected(session) => {
                if let Some(replaced) = self.connection.attach(Arc::clone(&session)) {
                    // Entries of the old session would outlive its connection
                    self.close_in_background(replaced);
                    self.nav.clear_history();
                    self.nav.forget_remote();
                }
                self.view.on_remote_connected();
                self.navigate(Entry::Remote(RemoteEntry::root(session)));
            }
            JobOutcome::Failed { error, kind } => self.report(error, kind),
        }
    }

    fn report(&mut self, error: BrowseError, kind: JobKind) {
        self.settle();
        if error.is_canceled() {
            return;
        }

        tracing::warn!("{:?} job failed: {}", kind, error);
        match kind {
            JobKind::Preview => self.view.on_preview_error(error.user_message()),
            JobKind::Navigate | JobKind::Connect => self.view.on_error(error.user_message()),
        }
        self.view.on_idle();
    }

    /// QUIT can wait behind a transfer still draining, so keep it off this thread
    fn close_in_background(&self, session: Arc<dyn RemoteSession>) {
        match &self.runtime {
            Some(runtime) => {
                runtime.spawn_blocking(move || session.close());
            }
            None => session.close(),
        }
    }

    /// Phase once nothing is in flight
    fn settle(&mut self) {
        self.phase = if self.nav.current().is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        };
    }

    fn spawn_job<F>(&mut self, kind: JobKind, work: F)
    where
        F: FnOnce(&JobToken) -> Result<JobOutcome> + Send + 'static,
    {
        let token = self.jobs.begin();
        let generation = token.generation();
        let tx = self.events_tx.clone();

        self.pending = Some(kind);
        self.phase = match kind {
            JobKind::Navigate => Phase::Listing,
            JobKind::Preview => Phase::Reading,
            JobKind::Connect => Phase::Connecting,
        };
        self.view.on_busy();

        let task = move || {
            let outcome = match work(&token) {
                Ok(outcome) => outcome,
                Err(error) => JobOutcome::Failed { error, kind },
            };
            // The receiver is gone once the browser is dropped
            let _ = tx.send(JobEvent {
                generation,
                outcome,
            });
        };

        match &self.runtime {
            Some(runtime) => {
                runtime.spawn_blocking(task);
            }
            None => tracing::warn!("Job {} dropped: runtime is shut down", generation),
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn current(&self) -> Option<&Entry> {
        self.nav.current()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn affordance(&self) -> Affordance {
        self.nav.affordance()
    }

    pub fn archives(&self) -> &ArchiveCache {
        &self.archives
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.cleanup();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Swap a local ZIP file for the root of its mounted archive
fn resolve_mount(archives: &ArchiveCache, target: Entry) -> Result<Entry> {
    match target {
        Entry::Local(local) if local.is_archive() => {
            let root = archives.mount(&local).map_err(|e| match e {
                FsError::AccessDenied(p) => BrowseError::AccessDenied(p),
                FsError::Canceled => BrowseError::Canceled,
                other => BrowseError::ArchiveOpen(other.to_string()),
            })?;
            Ok(Entry::Archive(root))
        }
        other => Ok(other),
    }
}
