//! Test doubles: a recording view and an in-memory remote backend

use crate::view::{Affordance, PreviewImage, View};
use app_fs::{ConnectParams, Connector, Entry, FsError, RemoteNode, RemoteSession};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    List {
        parent: Option<String>,
        children: Vec<String>,
    },
    Text(String),
    Image(u32, u32),
    Meta(String, Option<u64>),
    Address(String, bool),
    Affordance(Affordance),
    Error(String),
    PreviewError(String),
    Connected,
    Disconnected,
    Busy,
    Idle,
}

/// View that appends every callback to a shared log
#[derive(Clone, Default)]
pub struct RecordingView {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Callbacks that report an outcome, ignoring busy/idle noise
    pub fn outcomes(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::List { .. } | Event::Error(_) | Event::Text(_) | Event::Image(..) | Event::PreviewError(_)))
            .collect()
    }

    pub fn lists(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::List { children, .. } => Some(children),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_affordance(&self) -> Option<Affordance> {
        self.events().into_iter().rev().find_map(|e| match e {
            Event::Affordance(a) => Some(a),
            _ => None,
        })
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl View for RecordingView {
    fn on_list_updated(&mut self, parent: Option<&Entry>, children: &[Entry]) {
        self.push(Event::List {
            parent: parent.map(Entry::path_string),
            children: children.iter().map(|c| c.name().to_string()).collect(),
        });
    }

    fn on_preview_text(&mut self, text: &str) {
        self.push(Event::Text(text.to_string()));
    }

    fn on_preview_image(&mut self, image: &PreviewImage) {
        self.push(Event::Image(image.width, image.height));
    }

    fn on_preview_meta(&mut self, name: &str, _modified: Option<DateTime<Local>>, size: Option<u64>) {
        self.push(Event::Meta(name.to_string(), size));
    }

    fn on_address_changed(&mut self, address: &str, editable: bool) {
        self.push(Event::Address(address.to_string(), editable));
    }

    fn on_navigation_affordance(&mut self, affordance: Affordance) {
        self.push(Event::Affordance(affordance));
    }

    fn on_error(&mut self, message: &str) {
        self.push(Event::Error(message.to_string()));
    }

    fn on_preview_error(&mut self, message: &str) {
        self.push(Event::PreviewError(message.to_string()));
    }

    fn on_remote_connected(&mut self) {
        self.push(Event::Connected);
    }

    fn on_remote_disconnected(&mut self) {
        self.push(Event::Disconnected);
    }

    fn on_busy(&mut self) {
        self.push(Event::Busy);
    }

    fn on_idle(&mut self) {
        self.push(Event::Idle);
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    true
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Remote backend serving a fixed tree:
///
/// ```text
/// /data
/// ├── level2/
/// │   └── test.txt   "hello remote"
/// └── readme.txt     "read me"
/// ```
pub struct FakeConnector {
    user: String,
    pass: String,
    sessions: Mutex<Vec<Arc<FakeSession>>>,
    hook: Mutex<Option<Hook>>,
    close_delay: Duration,
}

impl FakeConnector {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
            sessions: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
            close_delay: Duration::ZERO,
        }
    }

    /// Sessions take `delay` to close, like a server finishing a transfer first
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// Run `hook` inside every later connect, after the session is created
    pub fn on_connect<F: Fn() + Send + Sync + 'static>(&self, hook: F) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    pub fn sessions(&self) -> Vec<Arc<FakeSession>> {
        self.sessions.lock().clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, params: &ConnectParams) -> app_fs::Result<Arc<dyn RemoteSession>> {
        if params.user != self.user || params.pass != self.pass {
            return Err(FsError::Remote("Login incorrect".to_string()));
        }

        let session = Arc::new(FakeSession::new(&params.display_uri(), self.close_delay));
        self.sessions.lock().push(Arc::clone(&session));

        if let Some(hook) = self.hook.lock().as_ref() {
            hook();
        }
        Ok(session)
    }
}

pub struct FakeSession {
    uri: String,
    dirs: HashMap<String, Vec<RemoteNode>>,
    files: HashMap<String, Vec<u8>>,
    open: AtomicBool,
    full_reads: AtomicUsize,
    close_delay: Duration,
}

impl FakeSession {
    fn new(uri: &str, close_delay: Duration) -> Self {
        let mut dirs = HashMap::new();
        dirs.insert(
            "/data".to_string(),
            vec![
                RemoteNode::directory("/data/level2"),
                RemoteNode::file("/data/readme.txt", 7),
            ],
        );
        dirs.insert(
            "/data/level2".to_string(),
            vec![RemoteNode::file("/data/level2/test.txt", 12)],
        );

        let mut files = HashMap::new();
        files.insert("/data/readme.txt".to_string(), b"read me".to_vec());
        files.insert("/data/level2/test.txt".to_string(), b"hello remote".to_vec());

        Self {
            uri: uri.to_string(),
            dirs,
            files,
            open: AtomicBool::new(true),
            full_reads: AtomicUsize::new(0),
            close_delay,
        }
    }

    /// How many times a whole file was transferred
    pub fn full_reads(&self) -> usize {
        self.full_reads.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> app_fs::Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FsError::Remote("session closed".to_string()))
        }
    }
}

impl RemoteSession for FakeSession {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn root(&self) -> &str {
        "/data"
    }

    fn list(&self, path: &str) -> app_fs::Result<Vec<RemoteNode>> {
        self.ensure_open()?;
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn read(&self, path: &str) -> app_fs::Result<Vec<u8>> {
        self.ensure_open()?;
        self.full_reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn read_head(&self, path: &str, limit: usize) -> app_fs::Result<Vec<u8>> {
        self.ensure_open()?;
        self.files
            .get(path)
            .map(|data| data[..data.len().min(limit)].to_vec())
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn close(&self) {
        std::thread::sleep(self.close_delay);
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
