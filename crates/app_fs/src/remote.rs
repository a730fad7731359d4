//! Remote backend: FTP sessions
//!
//! Wire-level FTP is handled by `suppaftp`. The engine only sees the
//! [`Connector`] and [`RemoteSession`] traits, so other transports or
//! in-memory fakes can be plugged in.

use crate::entry::RemoteEntry;
use crate::{Entry, FsError, Liveness, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};
use parking_lot::Mutex;
use std::fmt;
use std::io::Read;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;
use suppaftp::types::{FileType, Mode};
use suppaftp::FtpStream;

/// Default FTP control port
pub const DEFAULT_FTP_PORT: u16 = 21;

/// File or directory reported by a remote listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub name: String,
    /// Absolute path on the server
    pub path: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Local>>,
}

impl RemoteNode {
    pub fn directory(path: &str) -> Self {
        Self {
            name: base_name(path),
            path: path.to_string(),
            is_dir: true,
            size: None,
            modified: None,
        }
    }

    pub fn file(path: &str, size: u64) -> Self {
        Self {
            name: base_name(path),
            path: path.to_string(),
            is_dir: false,
            size: Some(size),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Local>>) -> Self {
        self.modified = modified;
        self
    }
}

/// An open remote file system
pub trait RemoteSession: Send + Sync {
    /// Address shown to the user, without credentials or trailing slash
    fn uri(&self) -> &str;

    /// Directory the session starts in; it has no parent
    fn root(&self) -> &str;

    fn list(&self, path: &str) -> Result<Vec<RemoteNode>>;

    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// First `limit` bytes of a file, without transferring the rest
    fn read_head(&self, path: &str, limit: usize) -> Result<Vec<u8>>;

    fn close(&self);

    fn is_open(&self) -> bool;
}

/// Opens remote sessions
pub trait Connector: Send + Sync {
    fn connect(&self, params: &ConnectParams) -> Result<Arc<dyn RemoteSession>>;
}

/// Fields of the connect dialog. Blank fields are optional.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
}

impl ConnectParams {
    pub fn new(host: &str, port: &str, user: &str, pass: &str) -> Self {
        Self {
            host: host.trim().to_string(),
            port: port.trim().to_string(),
            user: user.trim().to_string(),
            pass: pass.to_string(),
        }
    }

    /// Connection URI, `ftp://[user[:pass]@]host[:port]/`
    pub fn uri(&self) -> String {
        let mut uri = String::from("ftp://");
        if !self.user.is_empty() {
            uri.push_str(&self.user);
            if !self.pass.is_empty() {
                uri.push(':');
                uri.push_str(&self.pass);
            }
            uri.push('@');
        }
        uri.push_str(&self.host);
        if !self.port.is_empty() {
            uri.push(':');
            uri.push_str(&self.port);
        }
        uri.push('/');
        uri
    }

    /// URI without the password, used as the address prefix of remote entries
    pub fn display_uri(&self) -> String {
        let redacted = Self {
            pass: String::new(),
            ..self.clone()
        };
        redacted.uri().trim_end_matches('/').to_string()
    }

    /// Port to dial; `default` when the field is blank
    pub fn port_number(&self, default: u16) -> Result<u16> {
        if self.port.is_empty() {
            return Ok(default);
        }
        self.port
            .parse()
            .map_err(|_| FsError::Remote(format!("Invalid port: {}", self.port)))
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &if self.pass.is_empty() { "" } else { "***" })
            .finish()
    }
}

/// Connects over plain FTP in passive mode
#[derive(Debug, Clone)]
pub struct FtpConnector {
    timeout: Duration,
    default_port: u16,
}

impl FtpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            default_port: DEFAULT_FTP_PORT,
        }
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

impl Connector for FtpConnector {
    fn connect(&self, params: &ConnectParams) -> Result<Arc<dyn RemoteSession>> {
        if params.host.is_empty() {
            return Err(FsError::Remote("Host is required".to_string()));
        }
        let port = params.port_number(self.default_port)?;
        let addr = (params.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| FsError::Remote(format!("Cannot resolve {}: {}", params.host, e)))?
            .next()
            .ok_or_else(|| FsError::Remote(format!("Cannot resolve {}", params.host)))?;

        let (user, password) = if params.user.is_empty() {
            ("anonymous", "anonymous@")
        } else {
            (params.user.as_str(), params.pass.as_str())
        };

        let mut ftp = FtpStream::connect_timeout(addr, self.timeout).map_err(map_ftp_error)?;
        ftp.set_mode(Mode::Passive);
        ftp.login(user, password).map_err(map_ftp_error)?;
        ftp.transfer_type(FileType::Binary).map_err(map_ftp_error)?;
        let root = ftp.pwd().map_err(map_ftp_error)?;

        let uri = params.display_uri();
        tracing::info!("FTP session opened: {} (root {})", uri, root);

        Ok(Arc::new(FtpSession {
            stream: Mutex::new(Some(ftp)),
            uri,
            root: if root.is_empty() { "/".to_string() } else { root },
        }))
    }
}

/// Active FTP session; one control connection shared by all jobs
pub struct FtpSession {
    stream: Mutex<Option<FtpStream>>,
    uri: String,
    root: String,
}

impl FtpSession {
    fn with_stream<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut FtpStream) -> Result<T>,
    {
        let mut guard = self.stream.lock();
        let stream = guard
            .as_mut()
            .ok_or_else(|| FsError::Remote("FTP connection closed".to_string()))?;
        f(stream)
    }
}

impl RemoteSession for FtpSession {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn root(&self) -> &str {
        &self.root
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteNode>> {
        let lines = self.with_stream(|stream| stream.list(Some(path)).map_err(map_ftp_error))?;
        Ok(lines
            .iter()
            .filter_map(|line| {
                let node = parse_list_line(line, path);
                if node.is_none() {
                    tracing::debug!("Ignoring LIST line: {}", line);
                }
                node
            })
            .collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.with_stream(|stream| {
            let cursor = stream.retr_as_buffer(path).map_err(map_ftp_error)?;
            Ok(cursor.into_inner())
        })
    }

    fn read_head(&self, path: &str, limit: usize) -> Result<Vec<u8>> {
        self.with_stream(|stream| {
            let reader = stream.retr_as_stream(path).map_err(map_ftp_error)?;
            let mut head = reader.take(limit as u64);
            let mut buffer = Vec::with_capacity(limit.min(64 * 1024));
            let read = head.read_to_end(&mut buffer);

            // Dropping the data connection early makes the server answer 426
            if let Err(e) = stream.finalize_retr_stream(head.into_inner()) {
                tracing::debug!("Partial RETR of {} ended with: {}", path, e);
            }
            read?;
            Ok(buffer)
        })
    }

    fn close(&self) {
        if let Some(mut stream) = self.stream.lock().take() {
            if let Err(e) = stream.quit() {
                tracing::debug!("FTP quit failed: {}", e);
            }
            tracing::info!("FTP session closed: {}", self.uri);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.lock().is_some()
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl RemoteEntry {
    pub(crate) fn list_children(&self, live: Liveness<'_>) -> Result<Vec<Entry>> {
        if !self.node.is_dir {
            return Err(FsError::NotADirectory(self.uri()));
        }
        if !live() {
            return Err(FsError::Canceled);
        }
        let nodes = self.session.list(&self.node.path)?;

        let mut entries = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !live() {
                return Err(FsError::Canceled);
            }
            entries.push(Entry::Remote(self.child(node)));
        }
        Ok(entries)
    }

    pub(crate) fn read_all(&self) -> Result<Vec<u8>> {
        if self.node.is_dir {
            return Err(FsError::Remote(format!("Is a directory: {}", self.uri())));
        }
        self.session.read(&self.node.path)
    }

    pub(crate) fn read_head(&self, limit: usize) -> Result<Vec<u8>> {
        if self.node.is_dir {
            return Err(FsError::Remote(format!("Is a directory: {}", self.uri())));
        }
        self.session.read_head(&self.node.path, limit)
    }
}

/// Convert suppaftp error to a file system error
fn map_ftp_error(e: suppaftp::FtpError) -> FsError {
    match &e {
        suppaftp::FtpError::ConnectionError(io) => FsError::Remote(io.to_string()),
        suppaftp::FtpError::UnexpectedResponse(resp) => {
            let code = resp.status.code();
            let body = String::from_utf8_lossy(&resp.body).trim().to_string();
            match code {
                530 => FsError::Remote("Login incorrect".to_string()),
                550 => FsError::NotFound(body),
                553 => FsError::AccessDenied(body),
                _ => FsError::Remote(format!("FTP error {}: {}", code, body)),
            }
        }
        _ => FsError::Remote(e.to_string()),
    }
}

pub(crate) fn base_name(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

pub(crate) fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(trimmed[..idx].to_string()),
        None => None,
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base == "/" || base.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

/// Parse one Unix-style `LIST` line, e.g.
/// `drwxr-xr-x 2 ftp ftp 4096 Mar 01 12:30 docs`
pub fn parse_list_line(line: &str, base_path: &str) -> Option<RemoteNode> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }

    let perms = parts[0];
    let is_dir = perms.starts_with('d');
    let is_symlink = perms.starts_with('l');

    // The name may contain spaces; take it from the original line
    let name_start = nth_field_offset(line, 8)?;
    let mut name = &line[name_start..];
    if is_symlink {
        if let Some(idx) = name.find(" -> ") {
            name = &name[..idx];
        }
    }
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    let size: u64 = parts[4].parse().unwrap_or(0);
    let path = join_path(base_path, name);

    Some(RemoteNode {
        name: name.to_string(),
        path,
        is_dir,
        size: if is_dir { None } else { Some(size) },
        modified: parse_list_date(parts[5], parts[6], parts[7]),
    })
}

fn nth_field_offset(line: &str, n: usize) -> Option<usize> {
    let mut fields = 0;
    let mut in_field = false;
    for (idx, c) in line.char_indices() {
        if c.is_whitespace() {
            in_field = false;
        } else if !in_field {
            if fields == n {
                return Some(idx);
            }
            fields += 1;
            in_field = true;
        }
    }
    None
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// `Mar 01 12:30` (this year, or last year if that is in the future) or `Mar 01 2019`
fn parse_list_date(month: &str, day: &str, time_or_year: &str) -> Option<DateTime<Local>> {
    let month = MONTHS.iter().position(|m| m.eq_ignore_ascii_case(month))? as u32 + 1;
    let day: u32 = day.parse().ok()?;

    let (date, hour, minute) = match time_or_year.split_once(':') {
        Some((h, m)) => {
            let hour: u32 = h.parse().ok()?;
            let minute: u32 = m.parse().ok()?;
            let today = Local::now().date_naive();
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
            let date = match this_year {
                Some(date) if date <= today + chrono::Duration::days(1) => date,
                _ => NaiveDate::from_ymd_opt(today.year() - 1, month, day)?,
            };
            (date, hour, minute)
        }
        None => (NaiveDate::from_ymd_opt(time_or_year.parse().ok()?, month, day)?, 0, 0),
    };

    Local
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0)?)
        .earliest()
}
