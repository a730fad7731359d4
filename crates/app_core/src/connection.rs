//! Remote session lifecycle

use crate::error::{BrowseError, Result};
use crate::job::JobToken;
use app_fs::{ConnectParams, Connector, RemoteSession};
use std::sync::Arc;

/// Open a session in the background. A session that arrives after the
/// job was superseded is closed before returning.
pub fn open_session(
    connector: &dyn Connector,
    params: &ConnectParams,
    token: &JobToken,
) -> Result<Arc<dyn RemoteSession>> {
    token.check()?;
    tracing::debug!("Connecting to {}", params.display_uri());

    let session = connector.connect(params).map_err(BrowseError::connection)?;
    if !token.is_current() {
        tracing::debug!("Connect superseded, closing {}", session.uri());
        session.close();
        return Err(BrowseError::Canceled);
    }
    Ok(session)
}

/// The active remote session, if any
#[derive(Default)]
pub struct ConnectionState {
    session: Option<Arc<dyn RemoteSession>>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Arc<dyn RemoteSession>> {
        self.session.as_ref()
    }

    /// Store a new session and hand back the one it replaces, still open
    pub fn attach(&mut self, session: Arc<dyn RemoteSession>) -> Option<Arc<dyn RemoteSession>> {
        let old = self.session.replace(session);
        if let Some(old) = &old {
            tracing::info!("Replacing remote session {}", old.uri());
        }
        old
    }

    /// Forget the session without closing it
    pub fn detach(&mut self) -> Option<Arc<dyn RemoteSession>> {
        self.session.take()
    }

    /// Close and forget the session. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }
}
