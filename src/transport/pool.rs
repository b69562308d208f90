//! Session-routed WebSocket server.
//!
//! Every Firefox process connects to the same localhost port. The first
//! message on a socket is READY, which names the session; from then on the
//! pool routes requests for that session to its [`Connection`].
//!
//! ```text
//!   launcher ──wait_for_session(S)──┐
//!                                   ▼
//!   socket ──READY{S}──► SessionTable ──► live[S] = Connection
//!                                   │
//!   tab ──send(S, req)──────────────┘
//! ```
//!
//! READY and `wait_for_session` may arrive in either order; whichever comes
//! second completes the handshake.

// ============================================================================
// Imports
// ============================================================================

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{Request, Response};
use crate::transport::Connection;
use crate::transport::connection::ReadyData;

// ============================================================================
// Constants
// ============================================================================

/// How long a launcher waits for its Firefox to connect.
const SESSION_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SessionTable
// ============================================================================

/// Handshake state of a session that is not yet claimed by a launcher.
enum Handshake {
    /// A launcher is waiting; READY has not arrived.
    Waiting(oneshot::Sender<ReadyData>),
    /// READY arrived before anyone waited.
    Arrived(ReadyData),
}

#[derive(Default)]
struct SessionTable {
    live: FxHashMap<SessionId, Connection>,
    handshakes: FxHashMap<SessionId, Handshake>,
}

// ============================================================================
// ConnectionPool
// ============================================================================

/// Localhost WebSocket server multiplexing sessions over one port.
pub struct ConnectionPool {
    port: u16,
    sessions: Mutex<SessionTable>,
    stop: CancellationToken,
}

impl ConnectionPool {
    /// Binds `127.0.0.1` on a free port and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn new() -> Result<Arc<Self>> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();

        let pool = Arc::new(Self {
            port,
            sessions: Mutex::new(SessionTable::default()),
            stop: CancellationToken::new(),
        });
        tokio::spawn(Arc::clone(&pool).accept_loop(listener));

        info!(port, "WebSocket server listening");
        Ok(pool)
    }

    /// Returns `ws://127.0.0.1:{port}`.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the number of sessions with a live connection.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.sessions.lock().live.len()
    }
}

// ============================================================================
// ConnectionPool - Sessions
// ============================================================================

impl ConnectionPool {
    /// Waits until the Firefox launched for `session_id` sends READY.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if READY does not arrive in time
    /// - [`Error::Connection`] if the pool shuts down while waiting
    pub async fn wait_for_session(&self, session_id: SessionId) -> Result<ReadyData> {
        let rx = {
            let mut sessions = self.sessions.lock();
            if let Some(Handshake::Arrived(ready)) = sessions.handshakes.remove(&session_id) {
                debug!(%session_id, "Session was already connected");
                return Ok(ready);
            }
            let (tx, rx) = oneshot::channel();
            sessions
                .handshakes
                .insert(session_id, Handshake::Waiting(tx));
            rx
        };

        match tokio::time::timeout(SESSION_CONNECT_TIMEOUT, rx).await {
            Ok(Ok(ready)) => {
                debug!(%session_id, "Session connected");
                Ok(ready)
            }
            Ok(Err(_)) => Err(Error::connection("Pool shut down while waiting for session")),
            Err(_) => {
                self.sessions.lock().handshakes.remove(&session_id);
                Err(Error::connection_timeout(
                    SESSION_CONNECT_TIMEOUT.as_millis() as u64,
                ))
            }
        }
    }

    /// Sends with the default request timeout.
    ///
    /// # Errors
    ///
    /// [`Error::SessionNotFound`] for an unknown session, otherwise as
    /// [`Connection::send`].
    pub async fn send(&self, session_id: SessionId, request: Request) -> Result<Response> {
        self.connection(session_id)?.send(request).await
    }

    /// Sends with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// [`Error::SessionNotFound`] for an unknown session, otherwise as
    /// [`Connection::send_with_timeout`].
    pub async fn send_with_timeout(
        &self,
        session_id: SessionId,
        request: Request,
        limit: Duration,
    ) -> Result<Response> {
        self.connection(session_id)?
            .send_with_timeout(request, limit)
            .await
    }

    /// Sends with no deadline; the wait ends early when `cancel` fires.
    ///
    /// # Errors
    ///
    /// [`Error::SessionNotFound`] for an unknown session, otherwise as
    /// [`Connection::send_cancellable`].
    pub async fn send_cancellable(
        &self,
        session_id: SessionId,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.connection(session_id)?
            .send_cancellable(request, cancel)
            .await
    }

    /// Drops a session and closes its socket. Unknown sessions are ignored.
    pub fn remove(&self, session_id: SessionId) {
        let connection = {
            let mut sessions = self.sessions.lock();
            sessions.handshakes.remove(&session_id);
            sessions.live.remove(&session_id)
        };

        if let Some(connection) = connection {
            connection.shutdown();
            debug!(%session_id, "Session removed");
        }
    }

    /// Stops accepting, closes every connection and fails every waiter.
    pub async fn shutdown(&self) {
        self.stop.cancel();

        let table = std::mem::take(&mut *self.sessions.lock());
        for connection in table.live.values() {
            connection.shutdown();
        }

        info!(
            connections = table.live.len(),
            waiters = table.handshakes.len(),
            "WebSocket server stopped"
        );
    }

    fn connection(&self, session_id: SessionId) -> Result<Connection> {
        self.sessions
            .lock()
            .live
            .get(&session_id)
            .cloned()
            .ok_or_else(|| Error::session_not_found(session_id))
    }

    /// Records a connection that completed READY and hands the data to its
    /// launcher, or parks it until the launcher asks.
    fn register(&self, session_id: SessionId, connection: Connection, ready: ReadyData) {
        let mut sessions = self.sessions.lock();
        if let Some(previous) = sessions.live.insert(session_id, connection) {
            warn!(%session_id, "Session reconnected, dropping previous socket");
            previous.shutdown();
        }

        match sessions.handshakes.remove(&session_id) {
            Some(Handshake::Waiting(tx)) => {
                let _ = tx.send(ready);
            }
            Some(Handshake::Arrived(_)) | None => {
                sessions
                    .handshakes
                    .insert(session_id, Handshake::Arrived(ready));
            }
        }
    }
}

// ============================================================================
// ConnectionPool - Accept Loop
// ============================================================================

impl ConnectionPool {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            let accepted = tokio::select! {
                () = self.stop.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    let pool = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = pool.handshake(stream, addr).await {
                            warn!(error = %e, %addr, "Handshake failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            }
        }

        debug!("Accept loop stopped");
    }

    /// Upgrades a socket, waits for READY and registers the session.
    async fn handshake(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let connection = Connection::new(ws);
        let ready = match connection.wait_ready().await {
            Ok(ready) => ready,
            Err(e) => {
                connection.shutdown();
                return Err(e);
            }
        };

        let Some(session_id) = SessionId::from_u32(ready.session_id) else {
            connection.shutdown();
            return Err(Error::protocol("READY carried session id 0"));
        };

        info!(%session_id, %addr, tab_id = ready.tab_id, "Session ready");
        self.register(session_id, connection, ready);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::SinkExt;
    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

    use crate::identifiers::{FrameId, TabId};
    use crate::protocol::{Command, SessionCommand};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    fn status_request() -> Request {
        Request::new(
            TabId::new(1).expect("tab id"),
            FrameId::main(),
            Command::Session(SessionCommand::Status),
        )
    }

    async fn connect_and_ready(pool: &ConnectionPool, session_id: SessionId, tab_id: u32) -> Client {
        let (mut client, _) = connect_async(pool.ws_url()).await.expect("connect");
        let ready = json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "type": "success",
            "result": {"sessionId": session_id.as_u32(), "tabId": tab_id}
        });
        client
            .send(Message::Text(ready.to_string().into()))
            .await
            .expect("send ready");
        client
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = ConnectionPool::new().await.expect("pool");
        assert!(pool.port() > 0);
        assert_eq!(pool.ws_url(), format!("ws://127.0.0.1:{}", pool.port()));
        assert_eq!(pool.connection_count(), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_to_unknown_session() {
        let pool = ConnectionPool::new().await.expect("pool");

        let result = pool.send(SessionId::next(), status_request()).await;
        assert!(matches!(result, Err(Error::SessionNotFound { .. })));

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_then_ready() {
        let pool = ConnectionPool::new().await.expect("pool");
        let session_id = SessionId::next();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.wait_for_session(session_id).await })
        };
        while pool.sessions.lock().handshakes.is_empty() {
            tokio::task::yield_now().await;
        }

        let _client = connect_and_ready(&pool, session_id, 3).await;

        let ready = waiter.await.expect("join").expect("ready");
        assert_eq!(ready.tab_id, 3);
        assert_eq!(pool.connection_count(), 1);

        pool.remove(session_id);
        assert_eq!(pool.connection_count(), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_ready_before_wait() {
        let pool = ConnectionPool::new().await.expect("pool");
        let session_id = SessionId::next();

        let _client = connect_and_ready(&pool, session_id, 9).await;
        while pool.connection_count() == 0 {
            tokio::task::yield_now().await;
        }

        let ready = pool.wait_for_session(session_id).await.expect("ready");
        assert_eq!(ready.tab_id, 9);
        assert!(pool.sessions.lock().handshakes.is_empty());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_fails_waiters() {
        let pool = ConnectionPool::new().await.expect("pool");
        let session_id = SessionId::next();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.wait_for_session(session_id).await })
        };
        while pool.sessions.lock().handshakes.is_empty() {
            tokio::task::yield_now().await;
        }

        pool.shutdown().await;
        let err = waiter.await.expect("join").unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_remove_unknown_session() {
        let pool = ConnectionPool::new().await.expect("pool");
        pool.remove(SessionId::next());
        assert_eq!(pool.connection_count(), 0);
        pool.shutdown().await;
    }
}
