//! One WebSocket to one Firefox extension.
//!
//! Callers put a reply slot into the shared correlation table, then hand
//! the serialized request to the pump task. The pump writes outgoing frames
//! and resolves slots as replies arrive. A caller that stops waiting
//! (timeout, cancellation, or its future being dropped) removes its slot on
//! the way out, so late replies are simply ignored.
//!
//! When the socket ends, the table is closed: every waiting caller gets
//! [`Error::ConnectionClosed`] and new requests are refused.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Deadline for ordinary commands.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests allowed in flight per connection, READY included.
pub const MAX_PENDING_REQUESTS: usize = 100;

/// Deadline for the extension's first frame.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

type Reply = Result<Response>;

// ============================================================================
// ReadyData
// ============================================================================

/// Contents of the READY handshake.
#[derive(Debug, Clone)]
pub struct ReadyData {
    /// Tab that loaded the init page.
    pub tab_id: u32,
    pub session_id: u32,
}

/// Reads a non-zero `u32` id from READY.
fn ready_id(response: &Response, key: &str) -> Result<u32> {
    u32::try_from(response.get_u64(key))
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| Error::protocol(format!("READY without a valid {key}")))
}

// ============================================================================
// Correlation
// ============================================================================

/// Reply slots keyed by request id. `None` once the socket is gone.
struct Correlation {
    slots: Mutex<Option<FxHashMap<RequestId, oneshot::Sender<Reply>>>>,
}

impl Correlation {
    fn new() -> Self {
        Self {
            slots: Mutex::new(Some(FxHashMap::default())),
        }
    }

    fn register(&self, id: RequestId) -> Result<oneshot::Receiver<Reply>> {
        let mut slots = self.slots.lock();
        let slots = slots.as_mut().ok_or(Error::ConnectionClosed)?;

        if slots.len() >= MAX_PENDING_REQUESTS {
            warn!(pending = slots.len(), "Too many pending requests");
            return Err(Error::protocol(format!(
                "Too many pending requests: {}/{MAX_PENDING_REQUESTS}",
                slots.len()
            )));
        }

        let (tx, rx) = oneshot::channel();
        slots.insert(id, tx);
        Ok(rx)
    }

    /// Delivers `reply` to the slot for `id`, if someone still waits.
    fn resolve(&self, id: RequestId, reply: Reply) {
        let slot = self.slots.lock().as_mut().and_then(|s| s.remove(&id));
        match slot {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => trace!(%id, "Reply for abandoned request"),
        }
    }

    fn forget(&self, id: RequestId) {
        if let Some(slots) = self.slots.lock().as_mut() {
            slots.remove(&id);
        }
    }

    /// Fails every slot and refuses new ones. Returns how many were failed.
    fn close(&self) -> usize {
        let Some(slots) = self.slots.lock().take() else {
            return 0;
        };
        let count = slots.len();
        for (_, tx) in slots {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }
        count
    }

    fn len(&self) -> usize {
        self.slots.lock().as_ref().map_or(0, FxHashMap::len)
    }
}

/// Removes a slot when its waiter goes away, however that happens.
struct SlotGuard<'a> {
    correlation: &'a Correlation,
    id: RequestId,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.correlation.forget(self.id);
    }
}

// ============================================================================
// Connection
// ============================================================================

enum Outbound {
    Frame { id: RequestId, text: String },
    Close,
}

/// Handle to a connected extension. Clones share one pump task, which runs
/// until [`Connection::shutdown`] or the socket closes.
#[derive(Clone)]
pub struct Connection {
    outbox: mpsc::UnboundedSender<Outbound>,
    correlation: Arc<Correlation>,
    /// Taken by the first `wait_ready`.
    ready: Arc<Mutex<Option<oneshot::Receiver<Reply>>>>,
}

impl Connection {
    /// Starts the pump for `ws`. The READY slot is registered first so a
    /// handshake sent right after the upgrade is never missed.
    pub(crate) fn new(ws: WebSocketStream<TcpStream>) -> Self {
        let correlation = Arc::new(Correlation::new());
        let ready = correlation.register(RequestId::ready()).ok();
        let (outbox, outbox_rx) = mpsc::unbounded_channel();

        tokio::spawn(pump(ws, outbox_rx, Arc::clone(&correlation)));

        Self {
            outbox,
            correlation,
            ready: Arc::new(Mutex::new(ready)),
        }
    }

    /// Waits for READY.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if READY does not arrive in time
    /// - [`Error::ConnectionClosed`] if the socket closes first
    /// - [`Error::Protocol`] on a second call, or if READY lacks a non-zero
    ///   `tabId` or `sessionId`
    pub async fn wait_ready(&self) -> Result<ReadyData> {
        let rx = self
            .ready
            .lock()
            .take()
            .ok_or_else(|| Error::protocol("READY already consumed"))?;

        let response = tokio::time::timeout(READY_TIMEOUT, rx)
            .await
            .map_err(|_| Error::connection_timeout(READY_TIMEOUT.as_millis() as u64))?
            .map_err(|_| Error::ConnectionClosed)??;

        let ready = ReadyData {
            tab_id: ready_id(&response, "tabId")?,
            session_id: ready_id(&response, "sessionId")?,
        };
        debug!(tab_id = ready.tab_id, session_id = ready.session_id, "READY");
        Ok(ready)
    }

    /// Sends with the default deadline.
    ///
    /// # Errors
    ///
    /// See [`Connection::send_with_timeout`].
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends and waits at most `limit` for the reply.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] when `limit` passes
    /// - [`Error::ConnectionClosed`] if the socket is gone
    /// - [`Error::Protocol`] if too many requests are in flight
    pub async fn send_with_timeout(&self, request: Request, limit: Duration) -> Result<Response> {
        self.dispatch(request, Some(limit), &CancellationToken::new())
            .await
    }

    /// Sends and waits without a deadline until the reply or `cancel`.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] when `cancel` fires first
    /// - [`Error::ConnectionClosed`] if the socket is gone
    /// - [`Error::Protocol`] if too many requests are in flight
    pub async fn send_cancellable(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.dispatch(request, None, cancel).await
    }

    /// Requests in flight, including an unconsumed READY.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.len()
    }

    /// Closes the socket. Waiting callers fail with `ConnectionClosed`.
    pub fn shutdown(&self) {
        let _ = self.outbox.send(Outbound::Close);
    }

    async fn dispatch(
        &self,
        request: Request,
        limit: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let id = request.id;
        let text = serde_json::to_string(&request)?;
        let rx = self.correlation.register(id)?;
        let _guard = SlotGuard {
            correlation: self.correlation.as_ref(),
            id,
        };

        self.outbox
            .send(Outbound::Frame { id, text })
            .map_err(|_| Error::ConnectionClosed)?;

        let reply = async {
            let received = match limit {
                Some(limit) => tokio::time::timeout(limit, rx)
                    .await
                    .map_err(|_| Error::request_timeout(id, limit.as_millis() as u64))?,
                None => rx.await,
            };
            received.map_err(|_| Error::ConnectionClosed)?
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            reply = reply => reply,
        }
    }
}

// ============================================================================
// Pump
// ============================================================================

async fn pump(
    ws: WebSocketStream<TcpStream>,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
    correlation: Arc<Correlation>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<Response>(&text) {
                    Ok(response) => correlation.resolve(response.id, Ok(response)),
                    Err(e) => trace!(error = %e, "Ignoring non-reply frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Extension closed the socket");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },
            outbound = outbox.recv() => match outbound {
                Some(Outbound::Frame { id, text }) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        correlation.resolve(id, Err(Error::connection(e.to_string())));
                    } else {
                        trace!(%id, "Request written");
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.close().await;
                    break;
                }
            },
        }
    }

    let failed = correlation.close();
    debug!(failed, "Connection pump stopped");
}

// ============================================================================
// Tests
// ============================================================================
