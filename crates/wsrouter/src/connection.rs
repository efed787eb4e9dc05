//! Endpoint abstraction over a WebSocket transport.

use crate::config::RouterConfig;
use crate::types::{Frame, FrameKind, RouterError, RouterResult};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async_with_config, tungstenite, WebSocketStream};
use tracing::{debug, warn};

/// Capability set the router requires from a managed endpoint.
///
/// Any transport implementing these four operations qualifies; this is the
/// seam where protocol specifics are injected. The router itself never
/// constructs endpoints — callers hand it ready-to-use connections.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Transmit an opaque payload to the peer.
    ///
    /// An endpoint flagged offline probes first and fails without touching
    /// the data path if the probe fails. A transmission failure closes the
    /// endpoint (idempotently) before the error is returned.
    async fn send(&self, content: &[u8]) -> RouterResult<()>;

    /// Send a liveness signal with a bounded timeout. Failure flips the
    /// endpoint offline; success flips it back online.
    async fn probe(&self) -> RouterResult<()>;

    /// Block until the next data frame arrives from the peer.
    async fn recv(&self) -> RouterResult<Frame>;

    /// Release the underlying transport. Safe to call more than once.
    async fn close(&self);

    /// Whether the last probe (or the initial handshake) saw the peer alive.
    fn is_online(&self) -> bool;
}

/// A managed WebSocket endpoint.
///
/// The write half is behind its own mutex, which serializes send, probe and
/// close per endpoint; the read half is independent so a blocked receive
/// never stalls outbound delivery.
pub struct WsConnection<S> {
    id: String,
    writer: Mutex<SplitSink<WebSocketStream<S>, tungstenite::Message>>,
    reader: Mutex<SplitStream<WebSocketStream<S>>>,
    online: AtomicBool,
    closed: AtomicBool,
    probe_timeout: Duration,
    write_deadline: Option<Duration>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-upgraded WebSocket stream. The endpoint starts online.
    pub fn new(id: impl Into<String>, stream: WebSocketStream<S>, config: &RouterConfig) -> Self {
        let (writer, reader) = stream.split();
        Self {
            id: id.into(),
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            online: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            probe_timeout: config.probe_timeout,
            write_deadline: config.write_deadline,
        }
    }

    /// Perform the server-side WebSocket handshake on a raw stream and wrap
    /// the result.
    pub async fn accept(
        id: impl Into<String>,
        stream: S,
        config: &RouterConfig,
    ) -> RouterResult<Self> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = config.max_message_size;

        let ws_stream = accept_async_with_config(stream, Some(ws_config)).await?;
        let connection = Self::new(id, ws_stream, config);
        debug!(id = %connection.id, "websocket handshake complete");
        Ok(connection)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Flag the endpoint offline. The next send will probe first and only
    /// transmit once the peer answers; read loops use this when they
    /// observe transport trouble.
    pub fn mark_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    /// Receive the next data frame and decode its JSON payload into `into`.
    ///
    /// Returns the kind of frame the payload arrived in. Fails with
    /// [`RouterError::Decode`] when the payload is not valid JSON for `T`.
    pub async fn receive<T: DeserializeOwned>(&self, into: &mut T) -> RouterResult<FrameKind> {
        let frame = self.recv().await?;
        *into = serde_json::from_slice(&frame.payload)?;
        Ok(frame.kind)
    }

    async fn write_frame(&self, frame: tungstenite::Message) -> RouterResult<()> {
        let mut writer = self.writer.lock().await;
        match self.write_deadline {
            Some(deadline) => match timeout(deadline, writer.send(frame)).await {
                Ok(result) => result.map_err(RouterError::from),
                Err(_) => Err(RouterError::DeadlineExceeded),
            },
            None => writer.send(frame).await.map_err(RouterError::from),
        }
    }
}

#[async_trait]
impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&self, content: &[u8]) -> RouterResult<()> {
        if !self.online.load(Ordering::SeqCst) {
            // Lazily re-probe a flagged endpoint; a dead peer fails here
            // and the endpoint stays offline without a write attempt.
            self.probe().await?;
        }

        let result = self
            .write_frame(tungstenite::Message::Binary(content.to_vec()))
            .await;
        if let Err(err) = &result {
            warn!(id = %self.id, error = %err, "send failed, closing endpoint");
            self.close().await;
        }
        result
    }

    async fn probe(&self) -> RouterResult<()> {
        let outcome = {
            let mut writer = self.writer.lock().await;
            match timeout(
                self.probe_timeout,
                writer.send(tungstenite::Message::Ping(Vec::new())),
            )
            .await
            {
                Ok(result) => result.map_err(RouterError::from),
                Err(_) => Err(RouterError::DeadlineExceeded),
            }
        };

        match outcome {
            Ok(()) => {
                if !self.online.swap(true, Ordering::SeqCst) {
                    debug!(id = %self.id, "endpoint back online");
                }
                Ok(())
            }
            Err(err) => {
                self.online.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    async fn recv(&self) -> RouterResult<Frame> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Ok(Frame {
                        kind: FrameKind::Text,
                        payload: text.into_bytes(),
                    })
                }
                Some(Ok(tungstenite::Message::Binary(data))) => {
                    return Ok(Frame {
                        kind: FrameKind::Binary,
                        payload: data,
                    })
                }
                Some(Ok(tungstenite::Message::Close(_))) | None => {
                    return Err(RouterError::ConnectionClosed)
                }
                // Ping/pong control frames are transport-level noise here
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
            }
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Bounded: a peer that stopped reading must not wedge the caller on
        // the close flush. Past the deadline the stream is simply dropped
        // with the connection.
        let graceful = timeout(self.probe_timeout, async {
            let mut writer = self.writer.lock().await;
            writer.close().await
        })
        .await;
        match graceful {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(id = %self.id, error = %err, "close handshake failed"),
            Err(_) => debug!(id = %self.id, "close handshake timed out"),
        }
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
