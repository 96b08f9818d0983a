//! Async STOMP client over WebSocket.
//!
//! The client performs the CONNECT/CONNECTED handshake, then hands the read
//! half of the socket to a pump task that merges every inbound event —
//! MESSAGE frames, broker ERROR frames, transport errors, and the close of
//! the stream — onto one [`SessionEvent`] channel. Consumers drive a single
//! receiver instead of juggling callbacks, so "first event wins" races are
//! resolved by channel order.
//!
//! Reconnection is deliberately absent: a session is one connection, owned
//! by one in-flight operation, torn down when that operation resolves.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{StompError, StompResult};
use crate::frame::{Command, Frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything a session can observe after the handshake, merged into one
/// stream. `None` from [`BusSession::recv`] means the channel itself closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Inbound MESSAGE frame body.
    Message {
        destination: Option<String>,
        body: Vec<u8>,
    },

    /// Broker-level ERROR frame.
    ProtocolError(String),

    /// Socket-level failure.
    TransportError(String),

    /// The peer closed the connection.
    Disconnected,
}

/// Per-connection options.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// STOMP heart-beat header values (cx, cy) in milliseconds.
    pub heartbeat: (u32, u32),

    /// Deadline for the combined WebSocket + STOMP handshake.
    pub connect_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            heartbeat: (0, 0),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Connection factory. The seam that lets the ingestion engine run against
/// an in-memory bus in tests.
#[async_trait]
pub trait BusTransport: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        opts: &ConnectOptions,
    ) -> StompResult<Box<dyn BusSession>>;
}

/// One established, authenticated session.
#[async_trait]
pub trait BusSession: Send {
    /// Subscribe to a destination; inbound messages surface via [`recv`].
    ///
    /// [`recv`]: BusSession::recv
    async fn subscribe(&mut self, destination: &str) -> StompResult<()>;

    /// Publish a text body to a destination.
    async fn publish(&mut self, destination: &str, body: &str) -> StompResult<()>;

    /// Next session event. Cancel-safe.
    async fn recv(&mut self) -> Option<SessionEvent>;

    /// Best-effort teardown: unsubscribe, DISCONNECT, close the socket.
    /// Errors are ignored — by the time this runs the result has already
    /// been decided.
    async fn disconnect(&mut self);
}

// ============================================================================
// WebSocket implementation
// ============================================================================

/// [`BusTransport`] over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl BusTransport for WsTransport {
    async fn connect(
        &self,
        url: &str,
        opts: &ConnectOptions,
    ) -> StompResult<Box<dyn BusSession>> {
        let session = timeout(opts.connect_timeout, WsSession::open(url, opts))
            .await
            .map_err(|_| StompError::Timeout {
                action: "connect handshake".into(),
            })??;
        Ok(Box::new(session))
    }
}

pub struct WsSession {
    writer: SplitSink<WsStream, WsMessage>,
    events: mpsc::Receiver<SessionEvent>,
    subscription: Option<String>,
    pump: JoinHandle<()>,
}

impl WsSession {
    async fn open(url: &str, opts: &ConnectOptions) -> StompResult<Self> {
        let mut request =
            url.into_client_request().map_err(|e| StompError::Transport {
                details: format!("invalid url: {e}").into(),
            })?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static("v12.stomp"),
        );

        info!(url = %redact_url(url), "connecting to stomp endpoint");
        let (ws, _) =
            connect_async(request)
                .await
                .map_err(|e| StompError::Transport {
                    details: e.to_string().into(),
                })?;
        let (mut writer, mut reader) = ws.split();

        let connect = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", host_of(url))
            .header(
                "heart-beat",
                &format!("{},{}", opts.heartbeat.0, opts.heartbeat.1),
            );
        send_frame(&mut writer, &connect).await?;

        // The server answers with exactly one of CONNECTED or ERROR.
        loop {
            let msg = reader.next().await.ok_or(StompError::Transport {
                details: "connection closed during handshake".into(),
            })?;
            let msg = msg.map_err(|e| StompError::Transport {
                details: e.to_string().into(),
            })?;
            let Some(frame) = parse_ws_message(&msg)? else {
                continue;
            };
            match frame.command {
                Command::Connected => {
                    debug!(
                        version = frame.get("version").unwrap_or("?"),
                        "stomp session established"
                    );
                    break;
                }
                Command::Error => {
                    return Err(StompError::Protocol {
                        details: error_text(&frame).into(),
                    });
                }
                other => {
                    warn!(command = other.as_str(), "unexpected frame before CONNECTED");
                }
            }
        }

        let (event_tx, event_rx) = mpsc::channel(256);
        let pump = tokio::spawn(read_pump(reader, event_tx));

        Ok(Self {
            writer,
            events: event_rx,
            subscription: None,
            pump,
        })
    }
}

#[async_trait]
impl BusSession for WsSession {
    async fn subscribe(&mut self, destination: &str) -> StompResult<()> {
        let id = format!("sub-{}", Uuid::new_v4());
        let frame = Frame::new(Command::Subscribe)
            .header("id", &id)
            .header("destination", destination)
            .header("ack", "auto");
        send_frame(&mut self.writer, &frame).await?;
        self.subscription = Some(id);
        debug!(destination, "subscribed");
        Ok(())
    }

    async fn publish(&mut self, destination: &str, body: &str) -> StompResult<()> {
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "text/plain")
            .body(body);
        send_frame(&mut self.writer, &frame).await
    }

    async fn recv(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    async fn disconnect(&mut self) {
        if let Some(id) = self.subscription.take() {
            let frame = Frame::new(Command::Unsubscribe).header("id", &id);
            let _ = send_frame(&mut self.writer, &frame).await;
        }
        let _ = send_frame(&mut self.writer, &Frame::new(Command::Disconnect)).await;
        let _ = self.writer.close().await;
        self.pump.abort();
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

// ============================================================================
// Read pump
// ============================================================================

/// Forwards every inbound event onto the session channel until the stream
/// ends. Exactly one of {TransportError, Disconnected} is the final event.
async fn read_pump(
    mut reader: SplitStream<WsStream>,
    tx: mpsc::Sender<SessionEvent>,
) {
    while let Some(msg) = reader.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                let _ = tx.send(SessionEvent::TransportError(e.to_string())).await;
                return;
            }
        };

        if let WsMessage::Close(_) = msg {
            break;
        }

        let frame = match parse_ws_message(&msg) {
            Ok(Some(f)) => f,
            // Heartbeats and ping/pong control frames.
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "dropping unparseable frame");
                continue;
            }
        };

        match frame.command {
            Command::Message => {
                let event = SessionEvent::Message {
                    destination: frame.get("destination").map(str::to_string),
                    body: frame.body,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            Command::Error => {
                let _ = tx
                    .send(SessionEvent::ProtocolError(error_text(&frame)))
                    .await;
                return;
            }
            Command::Receipt => {}
            other => {
                debug!(command = other.as_str(), "ignoring frame");
            }
        }
    }

    let _ = tx.send(SessionEvent::Disconnected).await;
}

// ============================================================================
// Helpers
// ============================================================================

async fn send_frame(
    writer: &mut SplitSink<WsStream, WsMessage>,
    frame: &Frame,
) -> StompResult<()> {
    let text = String::from_utf8_lossy(&frame.to_bytes()).into_owned();
    writer
        .send(WsMessage::Text(text.into()))
        .await
        .map_err(|e| StompError::Transport {
            details: e.to_string().into(),
        })
}

fn parse_ws_message(msg: &WsMessage) -> StompResult<Option<Frame>> {
    match msg {
        WsMessage::Text(t) => Frame::parse(t.as_str().as_bytes()),
        WsMessage::Binary(b) => Frame::parse(b),
        _ => Ok(None),
    }
}

/// Preferred human-readable text of an ERROR frame: the `message` header,
/// falling back to the body.
fn error_text(frame: &Frame) -> String {
    frame
        .get("message")
        .map(str::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(&frame.body).into_owned())
}

/// Virtual host for the CONNECT frame, taken from the URL authority.
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split('/').next().unwrap_or(rest);
    let host = authority.rsplit('@').next().unwrap_or(authority);
    host.split(':').next().unwrap_or(host)
}

/// Redact embedded credentials from a URL for logging.
pub fn redact_url(url: &str) -> String {
    if let Some(at_idx) = url.find('@') {
        if let Some(proto_end) = url.find("://") {
            let auth_start = proto_end + 3;
            if let Some(colon_idx) = url[auth_start..at_idx].find(':') {
                return format!(
                    "{}***{}",
                    &url[..auth_start + colon_idx + 1],
                    &url[at_idx..]
                );
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("ws://broker:15674/ws"), "broker");
        assert_eq!(host_of("wss://user:pw@bus.example.com/stomp"), "bus.example.com");
        assert_eq!(host_of("broker"), "broker");
    }

    #[test]
    fn url_redaction() {
        assert_eq!(
            redact_url("ws://broker:15674/ws"),
            "ws://broker:15674/ws"
        );
        assert_eq!(
            redact_url("ws://user:secret@broker:15674/ws"),
            "ws://user:***@broker:15674/ws"
        );
    }

    #[test]
    fn error_text_prefers_message_header() {
        let frame = Frame::new(Command::Error)
            .header("message", "bad destination")
            .body("long description");
        assert_eq!(error_text(&frame), "bad destination");

        let frame = Frame::new(Command::Error).body("body only");
        assert_eq!(error_text(&frame), "body only");
    }

    #[test]
    fn default_options() {
        let opts = ConnectOptions::default();
        assert_eq!(opts.heartbeat, (0, 0));
        assert_eq!(opts.connect_timeout, Duration::from_secs(10));
    }
}
