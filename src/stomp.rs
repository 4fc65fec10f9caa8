//! STOMP-over-WebSocket transport
//!
//! Each `connect()` spawns a session task that performs the WebSocket and
//! STOMP handshakes, then runs a read half (MESSAGE frames -> client) and a
//! write half (outbound frames -> WebSocket) until either side ends.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::client::ClientCommand;
use crate::error::AppError;
use crate::frame::Frame;
use crate::transport::{Transport, TransportEvent};

/// Upper bound on the WebSocket + STOMP handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport speaking STOMP 1.2 over a WebSocket
pub struct StompTransport {
    url: String,
    events: mpsc::Sender<ClientCommand>,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    session: Option<JoinHandle<()>>,
    next_subscription: u32,
}

impl StompTransport {
    /// Create a transport reporting to the client command channel
    pub fn new(url: impl Into<String>, events: mpsc::Sender<ClientCommand>) -> Self {
        Self {
            url: url.into(),
            events,
            outbound: None,
            session: None,
            next_subscription: 0,
        }
    }

    fn queue(&self, frame: Frame) {
        match &self.outbound {
            Some(outbound) => {
                if outbound.send(frame).is_err() {
                    debug!("Session writer closed, dropping frame");
                }
            }
            None => debug!("No active session, dropping {} frame", frame.command),
        }
    }
}

impl Transport for StompTransport {
    fn connect(&mut self) {
        if let Some(session) = self.session.take() {
            session.abort();
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound = Some(outbound_tx);
        self.next_subscription = 0;

        let url = self.url.clone();
        let events = self.events.clone();
        self.session = Some(tokio::spawn(run_session(url, outbound_rx, events)));
    }

    fn subscribe(&mut self, destination: &str) {
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;
        self.queue(Frame::subscribe(&id, destination));
    }

    fn publish(&mut self, destination: &str, payload: String) {
        self.queue(Frame::send(destination, payload));
    }

    fn disconnect(&mut self) {
        self.queue(Frame::disconnect());
        // Dropping the sender lets the writer flush, close, and end quietly
        self.outbound = None;
        self.session = None;
    }
}

impl Drop for StompTransport {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.abort();
        }
    }
}

/// Host header value for the STOMP CONNECT frame
pub fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?']).next().unwrap_or(rest);
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if authority.starts_with('[') {
        return authority
            .split_once(']')
            .map_or(authority, |(host, _)| &host[1..]);
    }
    authority.split(':').next().unwrap_or(authority)
}

async fn report(events: &mpsc::Sender<ClientCommand>, event: TransportEvent) -> bool {
    events.send(ClientCommand::Transport(event)).await.is_ok()
}

/// WebSocket connect followed by STOMP CONNECT/CONNECTED
async fn handshake(url: &str) -> Result<WsStream, AppError> {
    let (mut ws, _response) = tokio_tungstenite::connect_async(url).await?;
    debug!("WebSocket open to {}", url);

    let connect = Frame::connect(host_of(url));
    ws.send(Message::Text(connect.encode().into())).await?;

    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => {
                for frame in Frame::decode_all(&text)? {
                    match frame.command.as_str() {
                        "CONNECTED" => {
                            debug!("STOMP session established: {:?}", frame.header("version"));
                            return Ok(ws);
                        }
                        "ERROR" => {
                            let reason = frame.header("message").unwrap_or(frame.body.as_str());
                            return Err(AppError::Broker(reason.to_string()));
                        }
                        other => debug!("Ignoring {} frame during handshake", other),
                    }
                }
            }
            Message::Close(_) => return Err(AppError::HandshakeClosed),
            _ => {}
        }
    }

    Err(AppError::HandshakeClosed)
}

async fn run_session(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    events: mpsc::Sender<ClientCommand>,
) {
    let ws = match tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&url)).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!("Connect to {} failed: {}", url, e);
            report(&events, TransportEvent::ConnectFailed(e.to_string())).await;
            return;
        }
        Err(_) => {
            warn!("Connect to {} timed out", url);
            report(&events, TransportEvent::ConnectFailed("handshake timed out".to_string())).await;
            return;
        }
    };

    info!("Connected to {}", url);
    if !report(&events, TransportEvent::Connected).await {
        return;
    }

    let (mut ws_sender, mut ws_receiver) = ws.split();
    let read_events = events.clone();

    // Read half: broker -> client. Yields the reason the session ended.
    let read_half = async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    let frames = match Frame::decode_all(&text) {
                        Ok(frames) => frames,
                        Err(e) => {
                            warn!("Dropping undecodable frame: {}", e);
                            continue;
                        }
                    };
                    for frame in frames {
                        match frame.command.as_str() {
                            "MESSAGE" => {
                                let Some(destination) = frame.header("destination") else {
                                    warn!("MESSAGE frame without destination");
                                    continue;
                                };
                                let event = TransportEvent::MessageReceived {
                                    destination: destination.to_string(),
                                    payload: frame.body.clone(),
                                };
                                if !report(&read_events, event).await {
                                    return "client closed".to_string();
                                }
                            }
                            "ERROR" => {
                                let reason = frame.header("message").unwrap_or(frame.body.as_str());
                                return format!("broker error: {}", reason);
                            }
                            other => debug!("Ignoring {} frame", other),
                        }
                    }
                }
                Ok(Message::Close(_)) => return "closed by broker".to_string(),
                Ok(_) => {
                    // Ping/pong handled by tungstenite; binary unused
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    return e.to_string();
                }
            }
        }
        "connection closed".to_string()
    };

    // Write half: client -> broker. Ends quietly when the client disconnects.
    let write_half = async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(frame.encode().into())).await {
                return Some(e.to_string());
            }
        }
        let _ = ws_sender.close().await;
        None
    };

    tokio::select! {
        reason = read_half => {
            info!("Session ended: {}", reason);
            report(&events, TransportEvent::Disconnected(reason)).await;
        }
        failure = write_half => match failure {
            Some(reason) => {
                info!("Session ended: {}", reason);
                report(&events, TransportEvent::Disconnected(reason)).await;
            }
            None => debug!("Session closed locally"),
        },
    }
}
