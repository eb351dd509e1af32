//! Shared harness for the Vaultdrop integration tests.
//!
//! Starts a real signaling server on a loopback port and drives it with
//! WebSocket clients.

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use vaultdrop_signal::{Registry, ServerConfig, SignalServer};

/// How long a test waits for a single message
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Client WebSocket used by the tests
pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A signaling server serving on an ephemeral port; shut down on drop.
pub struct TestServer {
    addr: SocketAddr,
    registry: std::sync::Arc<Registry>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a server with default settings.
    pub async fn start() -> Self {
        Self::with_config(ServerConfig::default()).await
    }

    /// Start a server with `config`; its listen address is ignored.
    pub async fn with_config(config: ServerConfig) -> Self {
        let server = SignalServer::new(config).unwrap();
        let registry = server.registry().clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Self {
            addr,
            registry,
            shutdown: Some(tx),
        }
    }

    /// Bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The server's session registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Open a WebSocket to the signaling endpoint.
    pub async fn connect(&self) -> Socket {
        let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", self.addr))
            .await
            .unwrap();
        socket
    }

    /// Connect a sender and a receiver and pair them in a new session.
    ///
    /// Consumes both `ready` messages and the sender's `peer-joined`.
    pub async fn pair(&self) -> Pair {
        let mut sender = self.connect().await;
        send(&mut sender, join(None, "sender")).await;
        let ready = recv(&mut sender).await;
        assert_eq!(ready["type"], "ready", "unexpected reply: {ready}");
        let session = ready["sessionId"].as_str().unwrap().to_string();

        let mut receiver = self.connect().await;
        send(&mut receiver, join(Some(&session), "receiver")).await;
        let ready = recv(&mut receiver).await;
        assert_eq!(ready["type"], "ready", "unexpected reply: {ready}");

        let joined = recv(&mut sender).await;
        assert_eq!(joined["type"], "peer-joined");

        Pair {
            sender,
            receiver,
            session,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Two paired peers
pub struct Pair {
    /// Sender-side socket
    pub sender: Socket,
    /// Receiver-side socket
    pub receiver: Socket,
    /// Session token in hex
    pub session: String,
}

/// Build a `join` message.
pub fn join(session: Option<&str>, role: &str) -> Value {
    match session {
        Some(id) => json!({"type": "join", "payload": {"sessionId": id, "role": role}}),
        None => json!({"type": "join", "payload": {"role": role}}),
    }
}

/// Send one JSON message.
pub async fn send(socket: &mut Socket, value: Value) {
    socket.send(Message::Text(value.to_string())).await.unwrap();
}

/// Receive the next JSON message, skipping control frames.
pub async fn recv(socket: &mut Socket) -> Value {
    try_recv(socket)
        .await
        .expect("socket closed while waiting for a message")
}

/// Receive the next JSON message, or `None` once the server closes the socket.
pub async fn try_recv(socket: &mut Socket) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for message")?;
        match frame {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Assert nothing arrives within a short window.
pub async fn assert_silent(socket: &mut Socket) {
    let next = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    assert!(next.is_err(), "unexpected message: {next:?}");
}
