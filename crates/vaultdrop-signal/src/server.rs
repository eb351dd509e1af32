//! HTTP and WebSocket front end for the signaling relay.

use crate::error::{Result, SignalError};
use crate::peer::run_peer;
use crate::registry::Registry;
use crate::relay::SignalRelay;
use crate::sweeper::spawn_sweeper;
use crate::{DEFAULT_OUTBOUND_CAPACITY, DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt, future};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Server name reported by the health endpoint.
pub const SERVER_NAME: &str = "vaultdrop-signal";

/// Signaling server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// Per-peer outbound queue capacity
    pub outbound_queue_capacity: usize,
    /// Session lifetime before the sweeper evicts it
    pub session_ttl: Duration,
    /// Sweeper tick interval
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            outbound_queue_capacity: DEFAULT_OUTBOUND_CAPACITY,
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Check the configuration for values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.outbound_queue_capacity == 0 {
            return Err(SignalError::Config(
                "outbound_queue_capacity must be at least 1".into(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(SignalError::Config("session ttl must be non-zero".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(SignalError::Config("sweep interval must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    relay: Arc<SignalRelay>,
    capacity: usize,
}

/// The signaling server.
pub struct SignalServer {
    config: ServerConfig,
    relay: Arc<SignalRelay>,
}

impl SignalServer {
    /// Create a server with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Config`] if `config` is invalid.
    pub fn new(config: ServerConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(Registry::new()))
    }

    /// Create a server over an existing registry.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Config`] if `config` is invalid.
    pub fn with_registry(config: ServerConfig, registry: Arc<Registry>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            relay: Arc::new(SignalRelay::new(registry)),
        })
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared session registry
    pub fn registry(&self) -> &Arc<Registry> {
        self.relay.registry()
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        let state = AppState {
            relay: self.relay.clone(),
            capacity: self.config.outbound_queue_capacity,
        };

        Router::new()
            .route("/api/session", post(create_session))
            .route("/api/health", get(health))
            .route("/ws", get(websocket_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(state)
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// The expiry sweeper runs for the lifetime of the call.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Io`] if the listener fails.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = spawn_sweeper(
            self.registry().clone(),
            self.config.sweep_interval,
            self.config.session_ttl,
        );

        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Signaling server listening on {addr}");
        }

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        tracing::info!("Signaling server stopped");
        result.map_err(SignalError::from)
    }

    /// Bind the configured address and serve until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Io`] if binding or serving fails.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            tracing::info!("Shutdown requested");
        })
        .await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server: &'static str,
    version: &'static str,
    sessions: usize,
}

async fn create_session(State(state): State<AppState>) -> Result<Json<CreateSessionResponse>> {
    let token = state.relay.registry().create_session()?;
    Ok(Json(CreateSessionResponse {
        session_id: token.to_string(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        server: SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.relay.registry().session_count(),
    })
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();

    // Only text frames carry signaling; pings are answered by axum and a
    // close frame ends the stream.
    let inbound = stream
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });
    let outbound = sink.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text))));

    if let Err(e) = run_peer(state.relay, state.capacity, inbound, outbound).await {
        tracing::error!("peer connection failed: {e}");
    }
}

impl IntoResponse for SignalError {
    fn into_response(self) -> Response {
        let status = match self {
            SignalError::SessionNotFound | SignalError::PeerNotFound => StatusCode::NOT_FOUND,
            SignalError::ExpiredSession => StatusCode::GONE,
            SignalError::DuplicateRole | SignalError::RoleMismatch => StatusCode::CONFLICT,
            SignalError::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            SignalError::ChannelSaturated => StatusCode::SERVICE_UNAVAILABLE,
            SignalError::Random(_) | SignalError::Config(_) | SignalError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (status, Json(body)).into_response()
    }
}
