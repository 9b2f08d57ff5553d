use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};
use waypoint_core::{OutboundMessage, TelemetryFactory};
use waypoint_engine::{
    ContentGenerator, ImageEnricher, Pipeline, PositionResolver, RefreshController, RefreshTiming,
    SessionState,
};
use waypoint_services::{
    connect_with_retry, ChatCompletionProvider, CommonsImageSearch, LocationIqGeocoder,
    ReconnectPolicy, SimBridgeFactory,
};
use waypoint_settings::{ServerSettings, WaypointSettings};

use crate::connection;
use crate::registry::SessionRegistry;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_send_queue: usize,
    pub heartbeat_interval: Duration,
}

impl ServerConfig {
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_send_queue: settings.max_send_queue.max(1),
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs.max(1)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(&ServerSettings::default())
    }
}

/// Everything a session needs to run its refresh loop.
pub struct Services {
    pub telemetry: Arc<dyn TelemetryFactory>,
    pub pipeline: Arc<Pipeline>,
    pub timing: RefreshTiming,
    pub reconnect: ReconnectPolicy,
}

impl Services {
    /// Wire the HTTP clients described by `settings`.
    pub fn from_settings(settings: &WaypointSettings) -> Self {
        let pipeline = Pipeline::new(
            PositionResolver::new(
                Arc::new(LocationIqGeocoder::from_settings(&settings.geocoder)),
                settings.refresh.resolve_retry(),
            ),
            ContentGenerator::new(Arc::new(ChatCompletionProvider::from_settings(
                &settings.completion,
            ))),
            ImageEnricher::new(
                Arc::new(CommonsImageSearch::from_settings(&settings.images)),
                settings.images.limit,
            ),
        );
        Self {
            telemetry: Arc::new(SimBridgeFactory::new(settings.bridge.clone())),
            pipeline: Arc::new(pipeline),
            timing: RefreshTiming::from_settings(&settings.refresh),
            reconnect: ReconnectPolicy::from_settings(&settings.bridge),
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<ServerConfig>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listener and start serving. Returns a handle to shut it down.
pub async fn start(config: ServerConfig, services: Services) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(SessionRegistry::new());
    let app_state = AppState {
        services: Arc::new(services),
        registry: Arc::clone(&registry),
        config: Arc::new(config.clone()),
    };

    let router = build_router(app_state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    info!(addr = %local_addr, "waypoint server started");

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            warn!(error = %e, "server exited with error");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        registry,
        shutdown,
        server,
    })
}

/// Handle returned by `start()`; keeps the server task alive.
pub struct ServerHandle {
    pub port: u16,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn session_count(&self) -> usize {
        self.registry.count()
    }

    /// Close every session and wait for the listener to stop.
    pub async fn shutdown(self) {
        let closed = self.registry.close_all();
        self.shutdown.cancel();
        if let Err(e) = self.server.await {
            warn!(error = %e, "server task failed");
        }
        info!(closed_sessions = closed, "waypoint server stopped");
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One viewer connection, from upgrade to teardown.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session = state.registry.open();
    let span = tracing::info_span!("session", session_id = %session.id());

    async move {
        info!("viewer connected");
        let (tx, rx) = mpsc::channel(state.config.max_send_queue);
        let refresh = tokio::spawn(
            run_session(Arc::clone(&state.services), Arc::clone(&session), tx)
                .in_current_span(),
        );

        connection::serve_viewer(socket, Arc::clone(&session), rx, state.config.heartbeat_interval)
            .await;

        state.registry.close(session.id());
        if let Err(e) = refresh.await {
            warn!(error = %e, "refresh task failed");
        }
        info!("viewer disconnected");
    }
    .instrument(span)
    .await
}

/// Connect the session's own telemetry handle, then run its refresh loop.
async fn run_session(
    services: Arc<Services>,
    session: Arc<SessionState>,
    outbound: mpsc::Sender<OutboundMessage>,
) {
    let telemetry = services.telemetry.create();
    tokio::select! {
        biased;
        _ = session.cancelled() => return,
        connected = connect_with_retry(telemetry.as_ref(), &services.reconnect) => {
            if let Err(e) = connected {
                warn!(error = %e, "simulator bridge unreachable, closing session");
                session.close();
                return;
            }
        }
    }
    info!("simulator bridge connected");

    RefreshController::new(
        Arc::clone(&services.pipeline),
        telemetry,
        session,
        outbound,
        services.timing,
    )
    .run()
    .await;
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "sessions": state.registry.count(),
        "details": state.registry.summaries(),
    }))
}
