//! HTTP control surface.
//!
//! JSON over axum: `POST /connect`, `POST /takeoff`, `GET /status`,
//! `POST /start`, `POST /stop`. Handlers run on their own request
//! contexts and never block on the attack loop; every failure maps to a
//! structured `{status, message}` result rather than escaping this
//! boundary.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::attack::{AttackController, AttackRequest};
use crate::config::Config;
use crate::error::{AttackError, Result};
use crate::telemetry::TelemetrySnapshot;
use crate::vehicle::{takeoff_sequence, SharedVehicle, VehicleConnector};

// ============================================================================
// Shared State
// ============================================================================

/// State shared across request handlers.
pub struct AppState {
    config: Config,
    connector: Arc<dyn VehicleConnector>,
    // std::sync::RwLock is intentional: held briefly for a clone, never
    // across an await point.
    vehicle: std::sync::RwLock<Option<SharedVehicle>>,
    controller: AttackController,
}

impl AppState {
    /// Creates the shared state around a connector.
    #[must_use]
    pub fn new(config: Config, connector: Arc<dyn VehicleConnector>) -> Self {
        let controller = AttackController::new(config.attack.clone());
        Self {
            config,
            connector,
            vehicle: std::sync::RwLock::new(None),
            controller,
        }
    }

    fn current_vehicle(&self) -> Option<SharedVehicle> {
        self.vehicle
            .read()
            .expect("vehicle lock poisoned")
            .clone()
    }

    /// The attack controller, for tests driving the engine directly.
    #[must_use]
    pub const fn controller(&self) -> &AttackController {
        &self.controller
    }
}

// ============================================================================
// Request/Response Bodies
// ============================================================================

fn default_connect_addr() -> String {
    "127.0.0.1:14550".to_string()
}

/// Body of `POST /connect`.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Vehicle address, `host:port`.
    #[serde(default = "default_connect_addr")]
    pub ip: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum ResponseStatus {
    Success,
    Error,
}

/// Uniform `{status, message}` command acknowledgement.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    status: ResponseStatus,
    message: String,
}

impl CommandResponse {
    fn success(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: ResponseStatus::Success,
            message: message.into(),
        })
    }

    fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: ResponseStatus::Error,
            message: message.into(),
        })
    }
}

// ============================================================================
// Router & Server
// ============================================================================

/// Builds the control-surface router over the shared state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/connect", post(connect))
        .route("/takeoff", post(takeoff))
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .with_state(state)
}

/// Binds and serves the control surface until the token is cancelled.
///
/// # Errors
///
/// Returns an I/O error when the listener cannot bind.
pub async fn serve(
    config: Config,
    connector: Arc<dyn VehicleConnector>,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    let bound_addr = listener.local_addr()?;
    info!(%bound_addr, "control surface listening");

    let state = Arc::new(AppState::new(config, connector));
    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    debug!("control surface shut down");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn connect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectRequest>,
) -> Json<CommandResponse> {
    match state.connector.connect(&req.ip).await {
        Ok(vehicle) => {
            *state.vehicle.write().expect("vehicle lock poisoned") = Some(vehicle);
            info!(address = %req.ip, "vehicle connected");
            CommandResponse::success(format!("connected to {}", req.ip))
        }
        Err(e) => {
            error!(address = %req.ip, "connection failed: {e}");
            CommandResponse::error(e.to_string())
        }
    }
}

async fn takeoff(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    let Some(vehicle) = state.current_vehicle() else {
        return CommandResponse::error(AttackError::NotConnected.to_string());
    };
    match vehicle.is_armable().await {
        Ok(true) => {}
        Ok(false) => {
            return CommandResponse::error("vehicle not ready to arm (check GPS/health)");
        }
        Err(e) => return CommandResponse::error(e.to_string()),
    }

    let altitude = state.config.takeoff_altitude_m;
    let timeout = std::time::Duration::from_millis(state.config.takeoff_timeout_ms);
    tokio::spawn(async move {
        if let Err(e) = takeoff_sequence(vehicle, altitude, timeout).await {
            error!("takeoff sequence failed: {e}");
        }
    });
    CommandResponse::success("takeoff sequence initiated, waiting for position hold")
}

async fn status(State(state): State<Arc<AppState>>) -> Json<TelemetrySnapshot> {
    match state.current_vehicle() {
        Some(vehicle) => {
            let snapshot =
                TelemetrySnapshot::collect(vehicle.as_ref(), state.controller.snapshot()).await;
            Json(snapshot)
        }
        None => Json(TelemetrySnapshot::disconnected()),
    }
}

async fn start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AttackRequest>,
) -> Json<CommandResponse> {
    let Some(vehicle) = state.current_vehicle() else {
        return CommandResponse::error(AttackError::NotConnected.to_string());
    };
    match state.controller.start(vehicle, req).await {
        Ok(()) => CommandResponse::success(format!("attack {} started", req.strategy)),
        Err(e) => CommandResponse::error(e.to_string()),
    }
}

async fn stop(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    match state.controller.stop(state.current_vehicle()).await {
        Ok(()) => CommandResponse::success("attack stopped"),
        // The glitch is cleared and the session marked idle even on a
        // join timeout; the operator still needs to know about it.
        Err(e) => CommandResponse::error(e.to_string()),
    }
}
