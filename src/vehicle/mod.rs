//! Vehicle capability surface.
//!
//! The attack engine consumes vehicles through the [`Vehicle`] trait: a
//! small capability contract covering telemetry reads, mode control,
//! parameter access, mission waypoint lookup, and raw positioning-record
//! injection. Connections are produced by a [`VehicleConnector`], owned
//! by the process entry point and handed to the control surface; the
//! engine never holds a global connection.

pub mod sim;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::VehicleError;
use crate::fix::FixFrame;

pub use sim::{SimConnector, SimVehicle};

// ============================================================================
// Simulator Parameter Keys
// ============================================================================

/// Simulated-GPS glitch offset, north/latitude axis (degrees).
pub const GLITCH_NORTH_PARAM: &str = "SIM_GPS1_GLTCH_X";

/// Simulated-GPS glitch offset, east/longitude axis (degrees).
pub const GLITCH_EAST_PARAM: &str = "SIM_GPS1_GLTCH_Y";

/// EKF failsafe sensitivity threshold. Raised during a hijack so the
/// discontinuous position jump is not rejected as a fault.
pub const EKF_FAILSAFE_PARAM: &str = "FS_EKF_THRESH";

/// Simulated-GPS source selector; `1` is the internal/default channel.
pub const GPS_SOURCE_PARAM: &str = "GPS1_TYPE";

/// Value of [`GPS_SOURCE_PARAM`] selecting the internal simulator channel.
pub const GPS_SOURCE_INTERNAL: f64 = 1.0;

// ============================================================================
// Shared Types
// ============================================================================

/// A position in the global frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalPosition {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in meters.
    pub alt: f64,
}

/// Flight mode of the vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightMode {
    /// Operator-guided mode used for arming and takeoff.
    Guided,
    /// Holds a fixed position, counteracting perceived drift.
    PositionHold,
    /// Autonomous waypoint-following mode.
    Auto,
    /// Any mode this tool does not exploit.
    Other(String),
}

impl FlightMode {
    /// Canonical mode name as reported over telemetry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Guided => "GUIDED",
            Self::PositionHold => "POSHOLD",
            Self::Auto => "AUTO",
            Self::Other(name) => name.as_str(),
        }
    }
}

impl std::fmt::Display for FlightMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse GPS solution quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpsInfo {
    /// Fix type (0 = no fix, 2 = 2D, 3 = 3D).
    pub fix_type: u8,
    /// Number of visible satellites.
    pub satellites_visible: u8,
}

/// One mission waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// Sequence number within the mission.
    pub seq: u16,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in meters.
    pub alt: f64,
}

/// Shared handle to a connected vehicle.
pub type SharedVehicle = Arc<dyn Vehicle>;

// ============================================================================
// Capability Traits
// ============================================================================

/// Capability contract a connected vehicle must provide.
///
/// Every operation returns an explicit `Result`; attribute-style access
/// that can silently fail has no place at this seam.
#[async_trait]
pub trait Vehicle: Send + Sync {
    /// Whether the motors are armed.
    async fn armed(&self) -> Result<bool, VehicleError>;

    /// Whether the vehicle is healthy enough to arm.
    async fn is_armable(&self) -> Result<bool, VehicleError>;

    /// Arms the motors.
    async fn arm(&self) -> Result<(), VehicleError>;

    /// Current flight mode.
    async fn mode(&self) -> Result<FlightMode, VehicleError>;

    /// Requests a flight mode change.
    async fn set_mode(&self, mode: FlightMode) -> Result<(), VehicleError>;

    /// Position in the global frame.
    async fn global_position(&self) -> Result<GlobalPosition, VehicleError>;

    /// Altitude above the home position in meters.
    async fn relative_altitude(&self) -> Result<f64, VehicleError>;

    /// GPS solution quality.
    async fn gps_info(&self) -> Result<GpsInfo, VehicleError>;

    /// Commands a takeoff to the given relative altitude.
    async fn takeoff(&self, target_alt: f64) -> Result<(), VehicleError>;

    /// Reads a named parameter.
    async fn param(&self, key: &str) -> Result<f64, VehicleError>;

    /// Writes a named parameter.
    async fn set_param(&self, key: &str, value: f64) -> Result<(), VehicleError>;

    /// Downloads the mission and returns the currently targeted waypoint,
    /// or `None` when no mission is active.
    async fn current_waypoint(&self) -> Result<Option<Waypoint>, VehicleError>;

    /// Injects a raw positioning record.
    ///
    /// Links that require the extended layout reject base frames with
    /// [`VehicleError::UnsupportedFixLayout`].
    async fn send_fix(&self, frame: &FixFrame) -> Result<(), VehicleError>;
}

/// Produces vehicle connections from an operator-supplied address.
#[async_trait]
pub trait VehicleConnector: Send + Sync {
    /// Connects to the vehicle at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`VehicleError::ConnectionFailed`] with a message suitable
    /// for surfacing to the operator.
    async fn connect(&self, address: &str) -> Result<SharedVehicle, VehicleError>;
}

// ============================================================================
// Takeoff Sequence
// ============================================================================

/// Runs the arm/takeoff/mode-switch sequence that stages a position-hold
/// drift scenario: guided mode, arm, wait for motors, take off, wait for
/// 95% of the target altitude, then switch to position-hold.
///
/// Intended to run as a background task; the HTTP handler acknowledges
/// before this completes.
///
/// # Errors
///
/// Returns the first vehicle command failure, or [`VehicleError::Timeout`]
/// when arming or the climb do not complete within `timeout`.
pub async fn takeoff_sequence(
    vehicle: SharedVehicle,
    target_alt: f64,
    timeout: Duration,
) -> Result<(), VehicleError> {
    vehicle.set_mode(FlightMode::Guided).await?;
    vehicle.arm().await?;

    let armed_wait = async {
        while !vehicle.armed().await? {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok::<(), VehicleError>(())
    };
    tokio::time::timeout(timeout, armed_wait)
        .await
        .map_err(|_| VehicleError::Timeout("waiting for motors to arm".to_string()))??;

    info!(target_alt, "motors armed, taking off");
    vehicle.takeoff(target_alt).await?;

    let climb_wait = async {
        loop {
            if vehicle.relative_altitude().await? >= target_alt * 0.95 {
                return Ok::<(), VehicleError>(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    };
    if let Err(e) = tokio::time::timeout(timeout, climb_wait).await {
        warn!("climb did not reach target altitude in time: {e}");
        return Err(VehicleError::Timeout(
            "waiting for target altitude".to_string(),
        ));
    }

    info!("altitude reached, switching to position hold");
    vehicle.set_mode(FlightMode::PositionHold).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_mode_names() {
        assert_eq!(FlightMode::Guided.name(), "GUIDED");
        assert_eq!(FlightMode::PositionHold.name(), "POSHOLD");
        assert_eq!(FlightMode::Auto.name(), "AUTO");
        assert_eq!(FlightMode::Other("LOITER".to_string()).name(), "LOITER");
    }

    #[test]
    fn flight_mode_display_matches_name() {
        assert_eq!(FlightMode::Auto.to_string(), "AUTO");
    }

    #[tokio::test]
    async fn takeoff_sequence_reaches_position_hold() {
        let vehicle: SharedVehicle = Arc::new(SimVehicle::new());
        takeoff_sequence(Arc::clone(&vehicle), 15.0, Duration::from_secs(5))
            .await
            .expect("takeoff sequence");
        assert!(vehicle.armed().await.unwrap());
        assert_eq!(vehicle.mode().await.unwrap(), FlightMode::PositionHold);
        assert!(vehicle.relative_altitude().await.unwrap() >= 14.0);
    }

    #[tokio::test]
    async fn takeoff_sequence_propagates_arm_failure() {
        let sim = SimVehicle::new();
        sim.set_armable(false);
        let vehicle: SharedVehicle = Arc::new(sim);
        let err = takeoff_sequence(vehicle, 15.0, Duration::from_secs(1))
            .await
            .expect_err("arming should fail");
        assert!(matches!(err, VehicleError::CommandFailed(_)));
    }
}
