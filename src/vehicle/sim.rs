//! In-memory simulated vehicle.
//!
//! [`SimVehicle`] implements the full [`Vehicle`] capability surface with
//! the parameter and mission semantics of an ArduPilot SITL target. It is
//! both the shipped connector backend (a real MAVLink transport is out of
//! scope) and the test double for the attack engine. State lives behind a
//! `std::sync::Mutex`: every access is brief and synchronous, never held
//! across an await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::VehicleError;
use crate::fix::FixFrame;

use super::{
    FlightMode, GlobalPosition, GpsInfo, SharedVehicle, Vehicle, VehicleConnector, Waypoint,
    EKF_FAILSAFE_PARAM, GLITCH_EAST_PARAM, GLITCH_NORTH_PARAM, GPS_SOURCE_PARAM,
};

/// Default home position (the ArduPilot SITL default).
const DEFAULT_HOME: GlobalPosition = GlobalPosition {
    lat: -35.363_262,
    lon: 149.165_237,
    alt: 584.0,
};

struct SimState {
    armed: bool,
    armable: bool,
    mode: FlightMode,
    position: GlobalPosition,
    relative_alt: f64,
    gps: GpsInfo,
    params: HashMap<String, f64>,
    mission: Vec<Waypoint>,
    /// 1-based index of the targeted waypoint; 0 means no active mission.
    next_waypoint: usize,
    accepts_base_layout: bool,
    sent_frames: Vec<FixFrame>,
    param_writes: Vec<(String, f64)>,
}

impl Default for SimState {
    fn default() -> Self {
        let mut params = HashMap::new();
        params.insert(GLITCH_NORTH_PARAM.to_string(), 0.0);
        params.insert(GLITCH_EAST_PARAM.to_string(), 0.0);
        params.insert(EKF_FAILSAFE_PARAM.to_string(), 0.8);
        params.insert(GPS_SOURCE_PARAM.to_string(), 1.0);

        Self {
            armed: false,
            armable: true,
            mode: FlightMode::Other("STABILIZE".to_string()),
            position: DEFAULT_HOME,
            relative_alt: 0.0,
            gps: GpsInfo {
                fix_type: 3,
                satellites_visible: 10,
            },
            params,
            mission: Vec::new(),
            next_waypoint: 0,
            accepts_base_layout: true,
            sent_frames: Vec::new(),
            param_writes: Vec::new(),
        }
    }
}

/// Simulated vehicle with inspectable state.
#[derive(Default)]
pub struct SimVehicle {
    state: Mutex<SimState>,
}

impl SimVehicle {
    /// Creates a simulated vehicle at the default home position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // Poisoned mutex means a test thread panicked mid-update; the
        // state is unusable, so propagating the panic is correct.
        self.state.lock().expect("sim state mutex poisoned")
    }

    /// Overrides the true position.
    pub fn set_position(&self, lat: f64, lon: f64, alt: f64) {
        self.lock().position = GlobalPosition { lat, lon, alt };
    }

    /// Marks the vehicle as (not) ready to arm.
    pub fn set_armable(&self, armable: bool) {
        self.lock().armable = armable;
    }

    /// Loads a mission and sets the 1-based targeted waypoint index
    /// (0 = no active mission).
    pub fn set_mission(&self, waypoints: Vec<Waypoint>, next: usize) {
        let mut state = self.lock();
        state.mission = waypoints;
        state.next_waypoint = next;
    }

    /// Configures whether the link accepts the 18-field base fix layout.
    pub fn set_accepts_base_layout(&self, accepts: bool) {
        self.lock().accepts_base_layout = accepts;
    }

    /// Forces a flight mode, as if something other than the attack task
    /// changed it.
    pub fn force_mode(&self, mode: FlightMode) {
        self.lock().mode = mode;
    }

    /// All positioning frames injected so far.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<FixFrame> {
        self.lock().sent_frames.clone()
    }

    /// Current value of a parameter, if known.
    #[must_use]
    pub fn param_now(&self, key: &str) -> Option<f64> {
        self.lock().params.get(key).copied()
    }

    /// All values written to the given parameter key, in order.
    #[must_use]
    pub fn writes_to(&self, key: &str) -> Vec<f64> {
        self.lock()
            .param_writes
            .iter()
            .filter(|(k, _)| k == key)
            .map(|&(_, v)| v)
            .collect()
    }

    /// Current flight mode without going through the async trait.
    #[must_use]
    pub fn mode_now(&self) -> FlightMode {
        self.lock().mode.clone()
    }
}

#[async_trait]
impl Vehicle for SimVehicle {
    async fn armed(&self) -> Result<bool, VehicleError> {
        Ok(self.lock().armed)
    }

    async fn is_armable(&self) -> Result<bool, VehicleError> {
        Ok(self.lock().armable)
    }

    async fn arm(&self) -> Result<(), VehicleError> {
        let mut state = self.lock();
        if !state.armable {
            return Err(VehicleError::CommandFailed(
                "vehicle not ready to arm (check GPS/health)".to_string(),
            ));
        }
        state.armed = true;
        Ok(())
    }

    async fn mode(&self) -> Result<FlightMode, VehicleError> {
        Ok(self.lock().mode.clone())
    }

    async fn set_mode(&self, mode: FlightMode) -> Result<(), VehicleError> {
        debug!(mode = %mode, "sim mode change");
        self.lock().mode = mode;
        Ok(())
    }

    async fn global_position(&self) -> Result<GlobalPosition, VehicleError> {
        Ok(self.lock().position)
    }

    async fn relative_altitude(&self) -> Result<f64, VehicleError> {
        Ok(self.lock().relative_alt)
    }

    async fn gps_info(&self) -> Result<GpsInfo, VehicleError> {
        Ok(self.lock().gps)
    }

    async fn takeoff(&self, target_alt: f64) -> Result<(), VehicleError> {
        let mut state = self.lock();
        if !state.armed {
            return Err(VehicleError::CommandFailed(
                "takeoff requires armed motors".to_string(),
            ));
        }
        // The sim climbs instantly.
        state.relative_alt = target_alt;
        Ok(())
    }

    async fn param(&self, key: &str) -> Result<f64, VehicleError> {
        self.lock()
            .params
            .get(key)
            .copied()
            .ok_or_else(|| VehicleError::ParameterUnknown {
                key: key.to_string(),
            })
    }

    async fn set_param(&self, key: &str, value: f64) -> Result<(), VehicleError> {
        let mut state = self.lock();
        state.params.insert(key.to_string(), value);
        state.param_writes.push((key.to_string(), value));
        Ok(())
    }

    async fn current_waypoint(&self) -> Result<Option<Waypoint>, VehicleError> {
        let state = self.lock();
        if state.next_waypoint == 0 || state.next_waypoint > state.mission.len() {
            return Ok(None);
        }
        Ok(Some(state.mission[state.next_waypoint - 1]))
    }

    async fn send_fix(&self, frame: &FixFrame) -> Result<(), VehicleError> {
        let mut state = self.lock();
        if matches!(frame, FixFrame::Base(_)) && !state.accepts_base_layout {
            return Err(VehicleError::UnsupportedFixLayout {
                fields: frame.field_count(),
            });
        }
        state.sent_frames.push(*frame);
        Ok(())
    }
}

impl std::fmt::Debug for SimVehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimVehicle")
            .field("armed", &state.armed)
            .field("mode", &state.mode)
            .field("position", &state.position)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Connector producing simulated vehicles.
///
/// With no preset vehicle, every `connect` yields a fresh sim at the
/// default home. Tests preset a shared [`SimVehicle`] so they can inspect
/// it after connecting through the HTTP surface.
#[derive(Debug, Default)]
pub struct SimConnector {
    preset: Option<Arc<SimVehicle>>,
}

impl SimConnector {
    /// Connector that creates a fresh sim per connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector that always hands out the given vehicle.
    #[must_use]
    pub fn with_vehicle(vehicle: Arc<SimVehicle>) -> Self {
        Self {
            preset: Some(vehicle),
        }
    }
}

#[async_trait]
impl VehicleConnector for SimConnector {
    async fn connect(&self, address: &str) -> Result<SharedVehicle, VehicleError> {
        if address.trim().is_empty() {
            return Err(VehicleError::ConnectionFailed(
                "empty connection address".to_string(),
            ));
        }
        debug!(address, "sim connector attaching");
        match &self.preset {
            Some(vehicle) => Ok(Arc::clone(vehicle) as SharedVehicle),
            None => Ok(Arc::new(SimVehicle::new())),
        }
    }
}
