//! Glitch parameter injection.
//!
//! The single mutation point for "the vehicle's reported position now
//! differs from its true position by vector V". Strategy code never
//! writes spoofing parameters directly; routing everything through this
//! component is what makes "glitch is always zero after stop" enforceable
//! in one place.

use tracing::debug;

use crate::error::VehicleError;
use crate::vehicle::{
    SharedVehicle, EKF_FAILSAFE_PARAM, GLITCH_EAST_PARAM, GLITCH_NORTH_PARAM, GPS_SOURCE_INTERNAL,
    GPS_SOURCE_PARAM,
};

/// Writes spoofing parameters to one vehicle.
pub struct GlitchInjector {
    vehicle: SharedVehicle,
}

impl GlitchInjector {
    /// Creates an injector bound to the given vehicle.
    #[must_use]
    pub fn new(vehicle: SharedVehicle) -> Self {
        Self { vehicle }
    }

    /// Overwrites the glitch vector (idempotent).
    ///
    /// # Errors
    ///
    /// Propagates the first failed parameter write.
    pub async fn set_glitch(&self, north: f64, east: f64) -> Result<(), VehicleError> {
        debug!(north, east, "writing glitch vector");
        self.vehicle.set_param(GLITCH_NORTH_PARAM, north).await?;
        self.vehicle.set_param(GLITCH_EAST_PARAM, east).await
    }

    /// Zeroes the glitch vector; equivalent to `set_glitch(0.0, 0.0)`.
    ///
    /// # Errors
    ///
    /// Propagates the first failed parameter write.
    pub async fn clear_glitch(&self) -> Result<(), VehicleError> {
        self.set_glitch(0.0, 0.0).await
    }

    /// Raises the EKF failsafe threshold so a discontinuous position jump
    /// is not rejected as a sensor fault.
    ///
    /// # Errors
    ///
    /// Propagates a failed parameter write.
    pub async fn relax_ekf_failsafe(&self, threshold: f64) -> Result<(), VehicleError> {
        debug!(threshold, "relaxing EKF failsafe threshold");
        self.vehicle.set_param(EKF_FAILSAFE_PARAM, threshold).await
    }

    /// Forces the simulated-GPS source to the internal/default channel.
    ///
    /// # Errors
    ///
    /// Propagates a failed parameter write.
    pub async fn select_internal_gps(&self) -> Result<(), VehicleError> {
        self.vehicle
            .set_param(GPS_SOURCE_PARAM, GPS_SOURCE_INTERNAL)
            .await
    }
}
