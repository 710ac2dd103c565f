//! Telemetry snapshot served by `GET /status`.
//!
//! A read-only projection of the attack session plus live vehicle
//! telemetry. Recomputed on every query, never cached; individual reads
//! are best-effort so a flaky link degrades fields to `null` instead of
//! failing the whole status call.

use serde::Serialize;

use crate::attack::AttackMetrics;
use crate::vehicle::Vehicle;

/// One status response.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    /// Whether a vehicle is connected.
    pub connected: bool,
    /// Whether the motors are armed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub armed: Option<bool>,
    /// Current flight mode name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Relative altitude in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    /// GPS fix type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_fix: Option<u8>,
    /// Visible satellite count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellites: Option<u8>,
    /// Attack session metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_data: Option<AttackMetrics>,
}

impl TelemetrySnapshot {
    /// The snapshot reported when no vehicle is connected.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            armed: None,
            mode: None,
            alt: None,
            gps_fix: None,
            satellites: None,
            attack_data: None,
        }
    }

    /// Collects a fresh snapshot from the vehicle and the session metrics.
    pub async fn collect(vehicle: &dyn Vehicle, attack: AttackMetrics) -> Self {
        let gps = vehicle.gps_info().await.ok();
        Self {
            connected: true,
            armed: vehicle.armed().await.ok(),
            mode: vehicle.mode().await.ok().map(|m| m.name().to_string()),
            alt: vehicle.relative_altitude().await.ok(),
            gps_fix: gps.map(|g| g.fix_type),
            satellites: gps.map(|g| g.satellites_visible),
            attack_data: Some(attack),
        }
    }
}
