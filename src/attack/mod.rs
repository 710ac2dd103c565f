//! Attack engine: session state, glitch injection, and the two
//! spoofing strategies.

pub mod controller;
pub mod injector;
pub mod strategy;

use serde::{Deserialize, Serialize};

pub use controller::AttackController;
pub use injector::GlitchInjector;

/// Which adversarial strategy a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Strategy A: incrementally walk the perceived position away from
    /// truth so the position-hold controller flies toward the real target.
    #[serde(rename = "A", alias = "a")]
    PositionDrift,
    /// Strategy B: one-shot static deception re-mapping which real-world
    /// point the active waypoint resolves to.
    #[serde(rename = "B", alias = "b")]
    WaypointHijack,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PositionDrift => f.write_str("A"),
            Self::WaypointHijack => f.write_str("B"),
        }
    }
}

/// Lifecycle phase of an attack session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackPhase {
    /// No session running.
    #[default]
    Idle,
    /// Session accepted, task starting.
    Init,
    /// GPS-loss fix injected, spoofing parameters being staged.
    Jamming,
    /// Spoof vector being computed.
    Calculating,
    /// Glitch injected, monitor loop running.
    Hijacking,
}

/// Operator request starting an attack session.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AttackRequest {
    /// Strategy selector.
    pub strategy: Strategy,
    /// North offset: meters for Strategy A, absolute target latitude
    /// for Strategy B.
    #[serde(default)]
    pub n_offset: f64,
    /// East offset: meters for Strategy A, absolute target longitude
    /// for Strategy B.
    #[serde(default)]
    pub e_offset: f64,
    /// Drift step count for Strategy A, gain factor `k` for Strategy B.
    #[serde(default)]
    pub param: f64,
}

/// Live metrics of the current (or last) attack session.
///
/// Snapshots are taken by copy; readers never observe a partially
/// updated session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttackMetrics {
    /// Whether a session is currently running.
    pub active: bool,
    /// Strategy of the current/last session.
    pub strategy: Option<Strategy>,
    /// Lifecycle phase.
    pub phase: AttackPhase,
    /// True ground distance moved since the attack began, meters.
    pub distance_moved_m: f64,
    /// Magnitude of the injected glitch, meters.
    pub spoofed_distance_m: f64,
    /// Strategy failure surfaced to the operator (e.g. no active
    /// waypoint), cleared on the next `start`.
    pub fault: Option<String>,
    /// Whether the hijack delivered the vehicle within the success
    /// radius of the target; set when Strategy B is stopped.
    pub deception_success: Option<bool>,
}
