//! Attack session lifecycle.
//!
//! The [`AttackController`] owns the single attack session per process:
//! it validates preconditions, launches the chosen strategy as a
//! cancellable background task, exposes copy-on-read metrics, and
//! guarantees the glitch parameters are zero after `stop`, on every
//! exit path, including the defensive no-session case.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AttackConfig;
use crate::error::AttackError;
use crate::vehicle::SharedVehicle;

use super::injector::GlitchInjector;
use super::strategy::{self, StrategyContext};
use super::{AttackMetrics, AttackPhase, AttackRequest, Strategy};

struct RunningSession {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    vehicle: SharedVehicle,
}

/// Owns the attack lifecycle: start, stop, and the telemetry-facing
/// session snapshot.
pub struct AttackController {
    config: AttackConfig,
    metrics: Arc<Mutex<AttackMetrics>>,
    session: tokio::sync::Mutex<Option<RunningSession>>,
}

impl AttackController {
    /// Creates a controller with the given timing configuration.
    #[must_use]
    pub fn new(config: AttackConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(Mutex::new(AttackMetrics::default())),
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// Copy of the current session metrics.
    ///
    /// Taken behind a short-lived lock; readers never block on the
    /// attack loop.
    #[must_use]
    pub fn snapshot(&self) -> AttackMetrics {
        self.metrics.lock().expect("metrics mutex poisoned").clone()
    }

    /// Starts an attack session on the given vehicle.
    ///
    /// Returns immediately after launching the strategy task; it does not
    /// wait for the strategy to reach the hijacking phase. Strategy
    /// failures after launch (e.g. no active waypoint) surface through
    /// the snapshot's `fault` field.
    ///
    /// # Errors
    ///
    /// - [`AttackError::AlreadyRunning`] when a session is active; the
    ///   existing session is left untouched.
    /// - [`AttackError::InvalidDriftSteps`] when Strategy A is requested
    ///   with a step count that is not a positive integer. Rejected
    ///   before any side effect.
    pub async fn start(
        &self,
        vehicle: SharedVehicle,
        request: AttackRequest,
    ) -> Result<(), AttackError> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            if !session.handle.is_finished() {
                return Err(AttackError::AlreadyRunning);
            }
        }

        let steps = validate_drift_steps(&request)?;

        {
            let mut metrics = self.metrics.lock().expect("metrics mutex poisoned");
            *metrics = AttackMetrics {
                active: true,
                strategy: Some(request.strategy),
                phase: AttackPhase::Init,
                ..AttackMetrics::default()
            };
        }

        let cancel = CancellationToken::new();
        let ctx = StrategyContext {
            vehicle: Arc::clone(&vehicle),
            injector: GlitchInjector::new(Arc::clone(&vehicle)),
            metrics: Arc::clone(&self.metrics),
            cancel: cancel.clone(),
            config: self.config.clone(),
        };

        let strategy = request.strategy;
        let handle = tokio::spawn(async move {
            let result = match strategy {
                Strategy::PositionDrift => {
                    strategy::run_position_drift(&ctx, request.n_offset, request.e_offset, steps)
                        .await
                }
                Strategy::WaypointHijack => {
                    strategy::run_waypoint_hijack(
                        &ctx,
                        request.n_offset,
                        request.e_offset,
                        request.param,
                    )
                    .await
                }
            };

            let mut metrics = ctx.metrics.lock().expect("metrics mutex poisoned");
            metrics.active = false;
            metrics.phase = AttackPhase::Idle;
            if let Err(e) = result {
                warn!(%strategy, "attack task failed: {e}");
                metrics.fault = Some(e.to_string());
            }
        });

        info!(%strategy, n_offset = request.n_offset, e_offset = request.e_offset,
              param = request.param, "attack session started");
        *slot = Some(RunningSession {
            cancel,
            handle,
            vehicle,
        });
        Ok(())
    }

    /// Stops the active session, if any.
    ///
    /// Signals cancellation, joins the task bounded by the configured
    /// stop timeout, then zeroes the glitch parameters, also when no
    /// session was running, as a defensive measure against parameters
    /// left over from a previous process. Idempotent.
    ///
    /// `fallback_vehicle` is used for the defensive clear when no session
    /// holds a vehicle handle.
    ///
    /// # Errors
    ///
    /// Returns [`AttackError::StopTimedOut`] when the task does not
    /// observe cancellation within the bound (a hung vehicle call). The
    /// glitch parameters are still cleared and the session marked idle.
    pub async fn stop(
        &self,
        fallback_vehicle: Option<SharedVehicle>,
    ) -> Result<(), AttackError> {
        let mut slot = self.session.lock().await;
        let session = slot.take();
        let cleanup_vehicle = session
            .as_ref()
            .map(|s| Arc::clone(&s.vehicle))
            .or(fallback_vehicle);

        let mut timed_out = false;
        if let Some(session) = session {
            session.cancel.cancel();
            match tokio::time::timeout(self.config.stop_timeout(), session.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("attack task join failed: {e}"),
                Err(_) => {
                    warn!(
                        timeout_ms = self.config.stop_timeout_ms,
                        "attack task did not observe cancellation in time"
                    );
                    timed_out = true;
                }
            }
        }

        if let Some(vehicle) = cleanup_vehicle {
            let injector = GlitchInjector::new(vehicle);
            if let Err(e) = injector.clear_glitch().await {
                warn!("defensive glitch clear failed: {e}");
            }
        }

        {
            let mut metrics = self.metrics.lock().expect("metrics mutex poisoned");
            metrics.active = false;
            metrics.phase = AttackPhase::Idle;
        }
        info!("attack session stopped");

        if timed_out {
            return Err(AttackError::StopTimedOut {
                timeout_ms: self.config.stop_timeout_ms,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for AttackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let metrics = self.snapshot();
        f.debug_struct("AttackController")
            .field("active", &metrics.active)
            .field("phase", &metrics.phase)
            .finish_non_exhaustive()
    }
}

/// Validates the Strategy A step count before any side effect.
///
/// The per-step increment divides by this value, so zero (and anything
/// else that is not a positive integer fitting the loop counter) is
/// rejected up front.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn validate_drift_steps(request: &AttackRequest) -> Result<u32, AttackError> {
    if request.strategy != Strategy::PositionDrift {
        return Ok(0);
    }
    let param = request.param;
    if !param.is_finite()
        || param < 1.0
        || param.fract() != 0.0
        || param > f64::from(u32::MAX)
    {
        return Err(AttackError::InvalidDriftSteps { param });
    }
    Ok(param as u32)
}
