//! # Leg Controller
//!
//! Owns everything needed to drive the leg pair: the servo controller, the gait generator, the
//! clock and the time base of the gait. The controller moves through three phases:
//!
//! - `Init`: all servos are sent home and allowed to settle, then the time base is recorded.
//! - `Running`: each cycle the gait generator is evaluated at the elapsed time and its demands are
//!   written to the servos.
//! - `Shutdown`: all servos are sent home, allowed to settle and released.
//!
//! The abort flag is checked at the start of every running cycle, before any servo is written.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{sync::{Arc, atomic::{AtomicBool, Ordering}}, time::Duration};
use log::{debug, error, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cycle::{Clock, CycleTimer, CycleStats},
    gait_gen::{GaitGen, GaitGenError, InputData, JointDemands},
    joint::Joint,
    servo_ctrl::{ServoCtrl, ServoDriver, ServoError, HOME_ANGLE_DEG},
};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Timing parameters of the leg controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Params {
    /// Time allowed for the servos to reach home before continuing.
    ///
    /// Units: seconds
    pub settle_time_s: f64,

    /// Target period of one running cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycle overruns after which a warning is logged.
    pub overrun_warn_limit: u64,
}

/// The leg pair controller.
pub struct LegCtrl<D, C>
where
    D: ServoDriver,
    C: Clock
{
    servo_ctrl: ServoCtrl<D>,

    gait_gen: GaitGen,

    clock: C,

    cycle_timer: CycleTimer,

    settle_time: Duration,

    /// Time at which running started, the gait's time base
    start_time: Option<Duration>,

    phase: Phase,

    /// Set by the signal handler to request a shutdown
    abort: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Phase of the leg controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Running,
    Shutdown,
}

/// Result of a single running cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// The demands were written, run another cycle.
    Continue(JointDemands),

    /// An abort was requested, nothing was written.
    Abort,
}

#[derive(Debug, Error)]
pub enum LegCtrlError {
    #[error("Invalid leg controller parameters: {0}")]
    InvalidParams(String),

    #[error("Servo fault: {0}")]
    ServoError(ServoError),

    #[error("Gait generation error: {0}")]
    GaitGenError(GaitGenError),

    #[error("Cannot {action} while in the {phase:?} phase")]
    WrongPhase {
        action: &'static str,
        phase: Phase,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            settle_time_s: 1.0,
            cycle_period_s: 0.001,
            overrun_warn_limit: 1000,
        }
    }
}

impl From<ServoError> for LegCtrlError {
    fn from(e: ServoError) -> Self {
        LegCtrlError::ServoError(e)
    }
}

impl From<GaitGenError> for LegCtrlError {
    fn from(e: GaitGenError) -> Self {
        LegCtrlError::GaitGenError(e)
    }
}

impl<D, C> LegCtrl<D, C>
where
    D: ServoDriver,
    C: Clock
{
    /// Create a new controller in the `Init` phase.
    ///
    /// `gait_gen` must already be initialised.
    pub fn new(
        servo_ctrl: ServoCtrl<D>,
        gait_gen: GaitGen,
        clock: C,
        params: &Params,
        abort: Arc<AtomicBool>
    ) -> Result<Self, LegCtrlError> {

        let settle_time = util::time::seconds_to_duration(params.settle_time_s)
            .ok_or_else(|| LegCtrlError::InvalidParams(format!(
                "settle_time_s must be non-negative, found {}", params.settle_time_s
            )))?;

        let cycle_period = match util::time::seconds_to_duration(params.cycle_period_s) {
            Some(p) if p > Duration::default() => p,
            _ => return Err(LegCtrlError::InvalidParams(format!(
                "cycle_period_s must be positive, found {}", params.cycle_period_s
            )))
        };

        Ok(Self {
            servo_ctrl,
            gait_gen,
            clock,
            cycle_timer: CycleTimer::new(cycle_period, params.overrun_warn_limit),
            settle_time,
            start_time: None,
            phase: Phase::Init,
            abort,
        })
    }

    /// Run the controller until an abort is requested.
    ///
    /// On a fault the servos are homed and released on a best-effort basis before the error is
    /// returned.
    pub fn run(&mut self) -> Result<(), LegCtrlError> {
        if let Err(e) = self.init() {
            error!("Fault during initialisation: {}", e);
            self.emergency_stop();
            return Err(e)
        }

        loop {
            match self.step() {
                Ok(Step::Continue(_)) => (),
                Ok(Step::Abort) => break,
                Err(e) => {
                    error!("Fault while running: {}", e);
                    self.emergency_stop();
                    return Err(e)
                }
            }
        }

        if let Err(e) = self.shutdown() {
            error!("Fault during shutdown: {}", e);
            self.emergency_stop();
            return Err(e)
        }

        Ok(())
    }

    /// Send all servos home, wait for them to settle and start the gait's time base.
    pub fn init(&mut self) -> Result<(), LegCtrlError> {
        if self.phase != Phase::Init {
            return Err(LegCtrlError::WrongPhase {
                action: "initialise",
                phase: self.phase
            })
        }

        self.servo_ctrl.set_all(HOME_ANGLE_DEG)?;
        info!("All servos set to home position ({} degrees)", HOME_ANGLE_DEG);

        self.clock.sleep(self.settle_time);

        self.start_time = Some(self.clock.now());
        self.phase = Phase::Running;

        info!("Initialisation complete, starting gait");

        Ok(())
    }

    /// Execute one running cycle.
    ///
    /// If an abort has been requested nothing is written and [`Step::Abort`] is returned,
    /// otherwise the cycle ends by waiting for the next tick.
    pub fn step(&mut self) -> Result<Step, LegCtrlError> {
        let start_time = match (self.phase, self.start_time) {
            (Phase::Running, Some(s)) => s,
            (phase, _) => return Err(LegCtrlError::WrongPhase {
                action: "run a cycle",
                phase
            })
        };

        if self.abort.load(Ordering::SeqCst) {
            info!("Abort requested");
            return Ok(Step::Abort)
        }

        self.cycle_timer.start_cycle(&self.clock);

        let elapsed = self.clock.now().checked_sub(start_time).unwrap_or_default();

        let (demands, _) = self.gait_gen.proc(&InputData {
            elapsed_s: elapsed.as_secs_f64()
        })?;

        for &joint in Joint::WRITE_ORDER.iter() {
            self.servo_ctrl.set_angle(joint, demands.get(joint))?;
        }

        let angles = self.servo_ctrl.angles_deg();
        debug!(
            "Knee1: {:.3}, Knee2: {:.3}, Ankle1: {:.3}, Ankle2: {:.3}",
            angles[Joint::Knee1.index()],
            angles[Joint::Knee2.index()],
            angles[Joint::Ankle1.index()],
            angles[Joint::Ankle2.index()]
        );

        self.cycle_timer.end_cycle(&mut self.clock);

        Ok(Step::Continue(demands))
    }

    /// Send all servos home, wait for them to settle and release them.
    pub fn shutdown(&mut self) -> Result<(), LegCtrlError> {
        if self.phase == Phase::Shutdown {
            return Err(LegCtrlError::WrongPhase {
                action: "shut down",
                phase: self.phase
            })
        }
        self.phase = Phase::Shutdown;

        info!("Motion stopped, resetting servos to home position");

        self.servo_ctrl.set_all(HOME_ANGLE_DEG)?;
        self.clock.sleep(self.settle_time);
        self.servo_ctrl.release_all()?;

        self.log_cycle_stats();

        info!("All servos released");

        Ok(())
    }

    /// Best-effort shutdown after a fault.
    ///
    /// Every servo is individually sent home and then released, failures are logged and skipped
    /// since the fault may lie in the write path itself.
    pub fn emergency_stop(&mut self) {
        self.phase = Phase::Shutdown;

        warn!("Attempting to return servos to home position");

        for &joint in Joint::WRITE_ORDER.iter() {
            if let Err(e) = self.servo_ctrl.set_angle(joint, HOME_ANGLE_DEG) {
                warn!("Could not home the {} servo: {}", joint, e);
            }
        }

        self.clock.sleep(self.settle_time);

        for &joint in Joint::ALL.iter() {
            if let Err(e) = self.servo_ctrl.release(joint) {
                warn!("Could not release the {} servo: {}", joint, e);
            }
        }

        self.log_cycle_stats();
    }

    /// Current phase of the controller.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time at which running started, on the controller's clock.
    pub fn start_time(&self) -> Option<Duration> {
        self.start_time
    }

    /// The servo controller.
    pub fn servo_ctrl(&self) -> &ServoCtrl<D> {
        &self.servo_ctrl
    }

    /// The controller's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Cycle timing statistics.
    pub fn cycle_stats(&self) -> CycleStats {
        self.cycle_timer.stats()
    }

    fn log_cycle_stats(&self) {
        let stats = self.cycle_timer.stats();

        info!(
            "Ran {} cycles at a {:.06} s period, {} overran (max overrun {:.06} s)",
            stats.num_cycles,
            self.cycle_timer.period().as_secs_f64(),
            stats.num_overruns,
            stats.max_overrun.as_secs_f64()
        );
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Set the abort flag, returning `true` if an abort had already been requested.
pub fn request_abort(abort: &AtomicBool) -> bool {
    abort.swap(true, Ordering::SeqCst)
}
