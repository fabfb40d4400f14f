//! Motion control: executes one maneuver as rotate-then-translate
pub mod controllers;
pub mod trajectory;

use self::controllers::TurnController;
use self::trajectory::{ManeuverPlan, RotationPlan, TrajectoryGenerator, TranslationPlan};
use crate::common::types::HeadingDegrees;
use crate::common::units::UnitConverter;
use crate::config::{BotlinkConfig, TurnPolicy};
use crate::drivers::RobotDriver;
use crate::error::Result;
use crate::link::MotionRequest;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// State shared between the scheduler, the running maneuver and telemetry
///
/// `ready` is false exactly while a maneuver is in flight. Both fields are
/// atomics so telemetry can read them without ever waiting on the maneuver.
#[derive(Debug)]
pub struct ControllerState {
    ready: AtomicBool,
    current_heading: AtomicU64,
}

impl ControllerState {
    /// Create an idle state
    pub fn new() -> Self {
        ControllerState {
            ready: AtomicBool::new(true),
            current_heading: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Whether the robot accepts a new command
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Atomically move from ready to busy; false if already busy
    pub fn try_claim(&self) -> bool {
        self.ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Last heading seen by the rotate phase
    pub fn current_heading(&self) -> HeadingDegrees {
        f64::from_bits(self.current_heading.load(Ordering::Relaxed))
    }

    pub fn set_current_heading(&self, heading: HeadingDegrees) {
        self.current_heading.store(heading.to_bits(), Ordering::Relaxed);
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the state ready again when a maneuver ends, however it ends
struct ReadyGuard<'a>(&'a ControllerState);

impl Drop for ReadyGuard<'_> {
    fn drop(&mut self) {
        self.0.set_ready(true);
    }
}

/// Executes motion requests against a [`RobotDriver`]
pub struct MotionController {
    driver: Arc<dyn RobotDriver>,
    turn_policy: TurnPolicy,
    turn_controller: TurnController,
    trajectory: TrajectoryGenerator,
    poll_interval: Duration,
}

impl MotionController {
    /// Create a controller driving `driver` with the given configuration
    pub fn new(driver: Arc<dyn RobotDriver>, config: &BotlinkConfig) -> Self {
        let converter = UnitConverter::from_geometry(&config.geometry);
        debug!(
            "MotionController: policy={:?}, tolerance={}deg, dwell={}ms, min_power={}",
            config.motion.turn_policy,
            config.motion.angle_tolerance_deg,
            config.motion.settle_dwell_ms,
            config.motion.min_turn_power
        );

        MotionController {
            driver,
            turn_policy: config.motion.turn_policy,
            turn_controller: TurnController::new(&config.motion),
            trajectory: TrajectoryGenerator::new(converter, config.motion.overshoot.clone()),
            poll_interval: config.motion.turn_poll_interval(),
        }
    }

    /// Run a maneuver to completion
    ///
    /// `ready` is cleared for the duration and set again on return, including
    /// when the driver fails. Blocks the calling thread; run it off the
    /// control loop.
    pub fn execute(&self, request: &MotionRequest, state: &ControllerState) -> Result<()> {
        state.set_ready(false);
        let _ready = ReadyGuard(state);

        let plan = self.trajectory.generate(request);
        if plan.is_empty() {
            if !request.is_noop() {
                warn!("Ignoring '{}': no power to drive with", request);
            }
            return Ok(());
        }

        info!("Executing '{}'", request);
        self.run(&plan, state)?;
        info!("Maneuver '{}' complete", request);
        Ok(())
    }

    fn run(&self, plan: &ManeuverPlan, state: &ControllerState) -> Result<()> {
        if let Some(rotation) = &plan.rotation {
            match self.turn_policy {
                TurnPolicy::ClosedLoop => self.rotate_closed_loop(rotation, state)?,
                TurnPolicy::OpenLoop => self.rotate_open_loop(rotation)?,
            }
            self.driver.drive_differential(0.0, 0.0)?;
        }

        if let Some(translation) = &plan.translation {
            self.translate(translation)?;
        }
        Ok(())
    }

    /// Turn with proportional heading feedback until settled on target
    fn rotate_closed_loop(&self, rotation: &RotationPlan, state: &ControllerState) -> Result<()> {
        let start = self.driver.read_heading()?;
        let target = start + rotation.degrees;
        info!(
            "Rotate: {:.1}deg -> {:.1}deg (power {})",
            start, target, rotation.power
        );

        let mut settle = self.turn_controller.settle_timer();
        let mut commanded: Option<f64> = None;
        let mut iterations: u64 = 0;

        loop {
            let heading = self.driver.read_heading()?;
            state.set_current_heading(heading);
            let error = target - heading;

            let within = self.turn_controller.within_tolerance(error);
            if settle.update(within, Instant::now()) {
                break;
            }

            let power = self.turn_controller.turn_power(error, rotation.power);
            if commanded != Some(power) {
                debug!("Rotate: heading={:.2}, error={:.2}, power={:.1}", heading, error, power);
                self.driver.drive_differential(power, -power)?;
                commanded = Some(power);
            }

            iterations += 1;
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }

        debug!("Rotate: settled after {} iterations", iterations);
        Ok(())
    }

    /// Spin a fixed encoder amount with no heading feedback
    fn rotate_open_loop(&self, rotation: &RotationPlan) -> Result<()> {
        info!(
            "Rotate: {:.1}deg open loop, {} ticks (power {})",
            rotation.degrees, rotation.wheel_ticks, rotation.power
        );
        self.driver
            .drive_synchronized(rotation.power, rotation.differential(), rotation.wheel_ticks)?;
        self.driver.wait_motor_stopped()?;
        Ok(())
    }

    /// Drive straight for the planned tick count and wait for the motors to stop
    fn translate(&self, translation: &TranslationPlan) -> Result<()> {
        info!(
            "Translate: {} ticks at power {}",
            translation.target_ticks, translation.power
        );
        self.driver
            .drive_synchronized(translation.power, 0.0, translation.target_ticks)?;
        self.driver.wait_motor_stopped()?;
        Ok(())
    }
}
