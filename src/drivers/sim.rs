//! Simulated differential-drive robot
//!
//! Kinematics only: each wheel moves `power * cm_per_sec_per_power` cm/s,
//! heading follows from the wheel speed difference over the track width, and
//! the range sensor looks at a virtual wall straight ahead. The simulated
//! clock advances lazily on every driver call.

use super::{DriverResult, RobotDriver};
use crate::common::types::{EncoderTicks, HeadingDegrees, Wheel};
use crate::common::units::UnitConverter;
use crate::config::{GeometryConfig, SimulationConfig};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A motor command received by the simulator, kept for inspection
#[derive(Debug, Clone, PartialEq)]
pub enum DriveCommand {
    Differential {
        left: f64,
        right: f64,
    },
    Synchronized {
        power: f64,
        differential: f64,
        target_ticks: u32,
    },
}

#[derive(Debug, Clone, Copy)]
struct SyncTarget {
    lead: Wheel,
    start_ticks: f64,
    target_ticks: f64,
}

#[derive(Debug)]
struct SimState {
    last_update: Instant,
    left_power: f64,
    right_power: f64,
    left_ticks: f64,
    right_ticks: f64,
    heading: f64,
    travelled_cm: f64,
    sync: Option<SyncTarget>,
    log: Vec<DriveCommand>,
}

/// Simulated robot implementing [`RobotDriver`]
#[derive(Debug)]
pub struct SimulatedRobot {
    config: SimulationConfig,
    converter: UnitConverter,
    track_width_cm: f64,
    state: Mutex<SimState>,
}

impl SimulatedRobot {
    /// Create a simulator at rest, heading 0, encoders 0
    pub fn new(geometry: &GeometryConfig, config: &SimulationConfig) -> Self {
        SimulatedRobot {
            config: config.clone(),
            converter: UnitConverter::from_geometry(geometry),
            track_width_cm: geometry.track_width_cm,
            state: Mutex::new(SimState {
                last_update: Instant::now(),
                left_power: 0.0,
                right_power: 0.0,
                left_ticks: 0.0,
                right_ticks: 0.0,
                heading: 0.0,
                travelled_cm: 0.0,
                sync: None,
                log: Vec::new(),
            }),
        }
    }

    /// Every motor command received so far, oldest first
    pub fn command_log(&self) -> Vec<DriveCommand> {
        self.lock().log.clone()
    }

    /// True while any wheel has non-zero power
    pub fn is_moving(&self) -> bool {
        let mut state = self.lock();
        self.advance(&mut state);
        state.left_power != 0.0 || state.right_power != 0.0
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not wedge the simulator for the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cm_per_sec(&self, power: f64) -> f64 {
        power * self.config.cm_per_sec_per_power
    }

    /// Integrate wheel motion up to now
    fn advance(&self, state: &mut SimState) {
        let now = Instant::now();
        let mut dt = now.duration_since(state.last_update).as_secs_f64() * self.config.time_scale;
        state.last_update = now;

        if dt <= 0.0 || (state.left_power == 0.0 && state.right_power == 0.0) {
            return;
        }

        let mut finished = false;
        if let Some(sync) = state.sync {
            let (lead_power, lead_ticks) = match sync.lead {
                Wheel::Left => (state.left_power, state.left_ticks),
                Wheel::Right => (state.right_power, state.right_ticks),
            };
            let remaining = sync.target_ticks - (lead_ticks - sync.start_ticks).abs();
            let tick_rate = self.converter.cm_to_ticks(self.cm_per_sec(lead_power)).abs();
            if tick_rate > 0.0 && remaining / tick_rate <= dt {
                dt = (remaining / tick_rate).max(0.0);
                finished = true;
            }
        }

        let left_cm = self.cm_per_sec(state.left_power) * dt;
        let right_cm = self.cm_per_sec(state.right_power) * dt;
        state.left_ticks += self.converter.cm_to_ticks(left_cm);
        state.right_ticks += self.converter.cm_to_ticks(right_cm);
        state.heading += ((left_cm - right_cm) / self.track_width_cm).to_degrees();
        state.travelled_cm += (left_cm + right_cm) / 2.0;

        if finished {
            state.left_power = 0.0;
            state.right_power = 0.0;
            state.sync = None;
        }
    }
}

impl RobotDriver for SimulatedRobot {
    fn read_heading(&self) -> DriverResult<HeadingDegrees> {
        let mut state = self.lock();
        self.advance(&mut state);
        Ok(state.heading)
    }

    fn read_encoder(&self, wheel: Wheel) -> DriverResult<EncoderTicks> {
        let mut state = self.lock();
        self.advance(&mut state);
        let ticks = match wheel {
            Wheel::Left => state.left_ticks,
            Wheel::Right => state.right_ticks,
        };
        Ok(ticks.round() as EncoderTicks)
    }

    fn read_range(&self) -> DriverResult<f64> {
        let mut state = self.lock();
        self.advance(&mut state);
        let range = self.config.initial_range_cm - state.travelled_cm;
        // Ceiling first so an unvalidated negative ceiling reads 0, not a panic.
        Ok(range.min(self.config.max_range_cm).max(0.0))
    }

    fn drive_differential(&self, left_power: f64, right_power: f64) -> DriverResult<()> {
        let mut state = self.lock();
        self.advance(&mut state);
        state.left_power = left_power.clamp(-100.0, 100.0);
        state.right_power = right_power.clamp(-100.0, 100.0);
        state.sync = None;
        state.log.push(DriveCommand::Differential {
            left: left_power,
            right: right_power,
        });
        Ok(())
    }

    fn drive_synchronized(
        &self,
        power: f64,
        differential: f64,
        target_ticks: u32,
    ) -> DriverResult<()> {
        let mut state = self.lock();
        self.advance(&mut state);
        state.log.push(DriveCommand::Synchronized {
            power,
            differential,
            target_ticks,
        });

        let power = power.clamp(-100.0, 100.0);
        let differential = differential.clamp(-100.0, 100.0);
        if target_ticks == 0 || power == 0.0 {
            state.left_power = 0.0;
            state.right_power = 0.0;
            state.sync = None;
            return Ok(());
        }

        // Turn ratio: the lead wheel runs at `power`, the other is slowed and
        // eventually reversed as the ratio approaches +-100.
        let follower = power * (1.0 - 2.0 * differential.abs() / 100.0);
        let (left, right, lead) = if differential >= 0.0 {
            (power, follower, Wheel::Left)
        } else {
            (follower, power, Wheel::Right)
        };
        state.left_power = left;
        state.right_power = right;
        state.sync = Some(SyncTarget {
            lead,
            start_ticks: match lead {
                Wheel::Left => state.left_ticks,
                Wheel::Right => state.right_ticks,
            },
            target_ticks: target_ticks as f64,
        });
        Ok(())
    }

    fn wait_motor_stopped(&self) -> DriverResult<()> {
        loop {
            {
                let mut state = self.lock();
                self.advance(&mut state);
                if state.sync.is_none() {
                    return Ok(());
                }
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }
    }

    fn reset_encoders(&self) -> DriverResult<()> {
        let mut state = self.lock();
        self.advance(&mut state);
        state.left_ticks = 0.0;
        state.right_ticks = 0.0;
        state.travelled_cm = 0.0;
        state.sync = None;
        Ok(())
    }

    fn reset_heading(&self) -> DriverResult<()> {
        let mut state = self.lock();
        self.advance(&mut state);
        state.heading = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_sim() -> SimulatedRobot {
        let simulation = SimulationConfig {
            time_scale: 20.0,
            ..SimulationConfig::default()
        };
        SimulatedRobot::new(&GeometryConfig::default(), &simulation)
    }

    #[test]
    fn test_synchronized_drive_stops_on_target() {
        let sim = fast_sim();
        sim.drive_synchronized(50.0, 0.0, 360).unwrap();
        sim.wait_motor_stopped().unwrap();

        assert!(!sim.is_moving());
        assert_eq!(sim.read_encoder(Wheel::Left).unwrap(), 360);
        assert_eq!(sim.read_encoder(Wheel::Right).unwrap(), 360);
        assert!(sim.read_heading().unwrap().abs() < 1e-6);
        // One wheel revolution forward brings the wall 17.6 cm closer.
        assert!((sim.read_range().unwrap() - (150.0 - 17.6)).abs() < 1e-3);
    }

    #[test]
    fn test_backward_drive_counts_down() {
        let sim = fast_sim();
        sim.drive_synchronized(-40.0, 0.0, 100).unwrap();
        sim.wait_motor_stopped().unwrap();
        assert_eq!(sim.read_encoder(Wheel::Left).unwrap(), -100);
        assert!(sim.read_range().unwrap() > 150.0);
    }

    #[test]
    fn test_spin_in_place_turns_clockwise() {
        let sim = fast_sim();
        sim.drive_differential(30.0, -30.0).unwrap();
        thread::sleep(Duration::from_millis(20));
        sim.drive_differential(0.0, 0.0).unwrap();

        let heading = sim.read_heading().unwrap();
        assert!(heading > 0.0);
        let left = sim.read_encoder(Wheel::Left).unwrap();
        let right = sim.read_encoder(Wheel::Right).unwrap();
        assert!((left + right).abs() <= 1);
    }

    #[test]
    fn test_resets_zero_sensors() {
        let sim = fast_sim();
        sim.drive_synchronized(50.0, 100.0, 90).unwrap();
        sim.wait_motor_stopped().unwrap();
        assert!(sim.read_heading().unwrap() > 0.0);

        sim.reset_encoders().unwrap();
        sim.reset_heading().unwrap();
        assert_eq!(sim.read_encoder(Wheel::Left).unwrap(), 0);
        assert_eq!(sim.read_heading().unwrap(), 0.0);
        assert_eq!(sim.command_log().len(), 1);
    }

    #[test]
    fn test_range_saturates() {
        let simulation = SimulationConfig {
            initial_range_cm: 400.0,
            ..SimulationConfig::default()
        };
        let sim = SimulatedRobot::new(&GeometryConfig::default(), &simulation);
        assert_eq!(sim.read_range().unwrap(), 255.0);
    }

    #[test]
    fn test_negative_range_ceiling_reads_zero() {
        let simulation = SimulationConfig {
            max_range_cm: -1.0,
            ..SimulationConfig::default()
        };
        let sim = SimulatedRobot::new(&GeometryConfig::default(), &simulation);
        assert_eq!(sim.read_range().unwrap(), 0.0);
    }
}
