//! Driver capability surface consumed by the controller
//!
//! Motor and sensor drivers live outside this crate. The controller only
//! talks to them through [`RobotDriver`]. [`SimulatedRobot`] is the in-tree
//! implementation used by the demo binary and the integration tests.

pub mod sim;

pub use sim::{DriveCommand, SimulatedRobot};

use crate::common::types::{EncoderTicks, HeadingDegrees, Wheel};

/// Result type for driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Failures reported by the driver layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// A sensor could not be read
    #[error("Sensor read failed: {0}")]
    Sensor(String),

    /// A motor command was rejected
    #[error("Actuator command failed: {0}")]
    Actuator(String),

    /// The hardware link is gone
    #[error("Driver disconnected")]
    Disconnected,
}

/// Motor and sensor capabilities of a differential-drive robot
///
/// Every read is a single-value read that is safe to issue from the telemetry
/// path while a maneuver is driving the motors, so all methods take `&self`.
///
/// Power values are in `-100..=100`. For [`drive_synchronized`] the
/// `differential` is a turn ratio in `-100..=100`: 0 drives straight, +100
/// spins right (clockwise) in place, -100 spins left.
///
/// [`drive_synchronized`]: RobotDriver::drive_synchronized
#[cfg_attr(test, mockall::automock)]
pub trait RobotDriver: Send + Sync {
    /// Gyro heading in degrees, clockwise positive, not wrapped
    fn read_heading(&self) -> DriverResult<HeadingDegrees>;

    /// Encoder position of one wheel
    fn read_encoder(&self, wheel: Wheel) -> DriverResult<EncoderTicks>;

    /// Ultrasonic range to the nearest obstacle, cm
    fn read_range(&self) -> DriverResult<f64>;

    /// Drive each wheel at its own power until told otherwise
    fn drive_differential(&self, left_power: f64, right_power: f64) -> DriverResult<()>;

    /// Drive both wheels in lock-step until the leading wheel has turned
    /// `target_ticks` encoder ticks, then stop
    fn drive_synchronized(&self, power: f64, differential: f64, target_ticks: u32)
        -> DriverResult<()>;

    /// Block until the last synchronized drive has finished
    fn wait_motor_stopped(&self) -> DriverResult<()>;

    /// Zero both wheel encoders
    fn reset_encoders(&self) -> DriverResult<()>;

    /// Zero the gyro heading
    fn reset_heading(&self) -> DriverResult<()>;
}
