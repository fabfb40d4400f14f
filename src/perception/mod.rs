//! Perception: telemetry sampling for the host link
pub mod odometry;

use self::odometry::Odometry;
use crate::common::types::Wheel;
use crate::common::units::UnitConverter;
use crate::control::ControllerState;
use crate::drivers::RobotDriver;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Snapshot of the robot sent to the host every cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReport {
    pub ready: bool,
    pub heading_degrees: f64,
    pub distance_cm: f64,
    pub range_cm: f64,
}

/// Wire format: `<ready:0|1> <heading> <distance> <range>`, one decimal place
impl fmt::Display for TelemetryReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {:.1} {:.1} {:.1}",
            u8::from(self.ready),
            self.heading_degrees,
            self.distance_cm,
            self.range_cm
        )
    }
}

/// Reads sensors and the controller's ready flag into a [`TelemetryReport`]
pub struct TelemetrySampler {
    driver: Arc<dyn RobotDriver>,
    state: Arc<ControllerState>,
    odometry: Odometry,
}

impl TelemetrySampler {
    /// Create a new sampler
    pub fn new(
        driver: Arc<dyn RobotDriver>,
        state: Arc<ControllerState>,
        converter: UnitConverter,
    ) -> Self {
        TelemetrySampler {
            driver,
            state,
            odometry: Odometry::new(converter),
        }
    }

    /// Take a report; has no side effects and never waits on a maneuver
    pub fn sample(&self) -> Result<TelemetryReport> {
        let ready = self.state.is_ready();
        let heading_degrees = self.driver.read_heading()?;
        let left = self.driver.read_encoder(Wheel::Left)?;
        let right = self.driver.read_encoder(Wheel::Right)?;
        let range_cm = self.driver.read_range()?;

        Ok(TelemetryReport {
            ready,
            heading_degrees,
            distance_cm: self.odometry.distance_cm(left, right),
            range_cm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{DriverError, MockRobotDriver};
    use crate::error::Error;

    fn sampler_with(driver: MockRobotDriver, state: Arc<ControllerState>) -> TelemetrySampler {
        TelemetrySampler::new(Arc::new(driver), state, UnitConverter::new(17.6, 12.0))
    }

    #[test]
    fn test_report_wire_format() {
        let report = TelemetryReport {
            ready: true,
            heading_degrees: -90.04,
            distance_cm: 17.6,
            range_cm: 42.0,
        };
        assert_eq!(report.to_string(), "1 -90.0 17.6 42.0");

        let busy = TelemetryReport {
            ready: false,
            ..report
        };
        assert!(busy.to_string().starts_with("0 "));
    }

    #[test]
    fn test_sample_reads_all_sensors() {
        let mut driver = MockRobotDriver::new();
        driver.expect_read_heading().times(1).returning(|| Ok(12.34));
        driver
            .expect_read_encoder()
            .returning(|wheel| Ok(if wheel == Wheel::Left { 350 } else { 370 }));
        driver.expect_read_range().times(1).returning(|| Ok(88.0));

        let state = Arc::new(ControllerState::new());
        state.set_ready(false);
        let report = sampler_with(driver, state).sample().unwrap();

        assert!(!report.ready);
        assert_eq!(report.heading_degrees, 12.34);
        assert!((report.distance_cm - 17.6).abs() < 1e-9);
        assert_eq!(report.range_cm, 88.0);
        assert_eq!(report.to_string(), "0 12.3 17.6 88.0");
    }

    #[test]
    fn test_sensor_failure_propagates() {
        let mut driver = MockRobotDriver::new();
        driver
            .expect_read_heading()
            .returning(|| Err(DriverError::Sensor("gyro".to_string())));

        let result = sampler_with(driver, Arc::new(ControllerState::new())).sample();
        assert!(matches!(result, Err(Error::Driver(DriverError::Sensor(_)))));
    }
}
