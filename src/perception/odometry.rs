//! Wheel odometry

use crate::common::types::EncoderTicks;
use crate::common::units::UnitConverter;

/// Straight-line distance estimate from the two wheel encoders
#[derive(Debug, Clone, Copy)]
pub struct Odometry {
    converter: UnitConverter,
}

impl Odometry {
    /// Create an odometry estimator
    pub fn new(converter: UnitConverter) -> Self {
        Odometry { converter }
    }

    /// Distance travelled since the encoders were zeroed, cm
    ///
    /// Uses the mean of both wheels, so spinning in place contributes nothing.
    pub fn distance_cm(&self, left: EncoderTicks, right: EncoderTicks) -> f64 {
        let mean_ticks = (left as f64 + right as f64) / 2.0;
        self.converter.ticks_to_cm(mean_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_wheels() {
        let odometry = Odometry::new(UnitConverter::new(17.6, 12.0));
        assert!((odometry.distance_cm(360, 360) - 17.6).abs() < 1e-9);
        assert!((odometry.distance_cm(-720, -720) + 35.2).abs() < 1e-9);
        assert_eq!(odometry.distance_cm(100, -100), 0.0);
    }
}
