//! Common utilities and types shared across botlink_core

/// Common types used across the codebase
pub mod types {
    /// One of the two drive wheels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Wheel {
        Left,
        Right,
    }

    /// Encoder reading, in encoder degrees (360 per wheel revolution)
    pub type EncoderTicks = i32;

    /// Robot heading in degrees, accumulated (not wrapped to 0..360)
    pub type HeadingDegrees = f64;
}

/// Conversions between encoder ticks, centimeters and robot rotation
pub mod units {
    use crate::config::GeometryConfig;
    use std::f64::consts::PI;

    /// Encoder ticks per full wheel revolution
    pub const TICKS_PER_REVOLUTION: f64 = 360.0;

    /// Unit converter derived from wheel geometry
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct UnitConverter {
        ticks_per_cm: f64,
        track_width_cm: f64,
    }

    impl UnitConverter {
        /// Create a converter for the given wheel circumference and track width
        pub fn new(wheel_circumference_cm: f64, track_width_cm: f64) -> Self {
            UnitConverter {
                ticks_per_cm: TICKS_PER_REVOLUTION / wheel_circumference_cm,
                track_width_cm,
            }
        }

        /// Create a converter from the geometry section of the configuration
        pub fn from_geometry(geometry: &GeometryConfig) -> Self {
            Self::new(geometry.wheel_circumference_cm, geometry.track_width_cm)
        }

        /// Encoder ticks per centimeter of wheel travel
        pub fn ticks_per_cm(&self) -> f64 {
            self.ticks_per_cm
        }

        /// Convert a distance to (fractional) encoder ticks
        pub fn cm_to_ticks(&self, cm: f64) -> f64 {
            cm * self.ticks_per_cm
        }

        /// Convert encoder ticks to a distance
        pub fn ticks_to_cm(&self, ticks: f64) -> f64 {
            ticks / self.ticks_per_cm
        }

        /// Whole tick count a wheel must travel to cover `cm`, sign dropped
        pub fn ticks_for_distance(&self, cm: f64) -> u32 {
            self.cm_to_ticks(cm.abs()).round() as u32
        }

        /// Whole tick count each wheel travels when the robot spins `degrees` in place
        pub fn ticks_for_rotation(&self, degrees: f64) -> u32 {
            let arc_cm = degrees.abs() * PI * self.track_width_cm / 360.0;
            self.ticks_for_distance(arc_cm)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rstest::rstest;

        fn ev3() -> UnitConverter {
            UnitConverter::new(17.6, 12.0)
        }

        #[test]
        fn test_reference_wheel_factors() {
            let converter = ev3();
            assert!((converter.cm_to_ticks(1.0) - 20.4545).abs() < 1e-3);
            assert!((converter.ticks_to_cm(1.0) - 0.048889).abs() < 1e-5);
        }

        #[test]
        fn test_one_circumference_is_one_revolution() {
            assert_eq!(ev3().ticks_for_distance(17.6), 360);
            assert_eq!(ev3().ticks_for_distance(-17.6), 360);
        }

        #[rstest]
        #[case(0.0)]
        #[case(1.0)]
        #[case(-35.2)]
        #[case(1234.5)]
        fn test_ticks_round_trip(#[case] cm: f64) {
            let converter = ev3();
            let back = converter.ticks_to_cm(converter.cm_to_ticks(cm));
            assert!((back - cm).abs() < 1e-9);
        }

        #[test]
        fn test_rotation_ticks_follow_track_width() {
            // Half a turn in place: each wheel covers half the track circle.
            let converter = ev3();
            let expected = converter.ticks_for_distance(PI * 12.0 / 2.0);
            assert_eq!(converter.ticks_for_rotation(180.0), expected);
            assert_eq!(converter.ticks_for_rotation(-180.0), expected);
        }
    }
}
