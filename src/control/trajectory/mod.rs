//! Maneuver planning
//!
//! Splits a [`MotionRequest`] into its rotate and translate phases and
//! converts both into driver units.

use crate::common::units::UnitConverter;
use crate::config::OvershootConfig;
use crate::control::controllers::compensate_overshoot;
use crate::link::MotionRequest;

/// Turn ratio that spins the robot in place
pub const SPIN_IN_PLACE: f64 = 100.0;

/// Rotate phase of a maneuver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationPlan {
    /// Angle to turn, after overshoot compensation; positive is clockwise
    pub degrees: f64,
    /// Power limit for the turn
    pub power: f64,
    /// Encoder ticks each wheel travels for this angle (open-loop turns)
    pub wheel_ticks: u32,
}

impl RotationPlan {
    /// Turn ratio for an open-loop spin in the direction of the turn
    pub fn differential(&self) -> f64 {
        SPIN_IN_PLACE.copysign(self.degrees)
    }
}

/// Translate phase of a maneuver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationPlan {
    /// Signed wheel power; the sign is the travel direction
    pub power: f64,
    /// Encoder ticks to travel
    pub target_ticks: u32,
}

/// The two phases of one maneuver, each optional
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverPlan {
    pub rotation: Option<RotationPlan>,
    pub translation: Option<TranslationPlan>,
}

impl ManeuverPlan {
    /// True when there is nothing to drive
    pub fn is_empty(&self) -> bool {
        self.rotation.is_none() && self.translation.is_none()
    }
}

/// Turns motion requests into maneuver plans
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    converter: UnitConverter,
    overshoot: OvershootConfig,
}

impl TrajectoryGenerator {
    /// Create a new trajectory generator
    pub fn new(converter: UnitConverter, overshoot: OvershootConfig) -> Self {
        TrajectoryGenerator {
            converter,
            overshoot,
        }
    }

    /// Plan the phases for a request
    ///
    /// A request without power plans nothing: neither phase could finish.
    pub fn generate(&self, request: &MotionRequest) -> ManeuverPlan {
        if request.power.is_nan() || request.power <= 0.0 {
            return ManeuverPlan {
                rotation: None,
                translation: None,
            };
        }

        let rotation = (request.turn_degrees != 0.0).then(|| {
            let degrees = compensate_overshoot(request.turn_degrees, request.power, &self.overshoot);
            RotationPlan {
                degrees,
                power: request.power,
                wheel_ticks: self.converter.ticks_for_rotation(degrees),
            }
        });

        let translation = (request.move_distance != 0.0).then(|| TranslationPlan {
            power: request.power.copysign(request.move_distance),
            target_ticks: self.converter.ticks_for_distance(request.move_distance),
        });

        ManeuverPlan {
            rotation,
            translation,
        }
    }
}
