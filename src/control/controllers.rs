//! Control laws for the rotate phase

use crate::config::{MotionConfig, OvershootConfig};
use std::time::{Duration, Instant};

/// Proportional heading controller for turning in place
///
/// Power is the heading error clipped to the requested power. Small errors
/// are raised to a minimum power so the robot still has enough torque to
/// close the last degrees.
#[derive(Debug, Clone)]
pub struct TurnController {
    angle_tolerance: f64,
    min_turn_power: f64,
    settle_dwell: Duration,
}

impl TurnController {
    /// Create a controller from the motion tuning section
    pub fn new(config: &MotionConfig) -> Self {
        TurnController {
            angle_tolerance: config.angle_tolerance_deg,
            min_turn_power: config.min_turn_power,
            settle_dwell: config.settle_dwell(),
        }
    }

    /// Signed turning power for a heading error; positive turns right
    ///
    /// The magnitude is always within `[min(min_turn_power, power_limit), power_limit]`.
    pub fn turn_power(&self, error: f64, power_limit: f64) -> f64 {
        if error == 0.0 || power_limit <= 0.0 {
            return 0.0;
        }
        let floor = self.min_turn_power.min(power_limit);
        error.abs().clamp(floor, power_limit).copysign(error)
    }

    /// Whether an error is inside the tolerance band
    pub fn within_tolerance(&self, error: f64) -> bool {
        error.abs() <= self.angle_tolerance
    }

    /// Start tracking the settle dwell for a new turn
    pub fn settle_timer(&self) -> SettleTimer {
        SettleTimer {
            dwell: self.settle_dwell,
            inside_since: None,
        }
    }
}

/// Tracks how long the heading error has stayed within tolerance
///
/// The turn may only end once the error has been inside the band for the
/// whole dwell; any excursion outside restarts the clock.
#[derive(Debug, Clone)]
pub struct SettleTimer {
    dwell: Duration,
    inside_since: Option<Instant>,
}

impl SettleTimer {
    /// Feed one observation; returns true once the turn has settled
    pub fn update(&mut self, within_tolerance: bool, now: Instant) -> bool {
        if !within_tolerance {
            self.inside_since = None;
            return false;
        }
        let since = *self.inside_since.get_or_insert(now);
        now.duration_since(since) >= self.dwell
    }
}

/// Apply the empirical overshoot compensation to a commanded turn angle
///
/// Heuristic tuned on the reference robot: a turn carries on for roughly
/// `power * power_fraction` degrees after the motors are cut, so that much is
/// taken off the commanded angle. When the correction would eat the whole
/// angle, the angle is scaled by `fallback_fraction` instead. The sign of the
/// turn is kept.
pub fn compensate_overshoot(turn_degrees: f64, power: f64, config: &OvershootConfig) -> f64 {
    if !config.enabled || turn_degrees == 0.0 {
        return turn_degrees;
    }
    let magnitude = turn_degrees.abs();
    let correction = power.abs() * config.power_fraction;
    let corrected = if correction >= magnitude {
        magnitude * config.fallback_fraction
    } else {
        magnitude - correction
    };
    corrected.copysign(turn_degrees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn controller() -> TurnController {
        TurnController::new(&MotionConfig::default())
    }

    #[rstest]
    #[case(90.0, 30.0, 30.0)]
    #[case(-90.0, 30.0, -30.0)]
    #[case(12.0, 30.0, 12.0)]
    #[case(-12.0, 30.0, -12.0)]
    #[case(2.0, 30.0, 5.0)]
    #[case(-0.4, 30.0, -5.0)]
    #[case(0.0, 30.0, 0.0)]
    #[case(1.0, 3.0, 3.0)]
    #[case(40.0, 3.0, 3.0)]
    fn test_turn_power(#[case] error: f64, #[case] limit: f64, #[case] expected: f64) {
        assert_eq!(controller().turn_power(error, limit), expected);
    }

    #[rstest]
    #[case(0.01)]
    #[case(1.0)]
    #[case(4.9)]
    #[case(25.0)]
    #[case(180.0)]
    fn test_turn_power_bounds(#[case] error: f64) {
        let controller = controller();
        for limit in [5.0, 20.0, 50.0, 100.0] {
            for signed in [error, -error] {
                let power = controller.turn_power(signed, limit);
                assert!(power.abs() >= 5.0 && power.abs() <= limit);
                assert_eq!(power.signum(), signed.signum());
            }
        }
    }

    #[test]
    fn test_tolerance_band() {
        let controller = controller();
        assert!(controller.within_tolerance(1.5));
        assert!(controller.within_tolerance(-1.2));
        assert!(!controller.within_tolerance(1.51));
    }

    #[test]
    fn test_settle_timer_needs_continuous_dwell() {
        let mut timer = controller().settle_timer();
        let t0 = Instant::now();
        let ms = Duration::from_millis;

        assert!(!timer.update(true, t0));
        assert!(!timer.update(true, t0 + ms(200)));
        // Excursion outside the band restarts the dwell.
        assert!(!timer.update(false, t0 + ms(250)));
        assert!(!timer.update(true, t0 + ms(260)));
        assert!(!timer.update(true, t0 + ms(500)));
        assert!(timer.update(true, t0 + ms(560)));
    }

    #[rstest]
    #[case(false, 90.0, 30.0, 90.0)]
    #[case(true, 90.0, 30.0, 80.0)]
    #[case(true, -90.0, 30.0, -80.0)]
    #[case(true, 9.0, 30.0, 3.0)]
    #[case(true, -10.0, 30.0, -10.0 / 3.0)]
    #[case(true, 0.0, 30.0, 0.0)]
    fn test_overshoot_compensation(
        #[case] enabled: bool,
        #[case] turn: f64,
        #[case] power: f64,
        #[case] expected: f64,
    ) {
        let config = OvershootConfig {
            enabled,
            ..OvershootConfig::default()
        };
        assert!((compensate_overshoot(turn, power, &config) - expected).abs() < 1e-9);
    }
}
