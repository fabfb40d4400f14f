//! Configuration for botlink_core
//!
//! Loaded from a YAML parameter file. Defaults describe the reference robot:
//! 17.6 cm wheels, gyro-corrected turns, 100 ms link cycle.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BotlinkConfig {
    pub geometry: GeometryConfig,
    pub motion: MotionConfig,
    pub link: LinkConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Wheel and chassis geometry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Wheel circumference in cm (one revolution = 360 encoder ticks)
    pub wheel_circumference_cm: f64,
    /// Distance between the two wheel contact points in cm
    pub track_width_cm: f64,
}

/// How the rotate phase decides it is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPolicy {
    /// Spin a fixed encoder amount, no heading feedback
    OpenLoop,
    /// Proportional heading correction with a settle dwell
    ClosedLoop,
}

/// Motion controller tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    pub turn_policy: TurnPolicy,
    /// Heading error considered "on target", degrees
    pub angle_tolerance_deg: f64,
    /// Time the error must stay within tolerance before the turn ends
    pub settle_dwell_ms: u64,
    /// Smallest turning power ever commanded while correcting
    pub min_turn_power: f64,
    /// Sleep between heading samples in the closed-loop turn
    pub turn_poll_interval_ms: u64,
    pub overshoot: OvershootConfig,
}

/// Empirical overshoot compensation for the commanded turn angle
///
/// The commanded angle magnitude is reduced by `power * power_fraction`. When
/// that reduction would swallow the whole angle, the angle is scaled by
/// `fallback_fraction` instead.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OvershootConfig {
    pub enabled: bool,
    pub power_fraction: f64,
    pub fallback_fraction: f64,
}

/// Host link settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Control loop period in ms
    pub cycle_period_ms: u64,
    /// File the host drops inbound commands into
    pub inbox: PathBuf,
    /// Outbox name; the report is written to `<outbox>.rtf`
    pub outbox: PathBuf,
    /// Longest inbound message accepted, in bytes
    pub max_message_len: usize,
}

/// Simulated robot parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wheel surface speed per unit of power, cm/s
    pub cm_per_sec_per_power: f64,
    /// Distance to the virtual wall ahead at start
    pub initial_range_cm: f64,
    /// Saturation value of the range sensor
    pub max_range_cm: f64,
    /// Simulated seconds per wall-clock second
    pub time_scale: f64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        GeometryConfig {
            wheel_circumference_cm: 17.6,
            track_width_cm: 12.0,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            turn_policy: TurnPolicy::ClosedLoop,
            angle_tolerance_deg: 1.5,
            settle_dwell_ms: 300,
            min_turn_power: 5.0,
            turn_poll_interval_ms: 5,
            overshoot: OvershootConfig::default(),
        }
    }
}

impl Default for OvershootConfig {
    fn default() -> Self {
        OvershootConfig {
            enabled: false,
            power_fraction: 1.0 / 3.0,
            fallback_fraction: 1.0 / 3.0,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            cycle_period_ms: 100,
            inbox: PathBuf::from("EV3_INBOX0"),
            outbox: PathBuf::from("EV3_OUTBOX0"),
            max_message_len: 32,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            cm_per_sec_per_power: 0.5,
            initial_range_cm: 150.0,
            max_range_cm: 255.0,
            time_scale: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl MotionConfig {
    pub fn settle_dwell(&self) -> Duration {
        Duration::from_millis(self.settle_dwell_ms)
    }

    pub fn turn_poll_interval(&self) -> Duration {
        Duration::from_millis(self.turn_poll_interval_ms)
    }
}

impl LinkConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }
}

impl BotlinkConfig {
    /// Load configuration from a YAML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: BotlinkConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the controller or the simulator cannot work with
    pub fn validate(&self) -> Result<()> {
        require_positive("wheel_circumference_cm", self.geometry.wheel_circumference_cm)?;
        require_positive("track_width_cm", self.geometry.track_width_cm)?;
        if self.link.cycle_period_ms == 0 {
            return Err(Error::Config("cycle_period_ms must be non-zero".to_string()));
        }
        if self.link.max_message_len == 0 {
            return Err(Error::Config("max_message_len must be non-zero".to_string()));
        }
        require_non_negative("angle_tolerance_deg", self.motion.angle_tolerance_deg)?;
        require_non_negative("min_turn_power", self.motion.min_turn_power)?;
        require_positive("cm_per_sec_per_power", self.simulation.cm_per_sec_per_power)?;
        require_non_negative("max_range_cm", self.simulation.max_range_cm)?;
        if !self.simulation.initial_range_cm.is_finite() {
            return Err(Error::Config(format!(
                "initial_range_cm must be finite, got {}",
                self.simulation.initial_range_cm
            )));
        }
        require_positive("time_scale", self.simulation.time_scale)?;
        Ok(())
    }
}

/// NaN and infinity are rejected along with values <= 0
fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be positive, got {}", name, value)))
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be non-negative, got {}", name, value)))
    }
}
