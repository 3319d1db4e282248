//! Rate-limited angle tracking
//!
//! The tracker models how a steering actuator follows its setpoint: the
//! target is clamped to the valid range and the current angle slews toward
//! it at no more than `max_rate` degrees per second. Inside the dead-band
//! the current angle snaps onto the target.

use crate::config::TrackerConfig;
use crate::types::Result;

/// Current/target angle pair with a bounded slew rate
#[derive(Debug, Clone, PartialEq)]
pub struct AngleTracker {
    config: TrackerConfig,
    current: f64,
    target: f64,
}

impl AngleTracker {
    /// Create a tracker at rest at 0°
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            current: 0.0,
            target: 0.0,
        })
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Store a new target, clamped to the configured range
    pub fn set_target(&mut self, angle: f64) {
        self.target = angle.clamp(self.config.min_angle, self.config.max_angle);
    }

    /// Advance the current angle by `dt` seconds
    ///
    /// A zero or negative `dt` leaves the state untouched.
    pub fn step(&mut self, dt: f64) {
        if dt.is_nan() || dt <= 0.0 {
            return;
        }

        let diff = self.target - self.current;
        let max_step = self.config.max_rate * dt;
        if diff.abs() > self.config.dead_band && diff.abs() > max_step {
            self.current += max_step.copysign(diff);
        } else {
            // Within the dead-band or within one step of the target
            self.current = self.target;
        }
    }

    /// True while the current angle has not reached the target
    pub fn is_moving(&self) -> bool {
        self.current != self.target
    }

    /// Absolute distance between target and current angle
    pub fn error(&self) -> f64 {
        (self.target - self.current).abs()
    }
}
