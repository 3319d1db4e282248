//! Simulation configuration types
//!
//! Each loop (gateway, ECU, visual scene) has a small serde-friendly config
//! with builder methods. Defaults reproduce the fixed demo behavior; the CLI
//! layers a TOML file and command-line flags on top.

use crate::types::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Angle tracker parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum angular velocity in degrees per second
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,

    /// Lower clamp for the target angle
    #[serde(default = "default_min_angle")]
    pub min_angle: f64,

    /// Upper clamp for the target angle
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,

    /// Tolerance window within which the tracker snaps to the target
    #[serde(default = "default_dead_band")]
    pub dead_band: f64,
}

fn default_max_rate() -> f64 {
    50.0
}

fn default_min_angle() -> f64 {
    -2000.0
}

fn default_max_angle() -> f64 {
    2000.0
}

fn default_dead_band() -> f64 {
    1.0
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::ecu()
    }
}

impl TrackerConfig {
    /// Steering ECU preset: 50°/s, clamp ±2000°, 1° dead-band
    pub fn ecu() -> Self {
        Self {
            max_rate: default_max_rate(),
            min_angle: default_min_angle(),
            max_angle: default_max_angle(),
            dead_band: default_dead_band(),
        }
    }

    /// Visualizer preset: 150°/s slew limiter, unclamped, no dead-band
    pub fn visualizer() -> Self {
        Self {
            max_rate: 150.0,
            min_angle: f64::NEG_INFINITY,
            max_angle: f64::INFINITY,
            dead_band: 0.0,
        }
    }

    /// Builder method: set the maximum angular rate
    pub fn with_max_rate(mut self, max_rate: f64) -> Self {
        self.max_rate = max_rate;
        self
    }

    /// Builder method: set the target clamp range
    pub fn with_range(mut self, min_angle: f64, max_angle: f64) -> Self {
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        self
    }

    /// Builder method: set the dead-band
    pub fn with_dead_band(mut self, dead_band: f64) -> Self {
        self.dead_band = dead_band;
        self
    }

    /// Check that the parameters describe a usable tracker
    pub fn validate(&self) -> Result<()> {
        if !self.max_rate.is_finite() || self.max_rate < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "max_rate must be a finite non-negative number, got {}",
                self.max_rate
            )));
        }
        if self.min_angle.is_nan() || self.max_angle.is_nan() || self.min_angle > self.max_angle {
            return Err(SimError::InvalidConfig(format!(
                "invalid clamp range [{}, {}]",
                self.min_angle, self.max_angle
            )));
        }
        if !self.dead_band.is_finite() || self.dead_band < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "dead_band must be a finite non-negative number, got {}",
                self.dead_band
            )));
        }
        Ok(())
    }
}

/// Command publisher (gateway) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_client")]
    pub client_id: String,

    /// Peak steering angle of the sine pattern (degrees)
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Phase advance per tick (radians)
    #[serde(default = "default_phase_step")]
    pub phase_step: f64,

    /// Steering speed announced with every command (deg/s)
    #[serde(default = "default_steering_speed")]
    pub steering_speed: i64,

    /// Publish interval in milliseconds
    #[serde(default = "default_gateway_tick")]
    pub tick_ms: u64,
}

fn default_gateway_client() -> String {
    "steering_gateway".to_string()
}

fn default_amplitude() -> f64 {
    500.0
}

fn default_phase_step() -> f64 {
    0.1
}

fn default_steering_speed() -> i64 {
    100
}

fn default_gateway_tick() -> u64 {
    500
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            client_id: default_gateway_client(),
            amplitude: default_amplitude(),
            phase_step: default_phase_step(),
            steering_speed: default_steering_speed(),
            tick_ms: default_gateway_tick(),
        }
    }
}

impl GatewayConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Steering ECU settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcuConfig {
    /// Client id used for the command subscription
    #[serde(default = "default_ecu_client")]
    pub client_id: String,

    /// Client id used for the status publisher
    #[serde(default = "default_ecu_status_client")]
    pub status_client_id: String,

    /// Control loop interval in milliseconds
    #[serde(default = "default_ecu_tick")]
    pub tick_ms: u64,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_ecu_client() -> String {
    "steering_ecu".to_string()
}

fn default_ecu_status_client() -> String {
    "steering_ecu_status".to_string()
}

fn default_ecu_tick() -> u64 {
    100
}

impl Default for EcuConfig {
    fn default() -> Self {
        Self {
            client_id: default_ecu_client(),
            status_client_id: default_ecu_status_client(),
            tick_ms: default_ecu_tick(),
            tracker: TrackerConfig::ecu(),
        }
    }
}

impl EcuConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Builder method: replace the tracker parameters
    pub fn with_tracker(mut self, tracker: TrackerConfig) -> Self {
        self.tracker = tracker;
        self
    }
}

/// Settings for the animated chart / topology scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Number of samples kept for the charts
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Frame interval in milliseconds
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,

    /// Simulated time the ECU model advances per frame (seconds)
    #[serde(default = "default_step_secs")]
    pub step_secs: f64,

    /// Visible time history of the charts (seconds)
    #[serde(default = "default_history_secs")]
    pub history_secs: f64,

    /// Redraw the network view every N frames
    #[serde(default = "default_redraw_every")]
    pub network_redraw_every: u64,

    #[serde(default = "TrackerConfig::visualizer")]
    pub tracker: TrackerConfig,
}

fn default_max_points() -> usize {
    100
}

fn default_frame_ms() -> u64 {
    50
}

fn default_step_secs() -> f64 {
    0.05
}

fn default_history_secs() -> f64 {
    10.0
}

fn default_redraw_every() -> u64 {
    1
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::steering_chart()
    }
}

impl SceneConfig {
    /// Two-panel command/response chart at 20 FPS
    pub fn steering_chart() -> Self {
        Self {
            max_points: default_max_points(),
            frame_ms: default_frame_ms(),
            step_secs: default_step_secs(),
            history_secs: default_history_secs(),
            network_redraw_every: default_redraw_every(),
            tracker: TrackerConfig::visualizer(),
        }
    }

    /// Network topology view: 10 FPS, shorter buffers, network redrawn every other frame
    pub fn network_view() -> Self {
        Self {
            max_points: 50,
            frame_ms: 100,
            network_redraw_every: 2,
            ..Self::steering_chart()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    /// Builder method: set the frame interval
    pub fn with_frame_ms(mut self, frame_ms: u64) -> Self {
        self.frame_ms = frame_ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_points < 2 {
            return Err(SimError::InvalidConfig(format!(
                "max_points must be at least 2, got {}",
                self.max_points
            )));
        }
        if self.network_redraw_every == 0 {
            return Err(SimError::InvalidConfig(
                "network_redraw_every must be at least 1".to_string(),
            ));
        }
        if !self.step_secs.is_finite() || self.step_secs < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "step_secs must be a finite non-negative number, got {}",
                self.step_secs
            )));
        }
        self.tracker.validate()
    }
}
