//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use steering_sim::{
    BrokerEndpoint, EcuConfig, GatewayConfig, SceneConfig, TrackerConfig, DEFAULT_BROKER_URL,
};

/// Main application configuration (loaded from config.toml)
///
/// Every section is optional; missing values fall back to the demo defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ecu: EcuConfig,
    #[serde(default)]
    pub visualizer: VisualizerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_url")]
    pub url: String,
}

fn default_broker_url() -> String {
    DEFAULT_BROKER_URL.to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisualizerConfig {
    /// Two-panel command/response chart (also used by the bus diagram)
    #[serde(
        default = "SceneConfig::steering_chart",
        deserialize_with = "chart_scene"
    )]
    pub chart: SceneConfig,
    /// Network graph view
    #[serde(
        default = "SceneConfig::network_view",
        deserialize_with = "network_scene"
    )]
    pub network: SceneConfig,
    /// Chart size in terminal cells
    #[serde(default = "default_plot_width")]
    pub width: usize,
    #[serde(default = "default_plot_height")]
    pub height: usize,
}

fn default_plot_width() -> usize {
    72
}

fn default_plot_height() -> usize {
    9
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            chart: SceneConfig::steering_chart(),
            network: SceneConfig::network_view(),
            width: default_plot_width(),
            height: default_plot_height(),
        }
    }
}

/// Partial scene table; unset keys keep the preset of the view
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenePatch {
    max_points: Option<usize>,
    frame_ms: Option<u64>,
    step_secs: Option<f64>,
    history_secs: Option<f64>,
    network_redraw_every: Option<u64>,
    #[serde(default)]
    tracker: TrackerPatch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrackerPatch {
    max_rate: Option<f64>,
    min_angle: Option<f64>,
    max_angle: Option<f64>,
    dead_band: Option<f64>,
}

impl ScenePatch {
    fn apply(self, base: SceneConfig) -> SceneConfig {
        SceneConfig {
            max_points: self.max_points.unwrap_or(base.max_points),
            frame_ms: self.frame_ms.unwrap_or(base.frame_ms),
            step_secs: self.step_secs.unwrap_or(base.step_secs),
            history_secs: self.history_secs.unwrap_or(base.history_secs),
            network_redraw_every: self
                .network_redraw_every
                .unwrap_or(base.network_redraw_every),
            tracker: self.tracker.apply(base.tracker),
        }
    }
}

impl TrackerPatch {
    fn apply(self, base: TrackerConfig) -> TrackerConfig {
        TrackerConfig {
            max_rate: self.max_rate.unwrap_or(base.max_rate),
            min_angle: self.min_angle.unwrap_or(base.min_angle),
            max_angle: self.max_angle.unwrap_or(base.max_angle),
            dead_band: self.dead_band.unwrap_or(base.dead_band),
        }
    }
}

fn chart_scene<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SceneConfig, D::Error> {
    Ok(ScenePatch::deserialize(deserializer)?.apply(SceneConfig::steering_chart()))
}

fn network_scene<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SceneConfig, D::Error> {
    Ok(ScenePatch::deserialize(deserializer)?.apply(SceneConfig::network_view()))
}

impl AppConfig {
    /// ECU ticks per gateway tick when both run in one loop
    pub fn gateway_every(&self) -> u64 {
        (self.gateway.tick_ms / self.ecu.tick_ms.max(1)).max(1)
    }

    /// Reject values the loops cannot run with
    pub fn validate(&self) -> Result<()> {
        BrokerEndpoint::parse(&self.broker.url).context("Invalid [broker] url")?;
        self.ecu.tracker.validate().context("Invalid [ecu.tracker]")?;
        self.visualizer
            .chart
            .validate()
            .context("Invalid [visualizer.chart]")?;
        self.visualizer
            .network
            .validate()
            .context("Invalid [visualizer.network]")?;
        if self.gateway.tick_ms == 0 || self.ecu.tick_ms == 0 {
            anyhow::bail!("tick_ms must be greater than zero");
        }
        if self.gateway.tick_ms % self.ecu.tick_ms != 0 {
            anyhow::bail!(
                "[gateway] tick_ms ({}) must be a multiple of [ecu] tick_ms ({})",
                self.gateway.tick_ms,
                self.ecu.tick_ms
            );
        }
        if self.visualizer.width < 2 || self.visualizer.height < 2 {
            anyhow::bail!("visualizer width and height must be at least 2");
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid configuration in {:?}", path))?;

    Ok(config)
}
