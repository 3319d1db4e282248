//! Animated command/response scene
//!
//! One [`SteeringScene::update`] call is one animation frame: synthesize the
//! driver command, let the ECU model follow it, record the chart sample and
//! advance the topology highlights.

use crate::command::{CommandSource, RealisticCommand};
use crate::config::SceneConfig;
use crate::topology::{MessageActivity, Topology};
use crate::trace::{TraceBuffer, TraceSample};
use crate::tracker::AngleTracker;
use crate::types::Result;

/// Result of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub frame: u64,
    pub sample: TraceSample,
    /// Visible chart x-range, `None` until there are two points
    pub x_window: Option<(f64, f64)>,
    /// Whether the network view is redrawn on this frame
    pub redraw_network: bool,
    /// Highlight levels used for this frame's network drawing
    pub activity: MessageActivity,
}

impl FrameUpdate {
    /// Figure title for the frame
    pub fn status_line(&self) -> String {
        format!(
            "Command: {:6.1}° | ECU: {:6.1}° | Lag: {:5.1}°",
            self.sample.command,
            self.sample.response,
            self.sample.lag()
        )
    }
}

pub struct SteeringScene<S = RealisticCommand> {
    config: SceneConfig,
    source: S,
    tracker: AngleTracker,
    trace: TraceBuffer,
    topology: Topology,
    activity: MessageActivity,
}

impl SteeringScene<RealisticCommand> {
    pub fn new(config: SceneConfig) -> Result<Self> {
        Self::with_source(config, RealisticCommand)
    }
}

impl<S: CommandSource> SteeringScene<S> {
    pub fn with_source(config: SceneConfig, source: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tracker: AngleTracker::new(config.tracker)?,
            trace: TraceBuffer::new(config.max_points, config.history_secs),
            topology: Topology::steering_network(),
            activity: MessageActivity::default(),
            source,
            config,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn trace(&self) -> &TraceBuffer {
        &self.trace
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn activity(&self) -> &MessageActivity {
        &self.activity
    }

    /// Advance the scene to frame `frame` at `t` seconds since start
    pub fn update(&mut self, frame: u64, t: f64) -> FrameUpdate {
        let command = self.source.next_command(t);

        // The ECU model steps by the nominal frame time, not the wall clock
        self.tracker.set_target(command);
        self.tracker.step(self.config.step_secs);
        let response = self.tracker.current();

        self.activity.trigger(frame);
        let redraw_network = frame % self.config.network_redraw_every == 0;
        let activity = self.activity;
        if redraw_network {
            self.activity.decay();
        }

        let sample = TraceSample {
            t,
            command,
            response,
        };
        self.trace.push(sample);

        let x_window = self
            .trace
            .is_drawable()
            .then(|| self.trace.x_window(t));

        FrameUpdate {
            frame,
            sample,
            x_window,
            redraw_network,
            activity,
        }
    }
}
