//! Bounded command/response history for the charts

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed y-range of both chart panels (degrees)
pub const Y_LIMITS: (f64, f64) = (-600.0, 600.0);

/// One chart point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceSample {
    /// Seconds since the scene started
    pub t: f64,
    /// Commanded angle (gateway TX)
    pub command: f64,
    /// ECU angle (ECU TX)
    pub response: f64,
}

impl TraceSample {
    pub fn lag(&self) -> f64 {
        (self.command - self.response).abs()
    }
}

/// FIFO of the most recent samples; the oldest is dropped at capacity
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    samples: VecDeque<TraceSample>,
    capacity: usize,
    history_secs: f64,
}

impl TraceBuffer {
    pub fn new(capacity: usize, history_secs: f64) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            history_secs,
        }
    }

    pub fn push(&mut self, sample: TraceSample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&TraceSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceSample> {
        self.samples.iter()
    }

    /// Lines are only drawn once there are two points to connect
    pub fn is_drawable(&self) -> bool {
        self.samples.len() > 1
    }

    /// Visible x-range at time `t`: the last `history_secs` plus one second of headroom
    pub fn x_window(&self, t: f64) -> (f64, f64) {
        ((t - self.history_secs).max(0.0), t + 1.0)
    }

    /// Lag of the latest sample
    pub fn lag(&self) -> Option<f64> {
        self.latest().map(TraceSample::lag)
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    pub fn commands(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.command).collect()
    }

    pub fn responses(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.response).collect()
    }
}
