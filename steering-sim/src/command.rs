//! Synthetic steering command patterns

/// Source of steering angle commands (degrees)
pub trait CommandSource {
    /// Produce the next command; `elapsed` is seconds since the loop started
    fn next_command(&mut self, elapsed: f64) -> f64;
}

/// Plain sine sweep advanced by a fixed phase step per call
#[derive(Debug, Clone)]
pub struct GatewaySine {
    amplitude: f64,
    phase_step: f64,
    phase: f64,
}

impl GatewaySine {
    pub fn new(amplitude: f64, phase_step: f64) -> Self {
        Self {
            amplitude,
            phase_step,
            phase: 0.0,
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Default for GatewaySine {
    fn default() -> Self {
        Self::new(500.0, 0.1)
    }
}

impl CommandSource for GatewaySine {
    fn next_command(&mut self, _elapsed: f64) -> f64 {
        let angle = self.amplitude * self.phase.sin();
        self.phase += self.phase_step;
        angle
    }
}

/// Driver-like input: a slow sweep with two faster ripples on top
#[derive(Debug, Clone, Copy, Default)]
pub struct RealisticCommand;

impl RealisticCommand {
    pub fn at(t: f64) -> f64 {
        let base = 500.0 * (t * 0.5).sin();
        let ripple = 50.0 * (t * 2.3).sin() + 30.0 * (t * 3.7).sin();
        base + ripple
    }
}

impl CommandSource for RealisticCommand {
    fn next_command(&mut self, elapsed: f64) -> f64 {
        Self::at(elapsed)
    }
}
