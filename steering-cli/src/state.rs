//! Run-loop state: interrupt flag and fixed-interval ticking

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Why a loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The requested number of ticks was reached
    Completed,
    /// The user pressed Ctrl+C
    Interrupted,
}

/// Shared "keep running" flag cleared by the interrupt handler
#[derive(Debug, Clone)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Install the Ctrl+C handler for this process
    pub fn install_interrupt_handler(&self) -> Result<()> {
        let running = Arc::clone(&self.running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Call `tick` every `interval` until interrupted or `max_ticks` is reached
    ///
    /// Ticks run strictly one after another; an error from `tick` ends the loop.
    pub fn run_ticks<F>(
        &self,
        interval: Duration,
        max_ticks: Option<u64>,
        mut tick: F,
    ) -> Result<LoopExit>
    where
        F: FnMut(u64) -> Result<()>,
    {
        let mut count = 0u64;
        loop {
            if !self.is_running() {
                return Ok(LoopExit::Interrupted);
            }
            if max_ticks.is_some_and(|max| count >= max) {
                return Ok(LoopExit::Completed);
            }

            tick(count)?;
            count += 1;

            if max_ticks.is_some_and(|max| count >= max) {
                return Ok(LoopExit::Completed);
            }
            thread::sleep(interval);
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_requested_ticks() {
        let state = RunState::new();
        let mut seen = Vec::new();
        let exit = state
            .run_ticks(Duration::ZERO, Some(3), |tick| {
                seen.push(tick);
                Ok(())
            })
            .unwrap();
        assert_eq!(exit, LoopExit::Completed);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_interrupts_loop() {
        let state = RunState::new();
        let handle = state.clone();
        let exit = state
            .run_ticks(Duration::ZERO, None, |tick| {
                if tick == 4 {
                    handle.stop();
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(exit, LoopExit::Interrupted);
    }

    #[test]
    fn test_tick_error_ends_loop() {
        let state = RunState::new();
        let result = state.run_ticks(Duration::ZERO, Some(10), |tick| {
            if tick == 1 {
                anyhow::bail!("broker went away");
            }
            Ok(())
        });
        assert!(result.is_err());
    }
}
