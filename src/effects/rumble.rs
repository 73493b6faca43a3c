//! Rumble burst effect

use std::time::Duration;

use super::{Effect, EffectTarget};
use crate::error::ControlError;

/// Drives both motors for a fixed time, then stops them
///
/// Only the motor bytes are touched; every other output field is left as
/// it was.
#[derive(Debug, Clone)]
pub struct RumbleEffect {
    low: u8,
    high: u8,
    duration: Duration,
    looping: bool,
}

impl RumbleEffect {
    /// # Arguments
    ///
    /// * `low` - Low-frequency (left) motor strength
    /// * `high` - High-frequency (right) motor strength
    /// * `duration` - Run time when not looping
    /// * `looping` - Run until stopped
    pub fn new(low: u8, high: u8, duration: Duration, looping: bool) -> Self {
        Self {
            low,
            high,
            duration,
            looping,
        }
    }
}

impl Effect for RumbleEffect {
    fn name(&self) -> &str {
        "rumble"
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn start(&mut self, target: &mut dyn EffectTarget) -> Result<(), ControlError> {
        target.set_rumble(self.low, self.high)
    }

    fn end(&mut self, target: &mut dyn EffectTarget) -> Result<(), ControlError> {
        target.set_rumble(0, 0)
    }
}
