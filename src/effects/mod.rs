//! # Output Effects Module
//!
//! Timed output behaviours (rumble bursts, lightbar flashes) run one at a
//! time by the [`EffectScheduler`].
//!
//! This module handles:
//! - The `Effect` lifecycle (start, update, end)
//! - The `EffectTarget` seam effects write output through
//! - FIFO scheduling with at most one active effect
//! - Built-in rumble and lightbar effects

pub mod lightbar;
pub mod rumble;
pub mod scheduler;

pub use lightbar::LightbarFlash;
pub use rumble::RumbleEffect;
pub use scheduler::EffectScheduler;

use std::time::Duration;

use crate::error::ControlError;
use crate::report::protocol::{Color, OutputState, TriggerEffect, TriggerSide};

/// Output sink an effect mutates
///
/// `apply` replaces the whole desired state. Implementations only commit
/// the new state once it has reached the device.
pub trait EffectTarget {
    /// Current committed output state
    fn output(&self) -> &OutputState;

    /// Write `state` in full and commit it on success
    fn apply(&mut self, state: OutputState) -> Result<(), ControlError>;

    /// Set both rumble motors
    fn set_rumble(&mut self, low: u8, high: u8) -> Result<(), ControlError> {
        let mut state = *self.output();
        state.left_rumble = low;
        state.right_rumble = high;
        self.apply(state)
    }

    fn set_lightbar(&mut self, color: Color) -> Result<(), ControlError> {
        let mut state = *self.output();
        state.lightbar = color;
        self.apply(state)
    }

    fn set_trigger_effect(
        &mut self,
        side: TriggerSide,
        effect: TriggerEffect,
    ) -> Result<(), ControlError> {
        let mut state = *self.output();
        state.set_trigger(side, effect);
        self.apply(state)
    }
}

/// A named output behaviour driven by the scheduler
pub trait Effect: Send {
    fn name(&self) -> &str;

    /// Total run time of a non-looping effect
    fn duration(&self) -> Duration;

    /// Looping effects run until stopped or cleared
    fn is_looping(&self) -> bool;

    /// Called once when the effect becomes active
    fn start(&mut self, target: &mut dyn EffectTarget) -> Result<(), ControlError>;

    /// Called on every tick while active
    fn update(
        &mut self,
        _target: &mut dyn EffectTarget,
        _elapsed: Duration,
    ) -> Result<(), ControlError> {
        Ok(())
    }

    /// Called once when the effect finishes, is stopped or is cleared
    fn end(&mut self, target: &mut dyn EffectTarget) -> Result<(), ControlError>;
}
