//! Lightbar flash effect

use std::time::Duration;

use super::{Effect, EffectTarget};
use crate::error::ControlError;
use crate::report::protocol::Color;

/// Shows a colour for a while, then restores the colour it replaced
#[derive(Debug, Clone)]
pub struct LightbarFlash {
    color: Color,
    duration: Duration,
    previous: Option<Color>,
}

impl LightbarFlash {
    pub fn new(color: Color, duration: Duration) -> Self {
        Self {
            color,
            duration,
            previous: None,
        }
    }
}

impl Effect for LightbarFlash {
    fn name(&self) -> &str {
        "lightbar_flash"
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn is_looping(&self) -> bool {
        false
    }

    fn start(&mut self, target: &mut dyn EffectTarget) -> Result<(), ControlError> {
        self.previous = Some(target.output().lightbar);
        target.set_lightbar(self.color)
    }

    fn end(&mut self, target: &mut dyn EffectTarget) -> Result<(), ControlError> {
        match self.previous.take() {
            Some(color) => target.set_lightbar(color),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing::RecordingTarget;

    #[test]
    fn test_flash_restores_previous_colour() {
        let mut target = RecordingTarget::new();
        target.state.lightbar = Color::new(0, 0, 255);

        let mut flash = LightbarFlash::new(Color::new(255, 0, 0), Duration::from_millis(50));
        flash.start(&mut target).unwrap();
        assert_eq!(target.state.lightbar, Color::new(255, 0, 0));
        flash.end(&mut target).unwrap();
        assert_eq!(target.state.lightbar, Color::new(0, 0, 255));
    }

    #[test]
    fn test_end_without_start_is_noop() {
        let mut target = RecordingTarget::new();
        let mut flash = LightbarFlash::new(Color::new(1, 1, 1), Duration::ZERO);
        flash.end(&mut target).unwrap();
        assert!(target.applied.is_empty());
    }
}
