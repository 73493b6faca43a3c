//! # Effect Scheduler
//!
//! FIFO queue of pending effects with at most one active effect.
//!
//! Each tick does exactly one of two things: advance the active effect
//! (update, then end it once its time is used up), or start the next queued
//! effect. An effect therefore never starts on the tick that ended its
//! predecessor, and time that passed before an effect started is not
//! charged against its duration.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use super::{Effect, EffectTarget};
use crate::error::ControlError;

struct ActiveEffect {
    effect: Box<dyn Effect>,
    remaining: Duration,
}

/// Scheduler owning queued and active effects
#[derive(Default)]
pub struct EffectScheduler {
    queue: VecDeque<Box<dyn Effect>>,
    active: Option<ActiveEffect>,
}

impl std::fmt::Debug for EffectScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScheduler")
            .field("active", &self.active_name())
            .field("pending", &self.queue.len())
            .finish()
    }
}

fn report(stage: &str, name: &str, result: Result<(), ControlError>) {
    match result {
        Ok(()) => {}
        // Expected while the controller is unplugged
        Err(ControlError::NotConnected) => debug!("Effect '{}' {} skipped: not connected", name, stage),
        Err(e) => warn!("Effect '{}' {} failed: {}", name, stage, e),
    }
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an effect behind any already pending
    pub fn enqueue(&mut self, effect: Box<dyn Effect>) {
        debug!("Queued effect '{}'", effect.name());
        self.queue.push_back(effect);
    }

    /// Advance the scheduler by `elapsed`
    ///
    /// # Arguments
    ///
    /// * `target` - Output the effects write through
    /// * `elapsed` - Wall-clock time since the previous tick
    pub fn tick(&mut self, target: &mut dyn EffectTarget, elapsed: Duration) {
        if let Some(active) = self.active.as_mut() {
            let name = active.effect.name().to_string();
            report("update", &name, active.effect.update(target, elapsed));

            if !active.effect.is_looping() {
                active.remaining = active.remaining.saturating_sub(elapsed);
                if active.remaining.is_zero() {
                    self.end_active(target);
                }
            }
            return;
        }

        if let Some(mut effect) = self.queue.pop_front() {
            debug!("Starting effect '{}'", effect.name());
            let name = effect.name().to_string();
            report("start", &name, effect.start(target));
            self.active = Some(ActiveEffect {
                remaining: effect.duration(),
                effect,
            });
        }
    }

    /// End the active effect and drop every pending one
    ///
    /// Pending effects are discarded without any lifecycle calls.
    pub fn clear(&mut self, target: &mut dyn EffectTarget) {
        self.end_active(target);
        if !self.queue.is_empty() {
            debug!("Discarding {} pending effect(s)", self.queue.len());
        }
        self.queue.clear();
    }

    /// End only the active effect; the queue resumes on the next tick
    pub fn stop_current(&mut self, target: &mut dyn EffectTarget) {
        self.end_active(target);
    }

    fn end_active(&mut self, target: &mut dyn EffectTarget) {
        if let Some(mut active) = self.active.take() {
            let name = active.effect.name().to_string();
            report("end", &name, active.effect.end(target));
            debug!("Effect '{}' ended", name);
        }
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.effect.name())
    }

    /// Time left for the active non-looping effect
    pub fn remaining(&self) -> Option<Duration> {
        self.active.as_ref().map(|a| a.remaining)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing::{ProbeEffect, RecordingTarget};
    use crate::effects::RumbleEffect;

    const HALF: Duration = Duration::from_millis(500);

    #[test]
    fn test_first_tick_starts_effect() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (effect, calls) = ProbeEffect::new("probe", HALF, false);
        scheduler.enqueue(Box::new(effect));

        scheduler.tick(&mut target, HALF);
        let calls = calls.lock().unwrap().clone();
        assert_eq!((calls.starts, calls.updates, calls.ends), (1, 0, 0));
        assert_eq!(scheduler.active_name(), Some("probe"));
        assert_eq!(scheduler.remaining(), Some(HALF), "start tick does not consume time");
    }

    #[test]
    fn test_effect_ends_when_duration_elapsed() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (effect, calls) = ProbeEffect::new("probe", HALF, false);
        scheduler.enqueue(Box::new(effect));

        scheduler.tick(&mut target, Duration::ZERO);
        scheduler.tick(&mut target, Duration::from_millis(200));
        assert_eq!(calls.lock().unwrap().ends, 0);
        scheduler.tick(&mut target, Duration::from_millis(300));

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.updates, 2);
        assert_eq!(calls.ends, 1);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_rumble_lifecycle_is_repeatable() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();

        for _ in 0..2 {
            scheduler.enqueue(Box::new(RumbleEffect::new(128, 200, HALF, false)));
            scheduler.tick(&mut target, Duration::ZERO);
            assert_eq!((target.state.left_rumble, target.state.right_rumble), (128, 200));

            scheduler.tick(&mut target, HALF);
            assert!(scheduler.is_idle(), "effect should be removed");
            assert_eq!((target.state.left_rumble, target.state.right_rumble), (0, 0));
        }
        // start + end per run
        assert_eq!(target.applied.len(), 4);
    }

    #[test]
    fn test_looping_effect_never_expires() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (effect, calls) = ProbeEffect::new("loop", Duration::from_millis(10), true);
        scheduler.enqueue(Box::new(effect));

        for _ in 0..100 {
            scheduler.tick(&mut target, Duration::from_secs(1));
        }
        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.updates, 99);
        assert_eq!(calls.ends, 0);
        assert_eq!(scheduler.remaining(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_effects_run_in_fifo_order_one_at_a_time() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (first, first_calls) = ProbeEffect::new("first", HALF, false);
        let (second, second_calls) = ProbeEffect::new("second", HALF, false);
        scheduler.enqueue(Box::new(first));
        scheduler.enqueue(Box::new(second));

        scheduler.tick(&mut target, Duration::ZERO);
        assert_eq!(scheduler.active_name(), Some("first"));
        assert_eq!(scheduler.pending(), 1);

        scheduler.tick(&mut target, HALF);
        assert_eq!(first_calls.lock().unwrap().ends, 1);
        assert_eq!(second_calls.lock().unwrap().starts, 0, "no start on the ending tick");

        scheduler.tick(&mut target, HALF);
        assert_eq!(scheduler.active_name(), Some("second"));
        assert_eq!(second_calls.lock().unwrap().starts, 1);
    }

    #[test]
    fn test_clear_ends_active_and_empties_queue() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (active, active_calls) = ProbeEffect::new("active", HALF, true);
        let (queued, queued_calls) = ProbeEffect::new("queued", HALF, false);
        scheduler.enqueue(Box::new(active));
        scheduler.tick(&mut target, Duration::ZERO);
        scheduler.enqueue(Box::new(queued));

        scheduler.clear(&mut target);
        assert_eq!(active_calls.lock().unwrap().ends, 1);
        assert_eq!(*queued_calls.lock().unwrap(), Default::default());
        assert!(scheduler.is_idle());

        // A new effect starts cleanly on the next tick
        let (next, next_calls) = ProbeEffect::new("next", HALF, false);
        scheduler.enqueue(Box::new(next));
        scheduler.tick(&mut target, Duration::ZERO);
        assert_eq!(next_calls.lock().unwrap().starts, 1);
        assert_eq!(active_calls.lock().unwrap().ends, 1, "cleared effect ends exactly once");
    }

    #[test]
    fn test_stop_current_keeps_queue() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (first, first_calls) = ProbeEffect::new("first", HALF, true);
        let (second, second_calls) = ProbeEffect::new("second", HALF, false);
        scheduler.enqueue(Box::new(first));
        scheduler.enqueue(Box::new(second));
        scheduler.tick(&mut target, Duration::ZERO);

        scheduler.stop_current(&mut target);
        assert_eq!(first_calls.lock().unwrap().ends, 1);
        assert_eq!(scheduler.pending(), 1);

        scheduler.tick(&mut target, Duration::ZERO);
        assert_eq!(second_calls.lock().unwrap().starts, 1);
    }

    #[test]
    fn test_clear_and_stop_when_idle() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        scheduler.clear(&mut target);
        scheduler.stop_current(&mut target);
        scheduler.tick(&mut target, HALF);
        assert!(scheduler.is_idle());
        assert!(target.applied.is_empty());
    }

    #[test]
    fn test_failing_target_does_not_stall_scheduler() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        target.connected = false;
        scheduler.enqueue(Box::new(RumbleEffect::new(1, 2, HALF, false)));

        scheduler.tick(&mut target, Duration::ZERO);
        scheduler.tick(&mut target, HALF);
        assert!(scheduler.is_idle());
        assert!(target.applied.is_empty());
    }

    #[test]
    fn test_elapsed_passed_to_update() {
        let mut scheduler = EffectScheduler::new();
        let mut target = RecordingTarget::new();
        let (effect, calls) = ProbeEffect::new("probe", Duration::from_secs(1), false);
        scheduler.enqueue(Box::new(effect));
        scheduler.tick(&mut target, Duration::from_millis(7));
        scheduler.tick(&mut target, Duration::from_millis(4));
        assert_eq!(calls.lock().unwrap().elapsed, vec![Duration::from_millis(4)]);
    }
}
