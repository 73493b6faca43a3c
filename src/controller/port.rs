//! Output port: the cached output state and the write-then-commit rule

use crate::channel::Channel;
use crate::effects::EffectTarget;
use crate::error::ControlError;
use crate::report::protocol::OutputState;
use crate::session::DeviceSession;

/// Borrowed view over a session and the cached output state
///
/// Every change re-encodes the whole state and writes it. The cache only
/// takes the new state once the write succeeded, so after a failure the
/// cache still matches what the device last accepted.
pub struct OutputPort<'a, C: Channel> {
    session: &'a mut DeviceSession<C>,
    cached: &'a mut OutputState,
}

impl<'a, C: Channel> OutputPort<'a, C> {
    pub fn new(session: &'a mut DeviceSession<C>, cached: &'a mut OutputState) -> Self {
        Self { session, cached }
    }
}

impl<C: Channel> EffectTarget for OutputPort<'_, C> {
    fn output(&self) -> &OutputState {
        &*self.cached
    }

    fn apply(&mut self, state: OutputState) -> Result<(), ControlError> {
        if !self.session.is_connected() {
            return Err(ControlError::NotConnected);
        }
        self.session.write(&state)?;
        *self.cached = state;
        Ok(())
    }
}
