//! # Controller Module
//!
//! Public face of a DualSense: one session, its cached output state and
//! the effect scheduler, driven by a periodic tick from the host.
//!
//! This module handles:
//! - Connecting (with the initial player LED) and reconnecting
//! - Rumble, lightbar, trigger effect and LED changes
//! - Queueing, stopping and clearing output effects
//! - Polling input with the asynchronous read on every tick
//! - Automatic reconnection after the controller was removed
//!
//! Every output operation answers [`ControlError::NotConnected`] without
//! touching the device while the session is not connected.

pub mod port;

pub use port::OutputPort;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::{Channel, DeviceDescriptor};
use crate::config::{Config, SessionConfig};
use crate::effects::{Effect, EffectScheduler, EffectTarget};
use crate::error::{ConnectError, ControlError, LayoutError, SessionError};
use crate::report::protocol::{
    Color, InputReport, MicLed, OutputState, PlayerLeds, TriggerEffect, TriggerSide,
};
use crate::report::ReportCodec;
use crate::session::{DeviceSession, Notification, ReadStatus, SessionState};

/// DualSense controller facade
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "hid")]
/// # fn main() -> anyhow::Result<()> {
/// use dualsense_link::channel::hid::HidChannel;
/// use dualsense_link::config::Config;
/// use dualsense_link::controller::Controller;
/// use dualsense_link::report::protocol::Color;
///
/// let config = Config::default();
/// let mut controller = Controller::new(HidChannel::new()?, &config)?;
/// controller.connect_first()?;
/// controller.set_lightbar(Color::new(0, 0, 255))?;
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "hid"))]
/// # fn main() {}
/// ```
pub struct Controller<C: Channel> {
    session: DeviceSession<C>,
    output: OutputState,
    scheduler: EffectScheduler,
    config: SessionConfig,
    since_reconnect: Duration,
}

impl<C: Channel> std::fmt::Debug for Controller<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("session", &self.session)
            .field("output", &self.output)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<C: Channel> Controller<C> {
    /// Create a disconnected controller using the configured report layout
    ///
    /// # Errors
    ///
    /// Returns `LayoutError` if the configured tables are invalid
    pub fn new(channel: C, config: &Config) -> Result<Self, LayoutError> {
        let codec = config.layout.codec()?;
        Ok(Self::with_codec(channel, codec, &config.session))
    }

    /// Create a disconnected controller with an explicit codec
    pub fn with_codec(channel: C, codec: ReportCodec, config: &SessionConfig) -> Self {
        Self {
            session: DeviceSession::new(channel, codec, config),
            output: OutputState::default(),
            scheduler: EffectScheduler::new(),
            config: config.clone(),
            since_reconnect: Duration::ZERO,
        }
    }

    fn port(&mut self) -> OutputPort<'_, C> {
        OutputPort::new(&mut self.session, &mut self.output)
    }

    fn require_connected(&self) -> Result<(), ControlError> {
        if self.session.is_connected() {
            Ok(())
        } else {
            Err(ControlError::NotConnected)
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn session(&self) -> &DeviceSession<C> {
        &self.session
    }

    pub fn scheduler(&self) -> &EffectScheduler {
        &self.scheduler
    }

    /// Last decoded input report
    pub fn input(&self) -> Option<&InputReport> {
        self.session.last_report()
    }

    /// Output state last accepted by the device
    pub fn output(&self) -> &OutputState {
        &self.output
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.session.drain_notifications()
    }

    /// Connect to the first controller found and light its player LED
    ///
    /// The initial output state lights LED `1 << player_id`. A failure to
    /// write it is logged; the connection itself stands.
    pub fn connect_first(&mut self) -> Result<(), ConnectError> {
        self.session.connect_first()?;
        self.send_initial_state();
        Ok(())
    }

    /// Connect to a specific controller
    pub fn connect(&mut self, device: &DeviceDescriptor) -> Result<(), ConnectError> {
        self.session.connect(device)?;
        self.send_initial_state();
        Ok(())
    }

    fn send_initial_state(&mut self) {
        let initial = OutputState {
            player_leds: PlayerLeds::for_player(self.config.player_id),
            ..OutputState::default()
        };
        if let Err(e) = self.port().apply(initial) {
            warn!("Failed to write initial output state: {}", e);
        }
    }

    /// Reopen the last device and resend the cached output state
    ///
    /// Succeeds immediately when already connected.
    pub fn reconnect(&mut self) -> Result<(), ConnectError> {
        if self.session.is_connected() {
            return Ok(());
        }
        self.session.reconnect()?;
        info!("Controller reconnected, restoring output state");
        let cached = self.output;
        if let Err(e) = self.session.write(&cached) {
            warn!("Failed to restore output state: {}", e);
        }
        Ok(())
    }

    /// End all effects and release the device
    pub fn close(&mut self) {
        let mut port = OutputPort::new(&mut self.session, &mut self.output);
        self.scheduler.clear(&mut port);
        self.session.close();
    }

    /// Read one report, waiting up to the configured read timeout
    pub fn read_blocking(&mut self) -> Result<ReadStatus, SessionError> {
        let timeout = self.config.read_timeout();
        self.session.read_blocking(timeout)
    }

    /// Set both rumble motors
    pub fn set_rumble(&mut self, low: u8, high: u8) -> Result<(), ControlError> {
        self.port().set_rumble(low, high)
    }

    pub fn set_lightbar(&mut self, color: Color) -> Result<(), ControlError> {
        self.port().set_lightbar(color)
    }

    /// Program one adaptive trigger
    ///
    /// Build `effect` with one of the `TriggerEffect` factories.
    pub fn set_trigger_effect(
        &mut self,
        side: TriggerSide,
        effect: TriggerEffect,
    ) -> Result<(), ControlError> {
        self.port().set_trigger_effect(side, effect)
    }

    pub fn set_player_leds(&mut self, leds: PlayerLeds) -> Result<(), ControlError> {
        let mut state = self.output;
        state.player_leds = leds;
        self.port().apply(state)
    }

    pub fn set_mic_led(&mut self, mode: MicLed) -> Result<(), ControlError> {
        let mut state = self.output;
        state.mic_led = mode;
        self.port().apply(state)
    }

    pub fn set_rumble_strength(&mut self, strength: u8) -> Result<(), ControlError> {
        let mut state = self.output;
        state.rumble_strength = strength;
        self.port().apply(state)
    }

    pub fn set_leds_disabled(&mut self, disabled: bool) -> Result<(), ControlError> {
        let mut state = self.output;
        state.disable_leds = disabled;
        self.port().apply(state)
    }

    /// Replace the whole output state
    pub fn set_output_state(&mut self, state: OutputState) -> Result<(), ControlError> {
        self.port().apply(state)
    }

    /// Queue an effect; it starts once earlier effects have finished
    pub fn add_effect(&mut self, effect: Box<dyn Effect>) -> Result<(), ControlError> {
        self.require_connected()?;
        self.scheduler.enqueue(effect);
        Ok(())
    }

    /// End the active effect and drop all pending ones
    pub fn clear_effects(&mut self) -> Result<(), ControlError> {
        self.require_connected()?;
        let mut port = OutputPort::new(&mut self.session, &mut self.output);
        self.scheduler.clear(&mut port);
        Ok(())
    }

    /// End only the active effect
    pub fn stop_current_effect(&mut self) -> Result<(), ControlError> {
        self.require_connected()?;
        let mut port = OutputPort::new(&mut self.session, &mut self.output);
        self.scheduler.stop_current(&mut port);
        Ok(())
    }

    /// Advance the controller by one host tick
    ///
    /// While connected, keeps an asynchronous read outstanding and collects
    /// it. While disconnected with a known device and auto-reconnect on,
    /// retries every reconnect interval.
    ///
    /// The effect scheduler only advances on ticks that start and finish
    /// connected. An effect is paused across an outage, so its end step
    /// always reaches the device and the state resent on reconnect is the
    /// one the still-active effect owns.
    ///
    /// # Returns
    ///
    /// * `Option<InputReport>` - the report that arrived during this tick
    pub fn tick(&mut self, elapsed: Duration) -> Option<InputReport> {
        if !self.session.is_connected() {
            self.try_auto_reconnect(elapsed);
            return None;
        }

        let report = self.poll_input();
        if self.session.is_connected() {
            let mut port = OutputPort::new(&mut self.session, &mut self.output);
            self.scheduler.tick(&mut port, elapsed);
        }
        report
    }

    fn poll_input(&mut self) -> Option<InputReport> {
        if !self.session.read_pending() {
            if let Err(e) = self.session.read_async_start() {
                debug!("Read request failed: {}", e);
                return None;
            }
        }
        match self.session.read_async_poll() {
            Ok(ReadStatus::Report(report)) => Some(report),
            Ok(ReadStatus::Pending) => None,
            Err(e) => {
                debug!("Read failed: {}", e);
                None
            }
        }
    }

    fn try_auto_reconnect(&mut self, elapsed: Duration) {
        if !self.config.auto_reconnect || self.session.device().is_none() {
            return;
        }
        self.since_reconnect += elapsed;
        if self.since_reconnect < self.config.reconnect_interval() {
            return;
        }
        self.since_reconnect = Duration::ZERO;
        if let Err(e) = self.reconnect() {
            debug!("Auto-reconnect failed: {}", e);
        }
    }
}
