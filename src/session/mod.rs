//! # Device Session Module
//!
//! Connection state machine around one controller.
//!
//! This module handles:
//! - Two-pass enumeration (capacity probe, then a single right-sized retry)
//! - Connecting to a device whose report format matches the codec
//! - Blocking reads and the two-phase asynchronous read (start, then poll)
//! - Writing encoded output reports
//! - Device removal, reconnection and handle release
//!
//! ```text
//! Disconnected --connect--> Connecting --open ok--> Connected
//! Connected --device removed--> Disconnected
//! Disconnected --reconnect--> Reconnecting --open ok--> Connected
//! ```
//!
//! Connect and disconnect notifications are queued once per transition and
//! drained by the owner with [`DeviceSession::drain_notifications`]. The
//! queue holds at most [`MAX_PENDING_NOTIFICATIONS`] entries; the oldest are
//! dropped when an owner stops draining.

mod state;

pub use state::{Notification, ReadStatus, SessionState};

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::channel::{Channel, DeviceDescriptor, Handle};
use crate::config::SessionConfig;
use crate::error::{ChannelError, ConnectError, SessionError};
use crate::report::protocol::{InputReport, OutputState};
use crate::report::ReportCodec;

/// Notifications kept before the oldest is dropped
pub const MAX_PENDING_NOTIFICATIONS: usize = 64;

/// Session over one controller, owning the channel handle
pub struct DeviceSession<C: Channel> {
    channel: C,
    codec: ReportCodec,
    state: SessionState,
    handle: Option<Handle>,
    device: Option<DeviceDescriptor>,
    async_pending: bool,
    last_report: Option<InputReport>,
    last_raw: Option<Vec<u8>>,
    last_timestamp: Option<u32>,
    notifications: VecDeque<Notification>,
    poll_wait: Duration,
    enumerate_capacity: usize,
}

impl<C: Channel> std::fmt::Debug for DeviceSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("device", &self.device)
            .field("async_pending", &self.async_pending)
            .finish_non_exhaustive()
    }
}

impl<C: Channel> DeviceSession<C> {
    /// Create a disconnected session
    pub fn new(channel: C, codec: ReportCodec, config: &SessionConfig) -> Self {
        Self {
            channel,
            codec,
            state: SessionState::Disconnected,
            handle: None,
            device: None,
            async_pending: false,
            last_report: None,
            last_raw: None,
            last_timestamp: None,
            notifications: VecDeque::new(),
            poll_wait: config.async_poll_wait(),
            enumerate_capacity: config.enumerate_capacity.max(1),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Device of the current or most recent connection
    pub fn device(&self) -> Option<&DeviceDescriptor> {
        self.device.as_ref()
    }

    /// Last successfully decoded report
    pub fn last_report(&self) -> Option<&InputReport> {
        self.last_report.as_ref()
    }

    /// Raw bytes of the last successfully decoded report
    pub fn last_raw(&self) -> Option<&[u8]> {
        self.last_raw.as_deref()
    }

    pub fn codec(&self) -> &ReportCodec {
        &self.codec
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Take every queued notification, oldest first
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// List attached controllers
    ///
    /// Probes with the configured capacity. When the channel answers
    /// `BufferTooSmall`, retries exactly once with the size it asked for.
    ///
    /// # Errors
    ///
    /// * `ConnectError::BufferTooSmall` - still undersized after the retry
    /// * `ConnectError::Channel` - any other transport failure
    pub fn enumerate(&mut self) -> Result<Vec<DeviceDescriptor>, ConnectError> {
        let capacity = self.enumerate_capacity;
        match self.channel.enumerate(capacity) {
            Ok(devices) => Ok(devices),
            Err(ChannelError::BufferTooSmall { required }) => {
                let retry = required.max(capacity + 1);
                debug!("Enumeration needs {} entries, retrying once", retry);
                match self.channel.enumerate(retry) {
                    Ok(devices) => Ok(devices),
                    Err(ChannelError::BufferTooSmall { required }) => {
                        Err(ConnectError::BufferTooSmall {
                            capacity: retry,
                            required,
                        })
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a device and enter `Connected`
    ///
    /// # Errors
    ///
    /// * `AlreadyConnected` - the session already holds a device
    /// * `FormatMismatch` - the device's report format is not the codec's
    /// * `Channel` - the device could not be opened
    ///
    /// Every failure except `AlreadyConnected` is also queued as a
    /// [`Notification::ConnectFailed`].
    pub fn connect(&mut self, device: &DeviceDescriptor) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Err(ConnectError::AlreadyConnected);
        }

        self.state = SessionState::Connecting;
        let result = self.open(device);
        if let Err(e) = &result {
            self.state = SessionState::Disconnected;
            self.connect_failed(e.clone());
        }
        result
    }

    /// Enumerate and connect to the first controller found
    pub fn connect_first(&mut self) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Err(ConnectError::AlreadyConnected);
        }

        let devices = match self.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                self.connect_failed(e.clone());
                return Err(e);
            }
        };
        match devices.first() {
            Some(device) => self.connect(device),
            None => {
                self.connect_failed(ConnectError::NoDevices);
                Err(ConnectError::NoDevices)
            }
        }
    }

    /// Reopen the most recently connected device
    ///
    /// Succeeds immediately when already connected.
    pub fn reconnect(&mut self) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Ok(());
        }

        let Some(device) = self.device.clone() else {
            self.connect_failed(ConnectError::NoPreviousDevice);
            return Err(ConnectError::NoPreviousDevice);
        };

        self.state = SessionState::Reconnecting;
        debug!("Reconnecting to {}", device.path);
        let result = self.open(&device);
        if let Err(e) = &result {
            self.state = SessionState::Disconnected;
            self.connect_failed(e.clone());
        }
        result
    }

    fn open(&mut self, device: &DeviceDescriptor) -> Result<(), ConnectError> {
        if device.report_format != self.codec.format_id() {
            return Err(ConnectError::FormatMismatch {
                expected: self.codec.format_id().to_string(),
                found: device.report_format.clone(),
            });
        }

        let handle = self.channel.open(device)?;
        self.handle = Some(handle);
        self.device = Some(device.clone());
        self.state = SessionState::Connected;
        self.async_pending = false;
        self.last_timestamp = None;

        info!(
            "Controller {:08X} connected via {}",
            device.unique_id, device.connection
        );
        self.notify(Notification::Connected {
            unique_id: device.unique_id,
            connection: device.connection,
        });
        Ok(())
    }

    fn notify(&mut self, notification: Notification) {
        if self.notifications.len() >= MAX_PENDING_NOTIFICATIONS {
            trace!("Notification queue full, dropping oldest");
            self.notifications.pop_front();
        }
        self.notifications.push_back(notification);
    }

    fn connect_failed(&mut self, error: ConnectError) {
        warn!("Connect failed: {}", error);
        self.notify(Notification::ConnectFailed(error));
    }

    fn connected_handle(&self) -> Result<Handle, SessionError> {
        match (self.state, self.handle) {
            (SessionState::Connected, Some(handle)) => Ok(handle),
            _ => Err(SessionError::NotConnected),
        }
    }

    /// Read one report, waiting at most `timeout`
    ///
    /// A timeout is not an error: it returns [`ReadStatus::Pending`].
    pub fn read_blocking(&mut self, timeout: Duration) -> Result<ReadStatus, SessionError> {
        let handle = self.connected_handle()?;
        match self.channel.read(handle, timeout) {
            Ok(bytes) => self.accept(bytes).map(ReadStatus::Report),
            Err(ChannelError::IoTimeout) => Ok(ReadStatus::Pending),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Issue an asynchronous read
    ///
    /// Any request still outstanding is abandoned and replaced.
    pub fn read_async_start(&mut self) -> Result<(), SessionError> {
        let handle = self.connected_handle()?;
        if self.async_pending {
            trace!("Abandoning outstanding read request");
        }
        self.async_pending = false;
        match self.channel.read_async_start(handle) {
            Ok(()) => {
                self.async_pending = true;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Collect the outstanding asynchronous read
    ///
    /// Returns `Pending` while the request has not completed; the request
    /// stays valid and can be polled again without re-issuing it.
    ///
    /// # Errors
    ///
    /// * `NoPendingRequest` - no request was started, or it already completed
    /// * `DeviceRemoved` / `Io` - the request failed and was dropped
    /// * `Decode` - the report was malformed and was dropped
    pub fn read_async_poll(&mut self) -> Result<ReadStatus, SessionError> {
        let handle = self.connected_handle()?;
        if !self.async_pending {
            return Err(SessionError::NoPendingRequest);
        }
        match self.channel.read_async_poll(handle, self.poll_wait) {
            Ok(bytes) => {
                self.async_pending = false;
                self.accept(bytes).map(ReadStatus::Report)
            }
            Err(ChannelError::IoPending) | Err(ChannelError::IoTimeout) => Ok(ReadStatus::Pending),
            Err(e) => {
                self.async_pending = false;
                Err(self.fail(e))
            }
        }
    }

    /// Whether an asynchronous read is outstanding
    pub fn read_pending(&self) -> bool {
        self.async_pending
    }

    /// Encode `state` in full and write it
    pub fn write(&mut self, state: &OutputState) -> Result<(), SessionError> {
        let handle = self.connected_handle()?;
        let report = self.codec.encode(state);
        self.channel
            .write(handle, &report)
            .map_err(|e| self.fail(e))
    }

    /// Release the channel handle and forget the device
    pub fn close(&mut self) {
        let was_connected = self.is_connected();
        self.release();
        if was_connected {
            info!("Session closed");
            if let Some(unique_id) = self.device.as_ref().map(|d| d.unique_id) {
                self.notify(Notification::Disconnected { unique_id });
            }
        }
        self.device = None;
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.channel.close(handle);
        }
        self.async_pending = false;
        self.state = SessionState::Disconnected;
    }

    fn accept(&mut self, bytes: Vec<u8>) -> Result<InputReport, SessionError> {
        let mut report = match self.codec.decode(&bytes) {
            Ok(report) => report,
            Err(e) => {
                warn!("Dropping input report: {}", e);
                return Err(SessionError::Decode(e));
            }
        };

        if self.codec.input_layout().delta_time.is_none() {
            report.delta_time = self
                .last_timestamp
                .map(|previous| report.timestamp.wrapping_sub(previous))
                .unwrap_or(0);
        }
        self.last_timestamp = Some(report.timestamp);

        trace!("Input report: buttons=0x{:05X}", report.buttons);
        self.last_report = Some(report);
        self.last_raw = Some(bytes);
        Ok(report)
    }

    fn fail(&mut self, error: ChannelError) -> SessionError {
        let error = SessionError::from(error);
        if error.is_fatal() {
            warn!("Controller removed");
            self.release();
            if let Some(unique_id) = self.device.as_ref().map(|d| d.unique_id) {
                self.notify(Notification::Disconnected { unique_id });
            }
        } else {
            debug!("I/O failure: {}", error);
            self.notify(Notification::IoFailed(error.clone()));
        }
        error
    }
}

impl<C: Channel> Drop for DeviceSession<C> {
    fn drop(&mut self) {
        self.release();
    }
}
