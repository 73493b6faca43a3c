//! # Channel Module
//!
//! Abstract byte transport between a session and a controller.
//!
//! This module handles:
//! - The `Channel` trait the session drives (enumerate, open, read, write, close)
//! - Device descriptors and opaque handles
//! - A hidapi-backed channel for real hardware (`hid` feature)
//!
//! A channel moves whole reports and reports failures as [`ChannelError`];
//! it knows nothing about report contents apart from link-level integrity
//! (the Bluetooth CRC).

#[cfg(feature = "hid")]
pub mod hid;

#[cfg(test)]
pub mod mocks;

use std::fmt;
use std::time::Duration;

use crate::error::ChannelError;

/// Opaque handle to an open device, issued by [`Channel::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u64);

/// Link a controller is attached over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    Usb,
    Bluetooth,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionType::Usb => write!(f, "USB"),
            ConnectionType::Bluetooth => write!(f, "Bluetooth"),
        }
    }
}

/// A controller found by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Transport-specific device path
    pub path: String,
    pub connection: ConnectionType,
    /// Stable identifier for the physical device
    pub unique_id: u32,
    /// Report format negotiated by the transport (e.g. `DS5U`)
    pub report_format: String,
}

/// Byte transport used by [`crate::session::DeviceSession`]
///
/// Implementations may block inside `read` up to the given timeout and
/// inside `read_async_poll` up to the given wait; nothing else may block.
#[cfg_attr(test, mockall::automock)]
pub trait Channel: Send {
    /// List attached controllers
    ///
    /// # Errors
    ///
    /// `BufferTooSmall { required }` when more than `capacity` devices are
    /// attached; the caller retries with a buffer of `required` entries.
    fn enumerate(&mut self, capacity: usize) -> Result<Vec<DeviceDescriptor>, ChannelError>;

    /// Open a device for reading and writing
    fn open(&mut self, device: &DeviceDescriptor) -> Result<Handle, ChannelError>;

    /// Release a handle; the handle is invalid afterwards
    fn close(&mut self, handle: Handle);

    /// Read one report, waiting at most `timeout`
    ///
    /// Returns `IoTimeout` when nothing arrived in time.
    fn read(&mut self, handle: Handle, timeout: Duration) -> Result<Vec<u8>, ChannelError>;

    /// Issue a non-blocking read request, replacing any outstanding one
    fn read_async_start(&mut self, handle: Handle) -> Result<(), ChannelError>;

    /// Collect the outstanding read request, waiting at most `wait`
    ///
    /// Returns `IoPending` (or `IoTimeout`) while the request is still
    /// outstanding; the request stays valid and may be polled again.
    fn read_async_poll(&mut self, handle: Handle, wait: Duration) -> Result<Vec<u8>, ChannelError>;

    /// Write one output report
    fn write(&mut self, handle: Handle, report: &[u8]) -> Result<(), ChannelError>;
}

/// FNV-1a hash of a device path, used as a stable device identifier
pub fn device_id(path: &str) -> u32 {
    path.bytes().fold(0x811C_9DC5u32, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(0x0100_0193)
    })
}
