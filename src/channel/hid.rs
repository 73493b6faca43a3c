//! # HID Channel
//!
//! [`Channel`] implementation over `hidapi`.
//!
//! ## Controller Detection
//!
//! - Vendor ID: 0x054C (Sony)
//! - Product ID: 0x0CE6 (DualSense), 0x0DF2 (DualSense Edge)
//! - Interface number -1 means the device is attached over Bluetooth
//!
//! Bluetooth output reports are sealed with their CRC here, and Bluetooth
//! input reports with a bad CRC are rejected as transport errors.

use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::time::Duration;

use hidapi::{HidApi, HidDevice, HidError};
use tracing::{debug, info, trace};

use super::{device_id, Channel, ConnectionType, DeviceDescriptor, Handle};
use crate::error::ChannelError;
use crate::report::crc;
use crate::report::protocol::BT_INPUT_REPORT_ID;

/// Sony vendor ID
pub const SONY_VENDOR_ID: u16 = 0x054C;

/// DualSense product ID
pub const DUALSENSE_PRODUCT_ID: u16 = 0x0CE6;

/// DualSense Edge product ID
pub const DUALSENSE_EDGE_PRODUCT_ID: u16 = 0x0DF2;

/// Format identifiers matching the USB and Bluetooth input layouts
pub const USB_FORMAT: &str = "DS5U";
pub const BT_FORMAT: &str = "DS5B";

/// Largest input report we ever expect (Bluetooth full report)
const READ_BUFFER_SIZE: usize = 78;

struct OpenDevice {
    device: HidDevice,
    connection: ConnectionType,
}

/// hidapi-backed channel
pub struct HidChannel {
    api: HidApi,
    devices: HashMap<u64, OpenDevice>,
    pending: HashSet<u64>,
    next_handle: u64,
}

impl std::fmt::Debug for HidChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidChannel")
            .field("open_devices", &self.devices.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

fn map_hid_error(error: &HidError) -> ChannelError {
    match error {
        // hidapi reports a vanished device as a generic API error
        HidError::HidApiError { message } => {
            debug!("hidapi error: {}", message);
            ChannelError::DeviceRemoved
        }
        HidError::InvalidZeroSizeData | HidError::IncompleteSendError { .. } => {
            ChannelError::InvalidArgs
        }
        HidError::HidApiErrorEmpty => ChannelError::DeviceRemoved,
        HidError::InitializationError => ChannelError::ExternalApi,
        _ => ChannelError::IoFailed,
    }
}

impl HidChannel {
    /// Initialise hidapi
    ///
    /// # Errors
    ///
    /// Returns `ExternalApi` if the HID library cannot be initialised
    pub fn new() -> Result<Self, ChannelError> {
        let api = HidApi::new().map_err(|e| {
            debug!("Failed to initialise hidapi: {}", e);
            ChannelError::ExternalApi
        })?;
        Ok(Self {
            api,
            devices: HashMap::new(),
            pending: HashSet::new(),
            next_handle: 0,
        })
    }

    fn device(&self, handle: Handle) -> Result<&OpenDevice, ChannelError> {
        self.devices.get(&handle.0).ok_or(ChannelError::InvalidArgs)
    }

    /// Read with a millisecond timeout; `Ok(None)` when nothing arrived
    fn read_report(&self, handle: Handle, timeout: Duration) -> Result<Option<Vec<u8>>, ChannelError> {
        let open = self.device(handle)?;
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let len = open
            .device
            .read_timeout(&mut buf, timeout_ms)
            .map_err(|e| map_hid_error(&e))?;
        if len == 0 {
            return Ok(None);
        }

        let report = &buf[..len];
        if open.connection == ConnectionType::Bluetooth
            && report[0] == BT_INPUT_REPORT_ID
            && len == READ_BUFFER_SIZE
            && !crc::verify_input(report)
        {
            trace!("Dropping Bluetooth report with bad CRC");
            return Err(ChannelError::Transport);
        }
        Ok(Some(report.to_vec()))
    }
}

impl Channel for HidChannel {
    fn enumerate(&mut self, capacity: usize) -> Result<Vec<DeviceDescriptor>, ChannelError> {
        self.api.refresh_devices().map_err(|e| map_hid_error(&e))?;

        let found: Vec<DeviceDescriptor> = self
            .api
            .device_list()
            .filter(|d| {
                d.vendor_id() == SONY_VENDOR_ID
                    && (d.product_id() == DUALSENSE_PRODUCT_ID
                        || d.product_id() == DUALSENSE_EDGE_PRODUCT_ID)
            })
            .map(|d| {
                let path = d.path().to_string_lossy().into_owned();
                let connection = if d.interface_number() == -1 {
                    ConnectionType::Bluetooth
                } else {
                    ConnectionType::Usb
                };
                let format = match connection {
                    ConnectionType::Usb => USB_FORMAT,
                    ConnectionType::Bluetooth => BT_FORMAT,
                };
                DeviceDescriptor {
                    unique_id: device_id(d.serial_number().unwrap_or(&path)),
                    path,
                    connection,
                    report_format: format.to_string(),
                }
            })
            .collect();

        if found.len() > capacity {
            return Err(ChannelError::BufferTooSmall {
                required: found.len(),
            });
        }
        debug!("Enumerated {} DualSense device(s)", found.len());
        Ok(found)
    }

    fn open(&mut self, device: &DeviceDescriptor) -> Result<Handle, ChannelError> {
        let path = CString::new(device.path.as_str()).map_err(|_| ChannelError::InvalidArgs)?;
        let hid = self.api.open_path(&path).map_err(|e| {
            debug!("Failed to open {}: {}", device.path, e);
            ChannelError::NotFound
        })?;

        self.next_handle += 1;
        let handle = Handle(self.next_handle);
        self.devices.insert(
            handle.0,
            OpenDevice {
                device: hid,
                connection: device.connection,
            },
        );
        info!("Opened {} controller at {}", device.connection, device.path);
        Ok(handle)
    }

    fn close(&mut self, handle: Handle) {
        self.pending.remove(&handle.0);
        if self.devices.remove(&handle.0).is_some() {
            debug!("Closed handle {}", handle.0);
        }
    }

    fn read(&mut self, handle: Handle, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        self.read_report(handle, timeout)?
            .ok_or(ChannelError::IoTimeout)
    }

    fn read_async_start(&mut self, handle: Handle) -> Result<(), ChannelError> {
        self.device(handle)?;
        self.pending.insert(handle.0);
        Ok(())
    }

    fn read_async_poll(&mut self, handle: Handle, wait: Duration) -> Result<Vec<u8>, ChannelError> {
        if !self.pending.contains(&handle.0) {
            return Err(ChannelError::InvalidArgs);
        }
        match self.read_report(handle, wait)? {
            Some(report) => {
                self.pending.remove(&handle.0);
                Ok(report)
            }
            None => Err(ChannelError::IoPending),
        }
    }

    fn write(&mut self, handle: Handle, report: &[u8]) -> Result<(), ChannelError> {
        let open = self.device(handle)?;
        let mut data = report.to_vec();
        if open.connection == ConnectionType::Bluetooth {
            crc::seal_output(&mut data);
        }
        open.device.write(&data).map_err(|e| map_hid_error(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hid_error_mapping() {
        let removed = HidError::HidApiError { message: "No such device".to_string() };
        assert_eq!(map_hid_error(&removed), ChannelError::DeviceRemoved);
        assert_eq!(map_hid_error(&HidError::InvalidZeroSizeData), ChannelError::InvalidArgs);
        assert_eq!(map_hid_error(&HidError::InitializationError), ChannelError::ExternalApi);
    }

    #[test]
    #[ignore] // Requires a DualSense controller to be connected
    fn test_enumerate_real_hardware() {
        let mut channel = HidChannel::new().expect("hidapi should initialise");
        let devices = channel.enumerate(8).expect("enumeration should succeed");
        assert!(!devices.is_empty(), "No DualSense controller found");
    }
}
