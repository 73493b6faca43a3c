//! Scripted in-memory channel for session and controller tests

use super::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Everything the scripted channel has been told and has done
#[derive(Default)]
pub struct ScriptState {
    pub devices: Vec<DeviceDescriptor>,
    /// Overrides device listing, one entry per `enumerate` call
    pub enumerate_script: VecDeque<Result<Vec<DeviceDescriptor>, ChannelError>>,
    pub enumerate_calls: Vec<usize>,
    pub open_error: Option<ChannelError>,
    pub opened: Vec<Handle>,
    pub closed: Vec<Handle>,
    /// Replies for `read` and `read_async_poll`, consumed in order
    pub reads: VecDeque<Result<Vec<u8>, ChannelError>>,
    pub read_calls: usize,
    pub async_starts: usize,
    pub async_polls: usize,
    pub written: Vec<Vec<u8>>,
    pub write_error: Option<ChannelError>,
    pub next_handle: u64,
}

/// Mock channel with shared, inspectable state
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    pub state: Arc<Mutex<ScriptState>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel with a single attached device of the given format
    pub fn with_device(format: &str) -> Self {
        let channel = Self::new();
        channel.add_device(descriptor("/dev/hidraw0", format));
        channel
    }

    pub fn add_device(&self, device: DeviceDescriptor) {
        self.state.lock().unwrap().devices.push(device);
    }

    pub fn push_enumerate(&self, result: Result<Vec<DeviceDescriptor>, ChannelError>) {
        self.state.lock().unwrap().enumerate_script.push_back(result);
    }

    pub fn push_read(&self, result: Result<Vec<u8>, ChannelError>) {
        self.state.lock().unwrap().reads.push_back(result);
    }

    pub fn set_write_error(&self, error: Option<ChannelError>) {
        self.state.lock().unwrap().write_error = error;
    }

    pub fn set_open_error(&self, error: Option<ChannelError>) {
        self.state.lock().unwrap().open_error = error;
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn closed(&self) -> Vec<Handle> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn opened(&self) -> Vec<Handle> {
        self.state.lock().unwrap().opened.clone()
    }
}

/// Descriptor helper for tests
pub fn descriptor(path: &str, format: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        path: path.to_string(),
        connection: ConnectionType::Usb,
        unique_id: device_id(path),
        report_format: format.to_string(),
    }
}

impl Channel for ScriptedChannel {
    fn enumerate(&mut self, capacity: usize) -> Result<Vec<DeviceDescriptor>, ChannelError> {
        let mut state = self.state.lock().unwrap();
        state.enumerate_calls.push(capacity);
        if let Some(result) = state.enumerate_script.pop_front() {
            return result;
        }
        if state.devices.len() > capacity {
            return Err(ChannelError::BufferTooSmall {
                required: state.devices.len(),
            });
        }
        Ok(state.devices.clone())
    }

    fn open(&mut self, _device: &DeviceDescriptor) -> Result<Handle, ChannelError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.open_error {
            return Err(error);
        }
        state.next_handle += 1;
        let handle = Handle(state.next_handle);
        state.opened.push(handle);
        Ok(handle)
    }

    fn close(&mut self, handle: Handle) {
        self.state.lock().unwrap().closed.push(handle);
    }

    fn read(&mut self, _handle: Handle, _timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        let mut state = self.state.lock().unwrap();
        state.read_calls += 1;
        state.reads.pop_front().unwrap_or(Err(ChannelError::IoTimeout))
    }

    fn read_async_start(&mut self, _handle: Handle) -> Result<(), ChannelError> {
        self.state.lock().unwrap().async_starts += 1;
        Ok(())
    }

    fn read_async_poll(&mut self, _handle: Handle, _wait: Duration) -> Result<Vec<u8>, ChannelError> {
        let mut state = self.state.lock().unwrap();
        state.async_polls += 1;
        state.reads.pop_front().unwrap_or(Err(ChannelError::IoPending))
    }

    fn write(&mut self, _handle: Handle, report: &[u8]) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.write_error {
            return Err(error);
        }
        state.written.push(report.to_vec());
        Ok(())
    }
}
