//! # Error Types
//!
//! Custom error types for DualSense Link using `thiserror`.
//!
//! The taxonomy follows the layers of the crate:
//! - [`DecodeError`]: a single malformed input report (always recoverable)
//! - [`LayoutError`]: an offset table that cannot describe a valid report
//! - [`ChannelError`]: the closed status set reported by the transport
//! - [`ConnectError`]: enumeration or open failures
//! - [`SessionError`]: read/write failures on an open session
//! - [`ControlError`]: the status returned by controller operations

use thiserror::Error;

/// Input report decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer is shorter than the fixed report size
    #[error("wrong report size: expected at least {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },

    /// Trigger effect discriminant outside the known set
    #[error("unknown trigger effect discriminant 0x{0:02X}")]
    UnknownTriggerEffect(u8),

    /// A byte holds a value the field cannot represent
    #[error("invalid value {value} for field '{field}'")]
    InvalidField { field: &'static str, value: u8 },
}

/// Offset table validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Field extends past the end of the report
    #[error("field '{field}' ends at byte {end}, past report size {size}")]
    FieldOutOfBounds {
        field: &'static str,
        end: usize,
        size: usize,
    },

    /// Two fields claim the same byte
    #[error("fields '{first}' and '{second}' overlap")]
    Overlap {
        first: &'static str,
        second: &'static str,
    },

    /// Report size of zero or larger than any HID report
    #[error("invalid report size {0}")]
    InvalidSize(usize),

    /// Multi-byte field with an unsupported width
    #[error("field '{field}' cannot be {width} bytes wide")]
    InvalidWidth { field: &'static str, width: usize },
}

/// Transport status codes
///
/// Success is `Ok(..)`, so the enum only names failures. Numeric codes match
/// the values used on the wire by native transports (see [`ChannelError::code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("unknown transport error")]
    Unknown,

    /// Caller buffer too small; `required` is the size to retry with
    #[error("buffer too small, {required} entries required")]
    BufferTooSmall { required: usize },

    #[error("external API call failed")]
    ExternalApi,

    #[error("invalid arguments")]
    InvalidArgs,

    #[error("operation not supported")]
    Unsupported,

    #[error("device removed")]
    DeviceRemoved,

    #[error("transport communication error")]
    Transport,

    #[error("I/O timed out")]
    IoTimeout,

    #[error("I/O failed")]
    IoFailed,

    #[error("device not found")]
    NotFound,

    #[error("I/O pending")]
    IoPending,
}

impl ChannelError {
    /// Convert a numeric transport status into a result
    ///
    /// Code `0` is success. Code `2` carries no length on the wire, so
    /// `required` is reported as zero. Code `4` (legacy stack overflow) and any
    /// unrecognised code map to [`ChannelError::Unknown`].
    pub fn check(code: u32) -> std::result::Result<(), ChannelError> {
        let error = match code {
            0 => return Ok(()),
            2 => ChannelError::BufferTooSmall { required: 0 },
            3 => ChannelError::ExternalApi,
            5 => ChannelError::InvalidArgs,
            6 => ChannelError::Unsupported,
            7 => ChannelError::DeviceRemoved,
            8 => ChannelError::Transport,
            9 => ChannelError::IoTimeout,
            10 => ChannelError::IoFailed,
            11 => ChannelError::NotFound,
            12 => ChannelError::IoPending,
            _ => ChannelError::Unknown,
        };
        Err(error)
    }

    /// Numeric transport status for this error
    pub fn code(self) -> u32 {
        match self {
            ChannelError::Unknown => 1,
            ChannelError::BufferTooSmall { .. } => 2,
            ChannelError::ExternalApi => 3,
            ChannelError::InvalidArgs => 5,
            ChannelError::Unsupported => 6,
            ChannelError::DeviceRemoved => 7,
            ChannelError::Transport => 8,
            ChannelError::IoTimeout => 9,
            ChannelError::IoFailed => 10,
            ChannelError::NotFound => 11,
            ChannelError::IoPending => 12,
        }
    }
}

/// Enumeration and connection errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("no controllers found")]
    NoDevices,

    /// Enumeration still undersized after the single retry
    #[error("enumeration buffer too small after retry (capacity {capacity}, required {required})")]
    BufferTooSmall { capacity: usize, required: usize },

    #[error("report format mismatch: expected '{expected}', device reports '{found}'")]
    FormatMismatch { expected: String, found: String },

    #[error("session already connected")]
    AlreadyConnected,

    #[error("no previously connected device to reconnect to")]
    NoPreviousDevice,

    #[error("transport error: {0}")]
    Channel(#[from] ChannelError),
}

/// Errors on an open session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not connected")]
    NotConnected,

    #[error("device removed")]
    DeviceRemoved,

    /// `read_async_poll` without a preceding `read_async_start`
    #[error("no asynchronous read pending")]
    NoPendingRequest,

    #[error("I/O error: {0}")]
    Io(ChannelError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl SessionError {
    /// Whether the error ended the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::DeviceRemoved)
    }
}

impl From<ChannelError> for SessionError {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::DeviceRemoved => SessionError::DeviceRemoved,
            other => SessionError::Io(other),
        }
    }
}

/// Status of a controller operation that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("controller not connected")]
    NotConnected,

    #[error("session error: {0}")]
    Session(SessionError),
}

impl From<SessionError> for ControlError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::NotConnected => ControlError::NotConnected,
            other => ControlError::Session(other),
        }
    }
}

/// Main error type for DualSense Link
#[derive(Debug, Error)]
pub enum DualSenseError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Offset table errors
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Connection errors
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for DualSense Link
pub type Result<T> = std::result::Result<T, DualSenseError>;
