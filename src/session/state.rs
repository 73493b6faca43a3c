//! Session states, notifications and read outcomes

use std::fmt;

use crate::channel::ConnectionType;
use crate::error::{ConnectError, SessionError};
use crate::report::protocol::InputReport;

/// Lifecycle state of a [`super::DeviceSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Event queued for the host, drained from the owning tick
///
/// `Connected` and `Disconnected` fire exactly once per state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected {
        unique_id: u32,
        connection: ConnectionType,
    },
    Disconnected {
        unique_id: u32,
    },
    ConnectFailed(ConnectError),
    /// Non-fatal I/O failure; the session stays connected
    IoFailed(SessionError),
}

/// Outcome of a successful read call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A new report arrived
    Report(InputReport),
    /// No new data yet
    Pending,
}

impl ReadStatus {
    pub fn report(self) -> Option<InputReport> {
        match self {
            ReadStatus::Report(report) => Some(report),
            ReadStatus::Pending => None,
        }
    }
}
