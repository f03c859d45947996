//! Unified error types for the Smartplant firmware.
//!
//! Each port has its own small `Copy` error enum; all of them convert into
//! [`Error`] so the telemetry cycle and `main` handle failures uniformly.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The persistent settings store failed.
    Storage(StorageError),
    /// The network join did not complete.
    Join(JoinError),
    /// The cloud write was not accepted.
    Push(PushError),
    /// The soil-moisture sample could not be taken.
    Sensor(SensorError),
    /// The BLE provisioning channel could not be brought up.
    Channel(ChannelError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Join(e) => write!(f, "join: {e}"),
            Self::Push(e) => write!(f, "push: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// `begin` has not been called (or failed).
    NotInitialised,
    /// The requested region cannot hold a full settings record.
    CapacityTooSmall { requested: usize, required: usize },
    /// The flash driver returned an error code.
    Io(i32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialised => write!(f, "store not initialised"),
            Self::CapacityTooSmall {
                requested,
                required,
            } => write!(f, "capacity {requested} < record length {required}"),
            Self::Io(code) => write!(f, "flash I/O error ({code})"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Network join errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The stored network identifier is not acceptable to the radio driver.
    InvalidNetworkId,
    /// The stored secret is not acceptable to the radio driver.
    InvalidSecret,
    /// The radio driver rejected configuration or start.
    Driver,
    /// No association within the configured join window.
    TimedOut,
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNetworkId => write!(f, "invalid network id"),
            Self::InvalidSecret => write!(f, "invalid network secret"),
            Self::Driver => write!(f, "WiFi driver error"),
            Self::TimedOut => write!(f, "join timed out"),
        }
    }
}

impl std::error::Error for JoinError {}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Self::Join(e)
    }
}

// ---------------------------------------------------------------------------
// Cloud push errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// Connection, TLS or I/O failure before a response arrived.
    Network,
    /// The service answered with a non-success HTTP status.
    Status(u16),
    /// The record path or URL did not fit its buffer.
    InvalidPath,
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::InvalidPath => write!(f, "invalid record path"),
        }
    }
}

impl std::error::Error for PushError {}

impl From<PushError> for Error {
    fn from(e: PushError) -> Self {
        Self::Push(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Provisioning channel errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Controller or host stack initialisation failed.
    InitFailed(i32),
    /// GATT service registration failed.
    RegisterFailed(i32),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitFailed(code) => write!(f, "BLE init failed ({code})"),
            Self::RegisterFailed(code) => write!(f, "GATT register failed ({code})"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nests_subsystem_prefix() {
        let e: Error = PushError::Status(401).into();
        assert_eq!(e.to_string(), "push: HTTP status 401");
    }

    #[test]
    fn capacity_error_names_both_sizes() {
        let e = StorageError::CapacityTooSmall {
            requested: 64,
            required: 119,
        };
        assert_eq!(e.to_string(), "capacity 64 < record length 119");
    }

    #[test]
    fn join_error_converts() {
        assert_eq!(Error::from(JoinError::TimedOut), Error::Join(JoinError::TimedOut));
    }
}
