//! Error types for the ADS client.

use macon_sync_engine::{DeviceError, ValueType};
use thiserror::Error;

/// Result type for ADS operations.
pub type AdsResult<T> = Result<T, AdsError>;

/// ADS return code: symbol not found.
pub const ADSERR_SYMBOL_NOT_FOUND: u32 = 0x0710;

/// Errors raised by the ADS client.
#[derive(Error, Debug)]
pub enum AdsError {
    /// No open session, or the session is in its reconnect backoff window.
    #[error("not connected")]
    NotConnected,

    /// Socket error, including read timeouts.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with a non-zero return code.
    #[error("ads error {code:#06x}: {message}")]
    Status {
        /// ADS return code.
        code: u32,
        /// Description of the code.
        message: &'static str,
    },

    /// Malformed frame or unexpected response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An AMS net id did not parse.
    #[error("invalid AMS net id: {0:?}")]
    InvalidNetId(String),

    /// A value does not fit the variable's type.
    #[error("type mismatch for {symbol}: expected {expected}, got {found}")]
    TypeMismatch {
        /// Symbol being read or written.
        symbol: String,
        /// Declared type.
        expected: ValueType,
        /// What was found instead.
        found: String,
    },
}

impl AdsError {
    /// Creates a status error from an ADS return code.
    pub fn status(code: u32) -> Self {
        Self::Status {
            code,
            message: describe(code),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns true if the session can no longer be used.
    ///
    /// A protocol error means the byte stream may be out of step with the
    /// device, so it also ends the session.
    pub fn breaks_session(&self) -> bool {
        matches!(self, AdsError::Io(_) | AdsError::Protocol(_))
    }

    /// Returns true if a cached symbol handle may be stale.
    pub fn is_stale_handle(&self) -> bool {
        matches!(
            self,
            AdsError::Status {
                code: 0x0702 | 0x0703 | 0x0710 | 0x0711,
                ..
            }
        )
    }

    /// Converts to a device error, naming `symbol` where it helps.
    pub fn into_device_error(self, symbol: &str) -> DeviceError {
        match self {
            AdsError::Status {
                code: ADSERR_SYMBOL_NOT_FOUND,
                ..
            } => DeviceError::SymbolNotFound(symbol.to_string()),
            other => other.into(),
        }
    }
}

impl From<AdsError> for DeviceError {
    fn from(error: AdsError) -> Self {
        match error {
            AdsError::NotConnected => DeviceError::NotConnected,
            AdsError::Io(e) => DeviceError::Io(e),
            AdsError::Status { code, message } => DeviceError::status(code, message),
            AdsError::Protocol(message) => DeviceError::ConnectionLost(message),
            AdsError::InvalidNetId(input) => {
                DeviceError::Protocol(format!("invalid AMS net id: {input}"))
            }
            AdsError::TypeMismatch {
                symbol,
                expected,
                found,
            } => DeviceError::type_mismatch(&symbol, expected, found),
        }
    }
}

/// Short description of an ADS return code.
pub fn describe(code: u32) -> &'static str {
    match code {
        0x0006 => "target port not found",
        0x0007 => "target machine not found",
        0x0700 => "general device error",
        0x0701 => "service not supported",
        0x0702 => "invalid index group",
        0x0703 => "invalid index offset",
        0x0704 => "reading or writing not permitted",
        0x0705 => "parameter size not correct",
        0x0706 => "invalid parameter value",
        0x0707 => "device not ready",
        0x0708 => "device busy",
        0x070A => "out of memory",
        0x0710 => "symbol not found",
        0x0711 => "symbol version invalid",
        0x0712 => "server in invalid state",
        0x0745 => "timeout",
        _ => "unknown error",
    }
}
