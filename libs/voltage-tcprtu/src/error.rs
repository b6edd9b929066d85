//! Transport Error Types
//!
//! Error kinds raised by the RTU-over-TCP transport, packager and handler.

use std::fmt;
use thiserror::Error;

/// Result type for voltage-tcprtu operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Exchange phase in which a deadline expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Write,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Connect => write!(f, "connect"),
            Phase::Write => write!(f, "write"),
            Phase::Read => write!(f, "read"),
        }
    }
}

/// Transport errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// Dial failed (refused, DNS, unreachable)
    #[error("Connection error: {address}: {reason}")]
    Connect { address: String, reason: String },

    /// Stream write failed
    #[error("Write error: {0}")]
    Write(String),

    /// Stream ended before the minimum header arrived
    #[error("Short read: expected at least {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// Stream read failed while extending a frame
    #[error("Read error: {0}")]
    Read(String),

    /// Exchange deadline exceeded
    #[error("Timeout: {phase} deadline exceeded after {elapsed_ms}ms")]
    Timeout { phase: Phase, elapsed_ms: u64 },

    /// Stream shutdown failed
    #[error("Close error: {0}")]
    Close(String),

    /// Peer closed the stream
    #[error("Connection closed by peer")]
    Closed,

    /// Operation requires a held connection
    #[error("Not connected")]
    NotConnected,

    /// Request frame cannot carry a function code
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// ADU exceeds the RTU maximum
    #[error("Frame too large: {length} bytes exceeds {max}")]
    FrameTooLarge { length: usize, max: usize },

    /// Response CRC does not match its payload
    #[error("CRC mismatch: frame carries {actual:#06x}, computed {expected:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    /// Response did not come from the addressed slave
    #[error("Slave mismatch: request {request}, response {response}")]
    SlaveMismatch { request: u8, response: u8 },

    /// Response frame is structurally invalid
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Peer answered with a Modbus exception
    #[error("Modbus exception: function {function:#04x}, {code}")]
    Exception { function: u8, code: ExceptionCode },

    /// Response carried no data
    #[error("Empty response data")]
    EmptyResponse,
}

impl TransportError {
    pub fn connect(address: impl Into<String>, reason: impl fmt::Display) -> Self {
        TransportError::Connect {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(err: impl fmt::Display) -> Self {
        TransportError::Write(err.to_string())
    }

    pub fn read(err: impl fmt::Display) -> Self {
        TransportError::Read(err.to_string())
    }

    pub fn close(err: impl fmt::Display) -> Self {
        TransportError::Close(err.to_string())
    }

    pub fn timeout(phase: Phase, elapsed: std::time::Duration) -> Self {
        TransportError::Timeout {
            phase,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Check if this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// Check if the connection should be dropped rather than reused
    pub fn needs_reconnect(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. }
                | TransportError::Write(_)
                | TransportError::ShortRead { .. }
                | TransportError::Read(_)
                | TransportError::Timeout { .. }
                | TransportError::Closed
                | TransportError::NotConnected
        )
    }
}

/// Modbus exception codes carried in an exception response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetDeviceFailedToRespond,
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::ServerDeviceBusy,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetDeviceFailedToRespond,
            other => ExceptionCode::Unknown(other),
        }
    }
}

impl ExceptionCode {
    /// Raw exception code byte
    pub fn code(&self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::ServerDeviceBusy => 0x06,
            ExceptionCode::MemoryParityError => 0x08,
            ExceptionCode::GatewayPathUnavailable => 0x0A,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => 0x0B,
            ExceptionCode::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExceptionCode::IllegalFunction => "illegal function",
            ExceptionCode::IllegalDataAddress => "illegal data address",
            ExceptionCode::IllegalDataValue => "illegal data value",
            ExceptionCode::ServerDeviceFailure => "server device failure",
            ExceptionCode::Acknowledge => "acknowledge",
            ExceptionCode::ServerDeviceBusy => "server device busy",
            ExceptionCode::MemoryParityError => "memory parity error",
            ExceptionCode::GatewayPathUnavailable => "gateway path unavailable",
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                "gateway target device failed to respond"
            },
            ExceptionCode::Unknown(_) => "unknown",
        };
        write!(f, "exception {:#04x} ({})", self.code(), name)
    }
}
