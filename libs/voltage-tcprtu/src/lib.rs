//! VoltageEMS Modbus RTU-over-TCP Transport
//!
//! Serial gateways and some RTUs speak plain RTU frames over a TCP socket,
//! without the MBAP header. This library frames those exchanges:
//! - Response length prediction per function code
//! - Exception replies (function | 0x80, fixed 5 bytes)
//! - One shared deadline for write and read
//! - Per-call or persistent sessions
//!
//! # Architecture
//!
//! ```text
//! voltage-tcprtu
//!     ├── TcpRtuClientHandler (packager + transport)
//!     │       ├── RtuPackager (unit id + CRC-16)
//!     │       └── TcpRtuTransport (connection + framing)
//!     │               └── Connector (TCP or any async byte stream)
//!     └── frame (length table, constants)
//! ```

pub mod config;
pub mod error;
pub mod frame;
pub mod handler;
pub mod logger;
pub mod packager;
pub mod stream;
pub mod transport;

pub use config::{TransportConfig, DEFAULT_TIMEOUT_MS};
pub use error::{ExceptionCode, Phase, Result, TransportError};
pub use frame::{
    calculate_response_length, RTU_EXCEPTION_SIZE, RTU_MAX_SIZE, RTU_MIN_SIZE, TCP_MAX_LENGTH,
};
pub use handler::TcpRtuClientHandler;
pub use logger::{FrameSink, SharedSink, TracingSink};
pub use packager::{crc16, Packager, Pdu, RtuPackager};
pub use stream::{Connector, TcpConnector};
pub use transport::{TcpRtuTransport, Transporter};
