//! RTU-over-TCP client handler
//!
//! Pairs an [`RtuPackager`] with a [`TcpRtuTransport`] so callers get frame
//! encoding and the stream exchange from one value.

use crate::error::{ExceptionCode, Result, TransportError};
use crate::frame;
use crate::logger::SharedSink;
use crate::packager::{Packager, Pdu, RtuPackager};
use crate::stream::{Connector, TcpConnector};
use crate::transport::{TcpRtuTransport, Transporter};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Client handler for one RTU-over-TCP peer
#[derive(Debug)]
pub struct TcpRtuClientHandler<C: Connector = TcpConnector> {
    packager: RtuPackager,
    transport: TcpRtuTransport<C>,
}

impl TcpRtuClientHandler<TcpConnector> {
    /// Create a handler for `address` talking to slave 1
    pub fn new(address: impl Into<String>) -> Self {
        Self::from_parts(RtuPackager::default(), TcpRtuTransport::new(address))
    }
}

impl<C: Connector> TcpRtuClientHandler<C> {
    pub fn from_parts(packager: RtuPackager, transport: TcpRtuTransport<C>) -> Self {
        Self {
            packager,
            transport,
        }
    }

    pub fn with_slave_id(mut self, slave_id: u8) -> Self {
        self.packager.slave_id = slave_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    pub fn with_logger(mut self, sink: SharedSink) -> Self {
        self.transport = self.transport.with_logger(sink);
        self
    }

    pub fn packager(&self) -> &RtuPackager {
        &self.packager
    }

    pub fn transport(&self) -> &TcpRtuTransport<C> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TcpRtuTransport<C> {
        &mut self.transport
    }

    pub fn slave_id(&self) -> u8 {
        self.packager.slave_id
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub async fn flush(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.transport.flush(buf).await
    }

    /// Send one PDU and return the reply PDU
    ///
    /// Exception replies become [`TransportError::Exception`].
    pub async fn execute(&mut self, request: &Pdu) -> Result<Pdu> {
        let request_adu = self.packager.encode(request)?;
        let response_adu = self.transport.send(&request_adu).await?;

        self.packager.verify(&request_adu, &response_adu)?;
        let response = self.packager.decode(&response_adu)?;

        if response.function != request.function {
            debug!(
                "Slave {} replied {:#04x} to {:#04x}",
                self.packager.slave_id, response.function, request.function
            );
            return Err(response_error(request.function, &response));
        }
        if response.data.is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        Ok(response)
    }
}

/// Map a reply with a mismatched function code to an error
fn response_error(function: u8, response: &Pdu) -> TransportError {
    match response.data.first() {
        Some(&code) if response.function == frame::exception_function(function) => {
            TransportError::Exception {
                function,
                code: ExceptionCode::from(code),
            }
        },
        _ => TransportError::InvalidResponse(format!(
            "function {:#04x} does not match request {:#04x}",
            response.function, function
        )),
    }
}

impl<C: Connector> Packager for TcpRtuClientHandler<C> {
    fn encode(&self, pdu: &Pdu) -> Result<Vec<u8>> {
        self.packager.encode(pdu)
    }

    fn decode(&self, adu: &[u8]) -> Result<Pdu> {
        self.packager.decode(adu)
    }

    fn verify(&self, request: &[u8], response: &[u8]) -> Result<()> {
        self.packager.verify(request, response)
    }
}

#[async_trait]
impl<C: Connector> Transporter for TcpRtuClientHandler<C> {
    async fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.transport.send(request).await
    }
}
