//! RTU-over-TCP stream transport
//!
//! Carries raw RTU frames (unit id + PDU + CRC) over a TCP stream. TCP has no
//! message boundaries and RTU has no length header, so the response size is
//! predicted from the request's function code and the echoed function code
//! of the reply.
//!
//! One exchange shares a single deadline across the write and all reads.

use crate::config::{TransportConfig, DEFAULT_TIMEOUT_MS};
use crate::error::{Phase, Result, TransportError};
use crate::frame::{
    self, hex_dump, RTU_EXCEPTION_SIZE, RTU_MAX_SIZE, RTU_MIN_SIZE, TCP_MAX_LENGTH,
};
use crate::logger::{SharedSink, SinkSlot};
use crate::stream::{Connector, TcpConnector};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// Deadline horizon used when `start + timeout` overflows
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Request/response exchange seam
#[async_trait]
pub trait Transporter: Send {
    /// Send one request ADU and return the complete response ADU
    async fn send(&mut self, request: &[u8]) -> Result<Vec<u8>>;
}

/// Modbus RTU-over-TCP transport
///
/// Holds at most one stream. [`send`](Self::send) without a held stream opens
/// one for that call only; after [`connect`](Self::connect) the stream is
/// reused until [`close`](Self::close).
pub struct TcpRtuTransport<C: Connector = TcpConnector> {
    address: String,
    timeout: Duration,
    logger: SinkSlot,
    connector: C,
    stream: Option<C::Stream>,
}

impl TcpRtuTransport<TcpConnector> {
    /// Create a TCP transport for `address` (`host:port`)
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_connector(address, TcpConnector)
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.address.clone()).with_timeout(config.timeout())
    }
}

impl<C: Connector> TcpRtuTransport<C> {
    /// Create a transport that opens streams through `connector`
    pub fn with_connector(address: impl Into<String>, connector: C) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::ZERO,
            logger: SinkSlot(None),
            connector,
            stream: None,
        }
    }

    /// Set connect timeout and exchange deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a frame dump sink
    pub fn with_logger(mut self, sink: SharedSink) -> Self {
        self.logger = SinkSlot(Some(sink));
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Effective timeout; zero until defaulted by the first connect
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check if a stream is held
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Dial the peer, defaulting the timeout on first use
    async fn open_stream(&mut self) -> Result<C::Stream> {
        if self.timeout.is_zero() {
            self.timeout = Duration::from_millis(DEFAULT_TIMEOUT_MS);
        }

        debug!("TCP connecting: {}", self.address);
        match timeout(self.timeout, self.connector.connect(&self.address)).await {
            Ok(Ok(stream)) => {
                info!("TCP connected: {}", self.address);
                Ok(stream)
            },
            Ok(Err(e)) => {
                error!("TCP err: {} - {}", self.address, e);
                Err(TransportError::connect(&self.address, e))
            },
            Err(_) => {
                warn!("TCP timeout: {}", self.address);
                Err(TransportError::timeout(Phase::Connect, self.timeout))
            },
        }
    }

    /// Open a persistent session
    ///
    /// Any held stream is replaced without being checked.
    pub async fn connect(&mut self) -> Result<()> {
        let stream = self.open_stream().await?;
        if self.stream.replace(stream).is_some() {
            debug!("Replaced held connection: {}", self.address);
        }
        Ok(())
    }

    /// Close the held stream, if any
    ///
    /// The stream is released even when shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        let result = stream.shutdown().await;
        drop(stream);
        match result {
            Ok(()) => {
                debug!("Disconnected: {}", self.address);
                Ok(())
            },
            Err(e) => {
                warn!("TCP close: {} - {}", self.address, e);
                Err(TransportError::close(e))
            },
        }
    }

    /// Perform one request/response exchange
    pub async fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        if request.len() < 2 {
            return Err(TransportError::InvalidRequest(format!(
                "request length {} is shorter than 2",
                request.len()
            )));
        }

        if let Some(stream) = self.stream.as_mut() {
            return exchange(stream, request, self.timeout, &self.logger).await;
        }

        // Auto-session: the stream is local so dropping the future releases it
        let mut stream = self.open_stream().await?;
        let result = exchange(&mut stream, request, self.timeout, &self.logger).await;
        if let Err(e) = stream.shutdown().await {
            warn!("TCP close: {} - {}", self.address, e);
        }
        result
    }

    /// Discard bytes already pending on the held stream
    ///
    /// Reads once into `buf` without waiting. Returns the number of bytes
    /// discarded, `0` when nothing was pending.
    pub async fn flush(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let result = timeout(Duration::ZERO, stream.read(buf)).await;
        match result {
            Err(_) => Ok(0),
            Ok(Ok(0)) if !buf.is_empty() => Err(TransportError::Closed),
            Ok(Ok(n)) => {
                debug!("TCP flushed: {}B", n);
                Ok(n)
            },
            Ok(Err(e)) => {
                error!("TCP flush: {}", e);
                Err(TransportError::read(e))
            },
        }
    }
}

#[async_trait]
impl<C: Connector> Transporter for TcpRtuTransport<C> {
    async fn send(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        TcpRtuTransport::send(self, request).await
    }
}

impl<C: Connector> fmt::Debug for TcpRtuTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpRtuTransport")
            .field("address", &self.address)
            .field("timeout", &self.timeout)
            .field("logger", &self.logger)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

/// Write `request` and read back one complete RTU response
async fn exchange<S>(
    stream: &mut S,
    request: &[u8],
    timeout: Duration,
    logger: &SinkSlot,
) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    logger.emit(format_args!("modbus: sending {}", hex_dump(request)));

    let start = Instant::now();
    let deadline = start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE);

    match timeout_at(deadline, stream.write_all(request)).await {
        Ok(Ok(())) => debug!("TCP TX: {}B", request.len()),
        Ok(Err(e)) => {
            error!("TCP TX: {}", e);
            return Err(TransportError::write(e));
        },
        Err(_) => {
            warn!("TCP TX timeout");
            return Err(TransportError::timeout(Phase::Write, start.elapsed()));
        },
    }

    let function = request[1];
    let exception_function = frame::exception_function(function);
    let expected = frame::calculate_response_length(request);

    let mut data = [0u8; TCP_MAX_LENGTH];
    let mut n = read_at_least(stream, &mut data, RTU_MIN_SIZE, deadline, start).await?;

    let target = if data[1] == function {
        (n < expected && expected > RTU_MIN_SIZE && expected <= RTU_MAX_SIZE).then_some(expected)
    } else if data[1] == exception_function {
        (n < RTU_EXCEPTION_SIZE).then_some(RTU_EXCEPTION_SIZE)
    } else {
        // Unrecognized echo: hand back what arrived, the caller validates
        debug!(
            "TCP RX unexpected function {:#04x} (sent {:#04x}), {}B",
            data[1], function, n
        );
        None
    };

    if let Some(target) = target {
        match timeout_at(deadline, stream.read_exact(&mut data[n..target])).await {
            Ok(Ok(_)) => n = target,
            Ok(Err(e)) => {
                error!("TCP RX: {}", e);
                return Err(TransportError::read(e));
            },
            Err(_) => {
                warn!("TCP RX timeout: {}/{}B", n, target);
                return Err(TransportError::timeout(Phase::Read, start.elapsed()));
            },
        }
    }

    debug!("TCP RX: {}B", n);
    let response = data[..n].to_vec();
    logger.emit(format_args!("modbus: received {}", hex_dump(&response)));
    Ok(response)
}

/// Read until at least `min` bytes are in `buf`
async fn read_at_least<S>(
    stream: &mut S,
    buf: &mut [u8],
    min: usize,
    deadline: Instant,
    start: Instant,
) -> Result<usize>
where
    S: AsyncRead + Unpin + Send,
{
    let mut n = 0;
    while n < min {
        match timeout_at(deadline, stream.read(&mut buf[n..])).await {
            Ok(Ok(0)) => {
                debug!("TCP RX closed: {}B", n);
                return Err(TransportError::ShortRead {
                    expected: min,
                    received: n,
                });
            },
            Ok(Ok(read)) => n += read,
            Ok(Err(e)) => {
                error!("TCP header RX: {}", e);
                return Err(TransportError::read(e));
            },
            Err(_) => {
                warn!("TCP header timeout: {}B", n);
                return Err(TransportError::timeout(Phase::Read, start.elapsed()));
            },
        }
    }
    Ok(n)
}
