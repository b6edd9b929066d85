//! Frame dump sink
//!
//! Optional destination for the raw bytes of each exchange. A transport
//! without a sink emits no frame dumps at all.

use std::fmt;
use std::sync::Arc;

/// Receives formatted frame dumps
///
/// Implementations must not fail the exchange; there is no error channel.
pub trait FrameSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Shared sink handle held by the transport
pub type SharedSink = Arc<dyn FrameSink>;

/// Forwards frame dumps to `tracing` under a channel name
#[derive(Debug, Clone)]
pub struct TracingSink {
    pub channel_name: String,
}

impl TracingSink {
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
        }
    }
}

impl FrameSink for TracingSink {
    fn log(&self, line: &str) {
        tracing::debug!(channel = %self.channel_name, "{}", line);
    }
}

impl<F> FrameSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Wrapper so configs holding a sink stay `Debug`
#[derive(Clone)]
pub(crate) struct SinkSlot(pub(crate) Option<SharedSink>);

impl SinkSlot {
    pub(crate) fn emit(&self, args: fmt::Arguments<'_>) {
        if let Some(sink) = &self.0 {
            sink.log(&args.to_string());
        }
    }
}

impl fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "Some(FrameSink)"),
            None => write!(f, "None"),
        }
    }
}
