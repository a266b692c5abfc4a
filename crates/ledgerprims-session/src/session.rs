use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use ledgerprims_frame::channel::tag_name;
use ledgerprims_frame::{FrameConfig, FrameSequence, MessageReader, MessageWriter, ReaderState};
use ledgerprims_transport::{DeviceDescriptor, Transport, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::apdu::{ApduAnswer, ApduCommand};
use crate::error::{Result, SessionError};

/// Per-frame read timeout applied while waiting for response frames.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on one full write-then-read exchange.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Framing parameters. `packet_size` is taken from the transport.
    pub frame: FrameConfig,
    /// Wait for each response frame. Default: 30s.
    pub read_timeout: Duration,
    /// Wait for the whole exchange. Default: 60s.
    pub exchange_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// Exclusive-access link to one device.
///
/// `exchange` may be called concurrently through an `Arc<Session>`; calls are
/// serialised so the frames of two messages never interleave on the wire.
/// `close` does not wait for the running exchange: it fails it with
/// `TransportClosed` and releases the device.
#[derive(Debug)]
pub struct Session {
    transport: Arc<dyn Transport>,
    device: DeviceDescriptor,
    config: SessionConfig,
    exchange_lock: tokio::sync::Mutex<()>,
    state: Mutex<LinkState>,
}

#[derive(Debug)]
enum LinkState {
    Closed,
    /// `open` is waiting on the transport; the slot is taken.
    Opening,
    /// Cancelled on close.
    Open(CancellationToken),
}

impl Session {
    /// Create a closed session over `transport`.
    pub fn new(
        transport: Arc<dyn Transport>,
        device: DeviceDescriptor,
        mut config: SessionConfig,
    ) -> Self {
        config.frame.packet_size = transport.packet_size();
        Self {
            transport,
            device,
            config,
            exchange_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(LinkState::Closed),
        }
    }

    /// Open the underlying transport.
    pub async fn open(&self) -> Result<()> {
        {
            let mut state = self.state();
            if !matches!(*state, LinkState::Closed) {
                return Err(SessionError::AlreadyOpen);
            }
            *state = LinkState::Opening;
        }

        if let Err(err) = self.transport.open().await {
            let mut state = self.state();
            if matches!(*state, LinkState::Opening) {
                *state = LinkState::Closed;
            }
            return Err(err.into());
        }

        let closed_meanwhile = {
            let mut state = self.state();
            if matches!(*state, LinkState::Opening) {
                *state = LinkState::Open(CancellationToken::new());
                false
            } else {
                true
            }
        };
        if closed_meanwhile {
            self.transport.close().await?;
            return Err(TransportError::TransportClosed.into());
        }

        info!(
            device = %self.device,
            transport = self.transport.name(),
            packet_size = self.config.frame.packet_size,
            "session opened"
        );
        Ok(())
    }

    /// Close the session, failing any in-flight exchange. No-op when closed.
    pub async fn close(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.state(), LinkState::Closed);
        let LinkState::Open(token) = previous else {
            // Closed already, or an `open` in progress that will see the change.
            return Ok(());
        };
        token.cancel();
        self.transport.close().await?;
        info!(device = %self.device, "session closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state(), LinkState::Open(_))
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Send one message and wait for the device's complete response.
    ///
    /// A timeout or transport failure fails this exchange only; the session
    /// stays open and the next call may retry. Frames the device sent after
    /// an earlier exchange gave up are discarded before the message is written.
    pub async fn exchange(&self, message: &[u8]) -> Result<Bytes> {
        let _guard = self.exchange_lock.lock().await;
        let token = self.token()?;

        let writer = MessageWriter::new(self.config.frame)?;
        let frames = writer.frames(message)?;
        debug!(
            tag = tag_name(self.config.frame.tag),
            len = message.len(),
            frames = frames.len(),
            "exchange started"
        );

        let timeout = self.config.exchange_timeout;
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("exchange interrupted by close");
                Err(TransportError::TransportClosed.into())
            }
            res = tokio::time::timeout(timeout, self.transact(&frames)) => match res {
                Ok(Ok(response)) => {
                    debug!(len = response.len(), "exchange complete");
                    Ok(response)
                }
                Ok(Err(err)) => {
                    warn!(error = %err, kind = %err.kind(), "exchange failed");
                    Err(err)
                }
                Err(_) => {
                    warn!(timeout = ?timeout, "exchange timed out");
                    Err(SessionError::ExchangeTimeout(timeout))
                }
            },
        }
    }

    /// Serialise `command`, exchange it, and split the status word off the response.
    pub async fn exchange_apdu(&self, command: &ApduCommand) -> Result<ApduAnswer> {
        let raw = command.to_bytes()?;
        let response = self.exchange(&raw).await?;
        let answer = ApduAnswer::from_bytes(response)?;
        trace!(
            ins = command.ins,
            status_word = answer.status_word(),
            "apdu answered"
        );
        Ok(answer)
    }

    async fn transact(&self, frames: &FrameSequence<'_>) -> Result<Bytes> {
        let stale = self.transport.discard_pending().await?;
        if stale > 0 {
            warn!(frames = stale, "discarded stale response frames");
        }

        for frame in frames {
            let frame = frame?;
            self.transport.write_frame(&frame).await?;
        }

        let mut reader = MessageReader::new(self.config.frame)?;
        loop {
            let frame = self.transport.read_frame(self.config.read_timeout).await?;
            if reader.push_frame(&frame)? == ReaderState::Finished {
                break;
            }
        }
        Ok(reader.into_data()?)
    }

    fn token(&self) -> Result<CancellationToken> {
        match &*self.state() {
            LinkState::Open(token) if !token.is_cancelled() => Ok(token.clone()),
            _ => Err(TransportError::TransportClosed.into()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LinkState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
