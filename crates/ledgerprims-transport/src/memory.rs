use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::discovery::LEDGER_VENDOR_ID;
use crate::error::{Result, TransportError};
use crate::traits::{DeviceDescriptor, Transport};

/// In-process transport connected to a [`MemoryDevice`].
///
/// The device half is driven by an emulator or a test: it receives every
/// frame the host writes and queues the frames the host will read.
#[derive(Debug)]
pub struct MemoryTransport {
    packet_size: usize,
    to_device: mpsc::UnboundedSender<Bytes>,
    from_device: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
    /// `Some` while open; cancelled on close to wake pending reads.
    open: Mutex<Option<CancellationToken>>,
}

/// Device end of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryDevice {
    packet_size: usize,
    from_host: mpsc::UnboundedReceiver<Bytes>,
    to_host: mpsc::UnboundedSender<Bytes>,
}

impl MemoryTransport {
    /// Create a connected host/device pair.
    pub fn pair(packet_size: usize) -> (Self, MemoryDevice) {
        let (to_device, from_host) = mpsc::unbounded_channel();
        let (to_host, from_device) = mpsc::unbounded_channel();
        let transport = Self {
            packet_size,
            to_device,
            from_device: tokio::sync::Mutex::new(from_device),
            open: Mutex::new(None),
        };
        let device = MemoryDevice {
            packet_size,
            from_host,
            to_host,
        };
        (transport, device)
    }

    /// Descriptor for the emulated device.
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            product: Some("memory".to_string()),
            ..DeviceDescriptor::new(LEDGER_VENDOR_ID, 0x5011, "memory")
        }
    }

    fn token(&self) -> Result<CancellationToken> {
        let open = self.open.lock().map_err(|_| TransportError::TransportClosed)?;
        match open.as_ref() {
            Some(token) if !token.is_cancelled() => Ok(token.clone()),
            _ => Err(TransportError::TransportClosed),
        }
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn packet_size(&self) -> usize {
        self.packet_size
    }

    async fn open(&self) -> Result<()> {
        let mut open = self
            .open
            .lock()
            .map_err(|_| TransportError::DeviceBusy("memory link poisoned".to_string()))?;
        if open.is_some() {
            return Err(TransportError::DeviceBusy("memory link already open".to_string()));
        }
        if self.to_device.is_closed() {
            return Err(TransportError::DeviceNotFound("memory device dropped".to_string()));
        }
        *open = Some(CancellationToken::new());
        debug!("memory transport opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let token = match self.open.lock() {
            Ok(mut open) => open.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = token {
            token.cancel();
            debug!("memory transport closed");
        }
        Ok(())
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<()> {
        self.token()?;
        if frame.len() != self.packet_size {
            return Err(TransportError::InvalidFrameLength {
                expected: self.packet_size,
                actual: frame.len(),
            });
        }
        self.to_device
            .send(Bytes::copy_from_slice(frame))
            .map_err(|_| TransportError::WriteFailed("memory device dropped".to_string()))?;
        trace!(len = frame.len(), "frame written");
        Ok(())
    }

    async fn read_frame(&self, timeout: Duration) -> Result<Bytes> {
        let token = self.token()?;
        let recv = async {
            let mut rx = self.from_device.lock().await;
            rx.recv().await
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(TransportError::TransportClosed),
            res = tokio::time::timeout(timeout, recv) => match res {
                Ok(Some(frame)) => {
                    trace!(len = frame.len(), "frame read");
                    Ok(frame)
                }
                Ok(None) => Err(TransportError::ReadFailed("memory device dropped".to_string())),
                Err(_) => Err(TransportError::ReadTimeout(timeout)),
            },
        }
    }

    async fn discard_pending(&self) -> Result<usize> {
        self.token()?;
        let mut rx = self.from_device.lock().await;
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            trace!(frames = discarded, "pending frames discarded");
        }
        Ok(discarded)
    }

    fn discover() -> Result<Vec<DeviceDescriptor>> {
        // Memory links are created in-process, never enumerated.
        Ok(Vec::new())
    }
}

impl MemoryDevice {
    /// Packet size shared with the host end.
    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// Wait for the next frame written by the host.
    ///
    /// Returns `None` once the host transport is dropped.
    pub async fn recv_frame(&mut self) -> Option<Bytes> {
        self.from_host.recv().await
    }

    /// Queue a frame for the host to read. Length is not checked, so
    /// malformed frames can be injected.
    pub fn send_frame(&self, frame: impl Into<Bytes>) -> Result<()> {
        self.to_host
            .send(frame.into())
            .map_err(|_| TransportError::WriteFailed("memory host dropped".to_string()))
    }
}
