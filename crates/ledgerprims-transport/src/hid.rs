use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use hidapi::{HidApi, HidDevice};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::discovery::filter_supported;
use crate::error::{Result, TransportError};
use crate::traits::{DeviceDescriptor, Transport};

/// Vendor-defined usage page of the APDU interface.
const APDU_USAGE_PAGE: u16 = 0xffa0;

/// Upper bound on one blocking `read_timeout` call, so close and
/// cancellation are observed promptly.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// HID report ID prepended to every outbound report.
const REPORT_ID: u8 = 0x00;

/// USB HID transport.
///
/// Reads and writes run on tokio's blocking pool; only the calling task is
/// suspended while the device is polled.
pub struct HidTransport {
    descriptor: DeviceDescriptor,
    packet_size: usize,
    device: Arc<Mutex<Option<HidDevice>>>,
}

impl HidTransport {
    /// Default HID report size.
    pub const PACKET_SIZE: usize = 64;

    /// Create a closed transport for a discovered device.
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            packet_size: Self::PACKET_SIZE,
            device: Arc::new(Mutex::new(None)),
        }
    }

    /// The device this transport opens.
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn is_open(&self) -> bool {
        self.device.lock().map(|d| d.is_some()).unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl Transport for HidTransport {
    fn name(&self) -> &'static str {
        "hid"
    }

    fn packet_size(&self) -> usize {
        self.packet_size
    }

    async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Err(TransportError::DeviceBusy(format!(
                "{} already open",
                self.descriptor.path
            )));
        }

        let path = CString::new(self.descriptor.path.clone())
            .map_err(|_| TransportError::DeviceNotFound(self.descriptor.path.clone()))?;
        let opened = tokio::task::spawn_blocking(move || open_blocking(&path))
            .await
            .map_err(|err| TransportError::Platform(err.to_string()))??;

        let mut slot = self
            .device
            .lock()
            .map_err(|_| TransportError::DeviceBusy("device state poisoned".to_string()))?;
        if slot.is_some() {
            return Err(TransportError::DeviceBusy(format!(
                "{} already open",
                self.descriptor.path
            )));
        }
        *slot = Some(opened);
        info!(device = %self.descriptor, "hid device opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let device = Arc::clone(&self.device);
        let released = tokio::task::spawn_blocking(move || match device.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        })
        .await
        .map_err(|err| TransportError::Platform(err.to_string()))?;

        if released.is_some() {
            debug!(path = %self.descriptor.path, "hid device closed");
        }
        Ok(())
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<()> {
        if frame.len() != self.packet_size {
            return Err(TransportError::InvalidFrameLength {
                expected: self.packet_size,
                actual: frame.len(),
            });
        }

        let mut report = Vec::with_capacity(frame.len() + 1);
        report.push(REPORT_ID);
        report.extend_from_slice(frame);

        let device = Arc::clone(&self.device);
        tokio::task::spawn_blocking(move || {
            let slot = device.lock().map_err(|_| TransportError::TransportClosed)?;
            let dev = slot.as_ref().ok_or(TransportError::TransportClosed)?;
            let written = dev
                .write(&report)
                .map_err(|err| TransportError::WriteFailed(err.to_string()))?;
            check_written(written, report.len())
        })
        .await
        .map_err(|err| TransportError::WriteFailed(err.to_string()))??;

        trace!(len = frame.len(), "hid frame written");
        Ok(())
    }

    async fn read_frame(&self, timeout: Duration) -> Result<Bytes> {
        if !self.is_open() {
            return Err(TransportError::TransportClosed);
        }

        // Stops the blocking poll if this future is dropped mid-read, so a
        // late frame is not consumed on behalf of an abandoned exchange.
        let abandoned = CancellationToken::new();
        let _guard = abandoned.clone().drop_guard();

        let device = Arc::clone(&self.device);
        let packet_size = self.packet_size;
        let frame = tokio::task::spawn_blocking(move || {
            read_blocking(&device, packet_size, timeout, &abandoned)
        })
        .await
        .map_err(|err| TransportError::ReadFailed(err.to_string()))??;

        trace!(len = frame.len(), "hid frame read");
        Ok(frame)
    }

    async fn discard_pending(&self) -> Result<usize> {
        let device = Arc::clone(&self.device);
        let packet_size = self.packet_size;
        let discarded = tokio::task::spawn_blocking(move || drain_blocking(&device, packet_size))
            .await
            .map_err(|err| TransportError::ReadFailed(err.to_string()))??;
        if discarded > 0 {
            trace!(frames = discarded, "stale hid frames discarded");
        }
        Ok(discarded)
    }

    fn discover() -> Result<Vec<DeviceDescriptor>> {
        let api = HidApi::new().map_err(|err| TransportError::Platform(err.to_string()))?;
        let candidates = api
            .device_list()
            .filter(|info| info.usage_page() == APDU_USAGE_PAGE || info.interface_number() == 0)
            .map(|info| DeviceDescriptor {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                path: info.path().to_string_lossy().into_owned(),
                serial_number: info.serial_number().map(str::to_string),
                product: info.product_string().map(str::to_string),
                interface_number: Some(info.interface_number()),
                usage_page: Some(info.usage_page()),
            });
        let devices = filter_supported(candidates);
        debug!(count = devices.len(), "hid discovery complete");
        Ok(devices)
    }
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidTransport")
            .field("path", &self.descriptor.path)
            .field("packet_size", &self.packet_size)
            .field("open", &self.is_open())
            .finish()
    }
}

fn open_blocking(path: &CStr) -> Result<HidDevice> {
    let api = HidApi::new().map_err(|err| TransportError::Platform(err.to_string()))?;
    match api.open_path(path) {
        Ok(device) => Ok(device),
        Err(err) => {
            let attached = api.device_list().any(|info| info.path() == path);
            let detail = format!("{}: {err}", path.to_string_lossy());
            if attached {
                Err(TransportError::DeviceBusy(detail))
            } else {
                Err(TransportError::DeviceNotFound(detail))
            }
        }
    }
}

fn read_blocking(
    device: &Mutex<Option<HidDevice>>,
    packet_size: usize,
    timeout: Duration,
    abandoned: &CancellationToken,
) -> Result<Bytes> {
    let deadline = deadline_after(Instant::now(), timeout);
    let mut buf = vec![0u8; packet_size];

    loop {
        if abandoned.is_cancelled() {
            return Err(TransportError::TransportClosed);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(TransportError::ReadTimeout(timeout));
        }
        let slice = (deadline - now).min(POLL_INTERVAL);
        let millis = slice.as_millis().clamp(1, i32::MAX as u128) as i32;

        let read = {
            let slot = device.lock().map_err(|_| TransportError::TransportClosed)?;
            let dev = slot.as_ref().ok_or(TransportError::TransportClosed)?;
            dev.read_timeout(&mut buf, millis)
                .map_err(|err| TransportError::ReadFailed(err.to_string()))?
        };

        if read > 0 {
            buf.truncate(read);
            return Ok(Bytes::from(buf));
        }
    }
}

fn drain_blocking(device: &Mutex<Option<HidDevice>>, packet_size: usize) -> Result<usize> {
    let slot = device.lock().map_err(|_| TransportError::TransportClosed)?;
    let dev = slot.as_ref().ok_or(TransportError::TransportClosed)?;
    let mut buf = vec![0u8; packet_size];
    let mut discarded = 0;
    while dev
        .read_timeout(&mut buf, 0)
        .map_err(|err| TransportError::ReadFailed(err.to_string()))?
        > 0
    {
        discarded += 1;
    }
    Ok(discarded)
}

/// `now + timeout`, saturating far in the future instead of overflowing.
fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)))
}

/// A report counts as written only if every byte, report ID included, went out.
fn check_written(written: usize, report_len: usize) -> Result<()> {
    if written < report_len {
        return Err(TransportError::WriteFailed(format!(
            "short write ({written} of {report_len} bytes)"
        )));
    }
    Ok(())
}
