use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::discovery::DeviceModel;
use crate::error::Result;

/// An attached device as reported by enumeration.
///
/// Immutable once discovered; `path` is the transport-specific handle used
/// to open the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub path: String,
    pub serial_number: Option<String>,
    pub product: Option<String>,
    pub interface_number: Option<i32>,
    pub usage_page: Option<u16>,
}

impl DeviceDescriptor {
    /// Descriptor with only the identifiers and handle known.
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            serial_number: None,
            product: None,
            interface_number: None,
            usage_page: None,
        }
    }

    /// Hardware model inferred from the vendor/product pair.
    pub fn model(&self) -> DeviceModel {
        DeviceModel::from_ids(self.vendor_id, self.product_id)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} ({}) at {}",
            self.vendor_id,
            self.product_id,
            self.model(),
            self.path
        )
    }
}

/// A fixed-size packet link to one physical device.
///
/// Methods take `&self` so that [`close`](Transport::close) can run while a
/// read or write is pending on another task; implementations must then fail
/// the pending call with `TransportClosed` instead of hanging.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;

    /// Size of every frame on this link. Constant for the transport's lifetime.
    fn packet_size(&self) -> usize;

    /// Acquire exclusive OS-level access to the device.
    async fn open(&self) -> Result<()>;

    /// Release the device and fail any pending read or write.
    async fn close(&self) -> Result<()>;

    /// Write exactly one frame of `packet_size` bytes.
    async fn write_frame(&self, frame: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for one frame.
    async fn read_frame(&self, timeout: Duration) -> Result<Bytes>;

    /// Drop inbound frames already queued without waiting for more.
    /// Returns how many frames were discarded.
    async fn discard_pending(&self) -> Result<usize>;

    /// Enumerate attached devices this transport can reach.
    fn discover() -> Result<Vec<DeviceDescriptor>>
    where
        Self: Sized;
}
