//! Packet transport abstraction for Ledger-class signing devices.
//!
//! A transport moves exactly one fixed-size packet per call and knows
//! nothing about message framing. Variants:
//! - In-memory link (device emulators, tests)
//! - USB HID reports (behind the `hid` feature)
//!
//! Everything above this layer depends only on the [`Transport`] trait.

pub mod discovery;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "hid")]
pub mod hid;

pub use discovery::{
    filter_supported, is_supported, DeviceModel, LEDGER_VENDOR_ID, LEGACY_PRODUCT_ID,
    LEGACY_VENDOR_ID,
};
pub use error::{Result, TransportError};
pub use memory::{MemoryDevice, MemoryTransport};
pub use traits::{DeviceDescriptor, Transport};

#[cfg(feature = "hid")]
pub use hid::HidTransport;
