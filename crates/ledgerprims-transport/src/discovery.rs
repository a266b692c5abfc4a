//! Supported hardware identifiers.
//!
//! Current devices share the Ledger vendor ID; the first-generation HW.1
//! token is matched on its own vendor/product pair.

use std::fmt;

use crate::traits::DeviceDescriptor;

/// USB vendor ID of all current devices.
pub const LEDGER_VENDOR_ID: u16 = 0x2c97;

/// Vendor ID of the legacy HW.1 device.
pub const LEGACY_VENDOR_ID: u16 = 0x2581;

/// Product ID of the legacy HW.1 device.
pub const LEGACY_PRODUCT_ID: u16 = 0x3b7c;

/// Returns true if the vendor/product pair belongs to a supported device.
pub fn is_supported(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == LEDGER_VENDOR_ID
        || (vendor_id == LEGACY_VENDOR_ID && product_id == LEGACY_PRODUCT_ID)
}

/// Keep only supported devices, preserving enumeration order.
pub fn filter_supported<I>(candidates: I) -> Vec<DeviceDescriptor>
where
    I: IntoIterator<Item = DeviceDescriptor>,
{
    candidates
        .into_iter()
        .filter(|d| is_supported(d.vendor_id, d.product_id))
        .collect()
}

/// Hardware family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    Blue,
    NanoS,
    NanoX,
    NanoSPlus,
    Stax,
    Flex,
    LegacyHw1,
    Unknown,
}

impl DeviceModel {
    /// Infer the model from USB identifiers.
    ///
    /// Bootloader product IDs are the bare model number (`0x0004`). Firmware
    /// IDs carry the model in the high byte (`0x40` for `0x4011`) and the
    /// interface set in the low byte.
    pub fn from_ids(vendor_id: u16, product_id: u16) -> Self {
        if vendor_id == LEGACY_VENDOR_ID && product_id == LEGACY_PRODUCT_ID {
            return Self::LegacyHw1;
        }
        if vendor_id != LEDGER_VENDOR_ID {
            return Self::Unknown;
        }
        match product_id {
            0x0000 => Self::Blue,
            0x0001 => Self::NanoS,
            0x0004 => Self::NanoX,
            0x0005 => Self::NanoSPlus,
            0x0006 => Self::Stax,
            0x0007 => Self::Flex,
            _ => match product_id >> 8 {
                0x00 => Self::Blue,
                0x10 => Self::NanoS,
                0x40 => Self::NanoX,
                0x50 => Self::NanoSPlus,
                0x60 => Self::Stax,
                0x70 => Self::Flex,
                _ => Self::Unknown,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::NanoS => "Nano S",
            Self::NanoX => "Nano X",
            Self::NanoSPlus => "Nano S Plus",
            Self::Stax => "Stax",
            Self::Flex => "Flex",
            Self::LegacyHw1 => "HW.1",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
