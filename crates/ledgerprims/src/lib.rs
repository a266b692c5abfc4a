//! Host-side link to Ledger-class signing devices.
//!
//! Messages are split into fixed-size packets, written over a raw packet
//! transport, and the device's answer is reassembled from the packets it
//! sends back. One [`session::Session`] owns one device and runs one
//! exchange at a time.
//!
//! # Crate Structure
//!
//! - [`frame`]: packet framing and reassembly, no I/O
//! - [`transport`]: packet transports (in-memory, USB HID behind `hid`) and device discovery
//! - [`session`]: exclusive-access exchange sessions and APDU types

/// Re-export frame types.
pub mod frame {
    pub use ledgerprims_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use ledgerprims_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use ledgerprims_session::*;
}
