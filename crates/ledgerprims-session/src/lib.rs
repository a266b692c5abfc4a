//! Exclusive-access APDU exchange sessions.
//!
//! This is the layer callers use. A [`Session`] binds one transport to one
//! device and runs `exchange` calls one at a time: frame the command, write
//! every frame, read frames until the response is reassembled.

pub mod apdu;
pub mod error;
pub mod session;

pub use apdu::{ApduAnswer, ApduCommand, SW_OK};
pub use error::{ErrorKind, Result, SessionError};
pub use session::{Session, SessionConfig, DEFAULT_EXCHANGE_TIMEOUT, DEFAULT_READ_TIMEOUT};
