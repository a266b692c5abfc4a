//! Well-known channel IDs and frame tags.

/// Channel used by the device firmware for host exchanges.
pub const DEFAULT_CHANNEL: u16 = 0x0101;

/// Frame carries APDU command or response bytes.
pub const TAG_APDU: u8 = 0x05;

/// Frame is a control ping.
pub const TAG_PING: u8 = 0x02;

/// Returns a human-readable name for a frame tag.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        TAG_APDU => "APDU",
        TAG_PING => "PING",
        _ => "UNKNOWN",
    }
}
