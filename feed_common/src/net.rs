//! Wire constants and small networking helpers shared by client and simulator.

/// Status byte opening a quote-data message (`'S'`).
pub const STATUS_QUOTE: u8 = 83;
/// Status byte of a keep-alive heartbeat (`'H'`).
pub const STATUS_HEARTBEAT: u8 = 72;
/// Reserved status byte associated with authentication failure (`'D'`).
/// The server never actually sends it on bad credentials.
pub const STATUS_AUTH_FAILURE: u8 = 68;

/// 16-bit value closing every record.
pub const TERMINATOR: u16 = 65290;
/// Big-endian byte form of [`TERMINATOR`].
pub const TERMINATOR_BYTES: [u8; 2] = TERMINATOR.to_be_bytes();
/// Value expected in the marker field right after the segment size.
pub const MARKER: u16 = 1;

/// Longest symbol the protocol is known to carry.
pub const MAX_SYMBOL_LEN: usize = 5;
/// Most symbols a single subscription may request.
pub const MAX_SYMBOLS: usize = 23;

/// Default feed port.
pub const DEFAULT_PORT: u16 = 80;
/// Default connect/read timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Upper bound on a single socket read while assembling a frame.
pub const DEFAULT_MAX_CHUNK: usize = 8192;
/// Upper bound on the single read that drains the handshake reply.
pub const DEFAULT_HANDSHAKE_CHUNK: usize = 1024;

/// Helper to format a host and port like "host:port".
pub fn addr(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

/// Returns `true` if `buf` ends with the record terminator.
pub fn ends_with_terminator(buf: &[u8]) -> bool {
    buf.ends_with(&TERMINATOR_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_bytes() {
        assert_eq!(TERMINATOR_BYTES, [0xFF, 0x0A]);
        assert!(ends_with_terminator(&[83, 0xFF, 0x0A]));
        assert!(!ends_with_terminator(&[0xFF]));
        assert!(!ends_with_terminator(&[0x0A, 0xFF]));
    }
}
