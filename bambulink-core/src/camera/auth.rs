//! Camera service authentication packet.
//!
//! The camera port expects a single fixed-size blob immediately after the
//! TLS handshake; the server never acknowledges it.
//!
//! ## Wire format (80 bytes, little-endian)
//!
//! ```text
//! 0x40:         u32   (4)
//! 0x3000:       u32   (4)
//! 0:            u32   (4)
//! 0:            u32   (4)
//! username:     [u8]  (32, ASCII, zero-padded)
//! access code:  [u8]  (32, ASCII, zero-padded)
//! ```

use crate::error::BambuError;

/// The fixed username the printer accepts on its LAN services.
pub const CAMERA_USERNAME: &str = "bblp";

/// Width of the username and access-code fields.
const FIELD_LEN: usize = 32;

// ── AuthPacket ───────────────────────────────────────────────────

/// The 80-byte authentication blob sent after the TLS handshake.
///
/// Built once per client and reused on every reconnect.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthPacket([u8; AuthPacket::SIZE]);

impl AuthPacket {
    /// Encoded size on the wire.
    pub const SIZE: usize = 80;

    /// Build a packet for the standard `bblp` username.
    pub fn new(access_code: &str) -> Result<Self, BambuError> {
        Self::with_username(CAMERA_USERNAME, access_code)
    }

    /// Build a packet with an explicit username.
    ///
    /// Both fields must be ASCII and at most 32 bytes. Anything longer
    /// is rejected rather than truncated — a silently shortened access
    /// code would authenticate as the wrong credential.
    pub fn with_username(username: &str, access_code: &str) -> Result<Self, BambuError> {
        if !username.is_ascii() {
            return Err(BambuError::Credential("username must be ASCII"));
        }
        if username.len() > FIELD_LEN {
            return Err(BambuError::Credential("username exceeds 32 bytes"));
        }
        if !access_code.is_ascii() {
            return Err(BambuError::Credential("access code must be ASCII"));
        }
        if access_code.len() > FIELD_LEN {
            return Err(BambuError::Credential("access code exceeds 32 bytes"));
        }

        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&0x40u32.to_le_bytes());
        buf[4..8].copy_from_slice(&0x3000u32.to_le_bytes());
        buf[8..12].copy_from_slice(&0u32.to_le_bytes());
        buf[12..16].copy_from_slice(&0u32.to_le_bytes());
        buf[16..16 + username.len()].copy_from_slice(username.as_bytes());
        buf[48..48 + access_code.len()].copy_from_slice(access_code.as_bytes());
        Ok(Self(buf))
    }

    /// The raw bytes written to the socket.
    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for AuthPacket {
    // The packet embeds the access code; never print it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPacket").finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_literal_offsets() {
        let pkt = AuthPacket::new("1234").unwrap();
        let b = pkt.as_bytes();

        assert_eq!(b.len(), 80);
        assert_eq!(b[0..4], 0x40u32.to_le_bytes());
        assert_eq!(b[4..8], 0x3000u32.to_le_bytes());
        assert!(b[8..16].iter().all(|&x| x == 0));
        assert_eq!(&b[16..20], b"bblp");
        assert!(b[20..48].iter().all(|&x| x == 0));
        assert_eq!(&b[48..52], b"1234");
        assert!(b[52..80].iter().all(|&x| x == 0));
    }

    #[test]
    fn full_width_fields() {
        let code = "a".repeat(32);
        let pkt = AuthPacket::new(&code).unwrap();
        assert_eq!(&pkt.as_bytes()[48..80], code.as_bytes());
    }

    #[test]
    fn rejects_oversized_access_code() {
        let code = "a".repeat(33);
        assert!(matches!(
            AuthPacket::new(&code),
            Err(BambuError::Credential(_))
        ));
    }

    #[test]
    fn rejects_oversized_username() {
        assert!(matches!(
            AuthPacket::with_username(&"u".repeat(33), "1234"),
            Err(BambuError::Credential(_))
        ));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(matches!(
            AuthPacket::new("códé"),
            Err(BambuError::Credential(_))
        ));
        assert!(matches!(
            AuthPacket::with_username("üser", "1234"),
            Err(BambuError::Credential(_))
        ));
    }

    #[test]
    fn empty_access_code_pads_to_zeros() {
        let pkt = AuthPacket::new("").unwrap();
        assert!(pkt.as_bytes()[48..80].iter().all(|&x| x == 0));
    }

    #[test]
    fn debug_hides_credentials() {
        let pkt = AuthPacket::new("secret99").unwrap();
        let dbg = format!("{pkt:?}");
        assert!(!dbg.contains("secret99"));
    }
}
