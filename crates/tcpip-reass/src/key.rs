// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel identity of one in-flight datagram.
//!
//! The key is kept as one fixed-width byte array so equality is a plain
//! array comparison over every byte. There are no padding gaps and no hash
//! shortcut, so a foreign fragment cannot match a reassembly by colliding
//! on a subset of fields.
//!
//! ```text
//! +--------+----------------+------------------+------------------+
//! | family | identification |  source address  |  dest. address   |
//! +--------+----------------+------------------+------------------+
//!     1B          4B                16B                16B
//! ```
//!
//! For IPv4 the identification word carries the protocol number in bits
//! 16..23 and the 16-bit IP ID below it. Addresses are zero-padded; the
//! family byte keeps a padded IPv4 pair apart from an IPv6 pair with the
//! same leading bytes.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Encoded key length in bytes.
pub const CHANNEL_KEY_LEN: usize = 37;

const ID_START: usize = 1;
const ID_END: usize = ID_START + 4;
const SRC_END: usize = ID_END + 16;

/// IP version of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl AddressFamily {
    fn tag(self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }
}

/// Identity of one reassembly channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    bytes: [u8; CHANNEL_KEY_LEN],
}

impl ChannelKey {
    /// Build a key from raw parts.
    pub fn new(family: AddressFamily, identification: u32, src: [u8; 16], dst: [u8; 16]) -> Self {
        let mut bytes = [0u8; CHANNEL_KEY_LEN];
        bytes[0] = family.tag();
        bytes[ID_START..ID_END].copy_from_slice(&identification.to_be_bytes());
        bytes[ID_END..SRC_END].copy_from_slice(&src);
        bytes[SRC_END..].copy_from_slice(&dst);
        Self { bytes }
    }

    /// IPv4 key: the carried protocol is part of the identity (RFC 791).
    pub fn ipv4(src: Ipv4Addr, dst: Ipv4Addr, identification: u16, protocol: u8) -> Self {
        let id = (u32::from(protocol) << 16) | u32::from(identification);
        let mut src_bytes = [0u8; 16];
        src_bytes[..4].copy_from_slice(&src.octets());
        let mut dst_bytes = [0u8; 16];
        dst_bytes[..4].copy_from_slice(&dst.octets());
        Self::new(AddressFamily::V4, id, src_bytes, dst_bytes)
    }

    /// IPv6 key from the fragment extension header identification.
    pub fn ipv6(src: Ipv6Addr, dst: Ipv6Addr, identification: u32) -> Self {
        Self::new(AddressFamily::V6, identification, src.octets(), dst.octets())
    }

    /// IP version of the channel.
    pub fn family(&self) -> AddressFamily {
        if self.bytes[0] == AddressFamily::V6.tag() {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }

    /// Identification word.
    pub fn identification(&self) -> u32 {
        let b = &self.bytes;
        u32::from_be_bytes([b[ID_START], b[ID_START + 1], b[ID_START + 2], b[ID_START + 3]])
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; CHANNEL_KEY_LEN] {
        &self.bytes
    }

    /// Exact comparison of the full key.
    pub fn matches(&self, other: &ChannelKey) -> bool {
        self.bytes == other.bytes
    }
}

impl fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChannelKey({:?}, id={:#010x}, src=",
            self.family(),
            self.identification()
        )?;
        for b in &self.bytes[ID_END..SRC_END] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ", dst=")?;
        for b in &self.bytes[SRC_END..] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_key_layout() {
        let key = ChannelKey::ipv4(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            0x1234,
            17,
        );
        assert_eq!(key.family(), AddressFamily::V4);
        assert_eq!(key.identification(), 0x0011_1234);
        assert_eq!(&key.as_bytes()[5..9], &[10, 0, 0, 1]);
        assert_eq!(&key.as_bytes()[9..21], &[0u8; 12]);
        assert_eq!(&key.as_bytes()[21..25], &[10, 0, 0, 2]);
    }

    #[test]
    fn test_protocol_distinguishes_channels() {
        let src = Ipv4Addr::new(192, 168, 1, 1);
        let dst = Ipv4Addr::new(192, 168, 1, 2);
        let udp = ChannelKey::ipv4(src, dst, 7, 17);
        let tcp = ChannelKey::ipv4(src, dst, 7, 6);
        assert!(!udp.matches(&tcp));
        assert!(udp.matches(&ChannelKey::ipv4(src, dst, 7, 17)));
    }

    #[test]
    fn test_swapped_addresses_differ() {
        let a = Ipv4Addr::new(1, 2, 3, 4);
        let b = Ipv4Addr::new(5, 6, 7, 8);
        assert_ne!(ChannelKey::ipv4(a, b, 1, 17), ChannelKey::ipv4(b, a, 1, 17));
    }

    #[test]
    fn test_single_byte_difference_in_last_position() {
        let src = Ipv6Addr::LOCALHOST;
        let dst = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let other = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
        assert!(!ChannelKey::ipv6(src, dst, 9).matches(&ChannelKey::ipv6(src, other, 9)));
    }

    #[test]
    fn test_ipv4_and_padded_ipv6_do_not_alias() {
        let v4 = ChannelKey::ipv4(
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            0x1234,
            17,
        );
        let v6 = ChannelKey::ipv6(
            "a00:1::".parse().unwrap(),
            "a00:2::".parse().unwrap(),
            0x0011_1234,
        );
        assert_eq!(&v4.as_bytes()[1..], &v6.as_bytes()[1..]);
        assert!(!v4.matches(&v6));
        assert_eq!(v6.family(), AddressFamily::V6);
    }
}
