// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parsed fragment input.
//!
//! The outer IP receive path fills a [`FragmentDescriptor`] per fragment.
//! [`FragmentRange::validate`] turns its offset/length into a checked byte
//! range; only a validated range can reach the hole list.
//!
//! # Fragment fields
//!
//! ```text
//! IPv4 flags/offset word:   | 0 | DF | MF | offset (13 bits, x8) |
//! IPv6 fragment header word: | offset (13 bits, x8) | res (2) | M |
//! ```

use crate::config::FRAGMENT_UNIT;
use crate::error::FragmentError;
use crate::key::ChannelKey;

/// One parsed fragment, borrowed from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct FragmentDescriptor<'a> {
    /// Owning channel.
    pub key: ChannelKey,
    /// Byte offset of this fragment in the reassembled payload.
    pub offset: usize,
    /// Fragment payload (without IP header).
    pub payload: &'a [u8],
    /// More fragments follow.
    pub more_fragments: bool,
    /// Raw IP header of this fragment; stored only when `offset == 0`.
    pub header: Option<&'a [u8]>,
}

impl<'a> FragmentDescriptor<'a> {
    /// Fragment without header bytes.
    pub fn new(key: ChannelKey, offset: usize, payload: &'a [u8], more_fragments: bool) -> Self {
        Self {
            key,
            offset,
            payload,
            more_fragments,
            header: None,
        }
    }

    /// Attach the fragment's IP header.
    pub fn with_header(mut self, header: &'a [u8]) -> Self {
        self.header = Some(header);
        self
    }

    /// Complete datagram sent with fragment fields (RFC 6946).
    pub fn is_atomic(&self) -> bool {
        self.offset == 0 && !self.more_fragments
    }
}

/// Validated inclusive byte range `[first, last]` of one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentRange {
    first: usize,
    last: usize,
    more: bool,
}

impl FragmentRange {
    /// Check placement and length against the datagram ceiling.
    ///
    /// The ceiling is checked first: a fragment that is both too far out
    /// and badly sized reports [`FragmentError::Offset`]. Within the
    /// ceiling, a zero or misaligned non-final length reports
    /// [`FragmentError::Length`], then a misaligned offset reports
    /// [`FragmentError::Offset`].
    pub fn validate(
        offset: usize,
        len: usize,
        more: bool,
        ceiling: usize,
    ) -> Result<Self, FragmentError> {
        let end = offset.checked_add(len).ok_or(FragmentError::Offset)?;
        if end > ceiling {
            return Err(FragmentError::Offset);
        }
        if len == 0 || (more && len % FRAGMENT_UNIT != 0) {
            return Err(FragmentError::Length);
        }
        if offset % FRAGMENT_UNIT != 0 {
            return Err(FragmentError::Offset);
        }
        Ok(Self {
            first: offset,
            last: end - 1,
            more,
        })
    }

    /// Validate a descriptor.
    pub fn of(fragment: &FragmentDescriptor<'_>, ceiling: usize) -> Result<Self, FragmentError> {
        Self::validate(
            fragment.offset,
            fragment.payload.len(),
            fragment.more_fragments,
            ceiling,
        )
    }

    /// First byte offset.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Last byte offset (inclusive).
    pub fn last(&self) -> usize {
        self.last
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> usize {
        self.last + 1
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Never true for a validated range.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// More fragments follow.
    pub fn more(&self) -> bool {
        self.more
    }
}

/// Decoded IPv4 flags/fragment-offset word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4FragmentInfo {
    /// Byte offset (field value x 8).
    pub offset: usize,
    /// MF flag.
    pub more_fragments: bool,
    /// DF flag.
    pub dont_fragment: bool,
}

impl Ipv4FragmentInfo {
    const MF: u16 = 1 << 13;
    const DF: u16 = 1 << 14;
    const OFFSET_MASK: u16 = 0x1FFF;

    /// Decode from the host-order header word.
    pub fn from_raw(raw: u16) -> Self {
        Self {
            offset: usize::from(raw & Self::OFFSET_MASK) << 3,
            more_fragments: raw & Self::MF != 0,
            dont_fragment: raw & Self::DF != 0,
        }
    }

    /// Whether the datagram is fragmented at all.
    pub fn is_fragment(&self) -> bool {
        self.offset != 0 || self.more_fragments
    }
}

/// Decoded IPv6 fragment extension header offset word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6FragmentInfo {
    /// Byte offset.
    pub offset: usize,
    /// M flag.
    pub more_fragments: bool,
}

impl Ipv6FragmentInfo {
    /// Decode from the host-order header word.
    pub fn from_raw(raw: u16) -> Self {
        Self {
            offset: usize::from(raw & 0xFFF8),
            more_fragments: raw & 1 != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn key() -> ChannelKey {
        ChannelKey::ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, 1, 17)
    }

    #[test]
    fn test_validate_ok() {
        let range = FragmentRange::validate(16, 24, true, 1500).unwrap();
        assert_eq!(range.first(), 16);
        assert_eq!(range.last(), 39);
        assert_eq!(range.end(), 40);
        assert_eq!(range.len(), 24);
        assert!(range.more());
    }

    #[test]
    fn test_validate_zero_length() {
        assert_eq!(
            FragmentRange::validate(0, 0, false, 1500),
            Err(FragmentError::Length)
        );
    }

    #[test]
    fn test_validate_unaligned_non_final() {
        assert_eq!(
            FragmentRange::validate(0, 13, true, 1500),
            Err(FragmentError::Length)
        );
        // Final fragment may have any length.
        assert!(FragmentRange::validate(0, 13, false, 1500).is_ok());
    }

    #[test]
    fn test_validate_ceiling() {
        assert!(FragmentRange::validate(1496, 4, false, 1500).is_ok());
        assert_eq!(
            FragmentRange::validate(1496, 5, false, 1500),
            Err(FragmentError::Offset)
        );
    }

    #[test]
    fn test_validate_ceiling_checked_before_length() {
        // Beyond the ceiling and not a multiple of 8.
        assert_eq!(
            FragmentRange::validate(1496, 12, true, 1500),
            Err(FragmentError::Offset)
        );
        // Zero length far past the ceiling.
        assert_eq!(
            FragmentRange::validate(4000, 0, false, 1500),
            Err(FragmentError::Offset)
        );
        // Zero length inside the ceiling.
        assert_eq!(
            FragmentRange::validate(1496, 0, false, 1500),
            Err(FragmentError::Length)
        );
    }

    #[test]
    fn test_validate_misaligned_offset() {
        assert_eq!(
            FragmentRange::validate(4, 8, true, 1500),
            Err(FragmentError::Offset)
        );
    }

    #[test]
    fn test_validate_overflow() {
        let offset = usize::MAX - 7;
        assert_eq!(
            FragmentRange::validate(offset, 16, true, 1500),
            Err(FragmentError::Offset)
        );
    }

    #[test]
    fn test_descriptor_atomic() {
        let data = [0u8; 8];
        assert!(FragmentDescriptor::new(key(), 0, &data, false).is_atomic());
        assert!(!FragmentDescriptor::new(key(), 0, &data, true).is_atomic());
        assert!(!FragmentDescriptor::new(key(), 8, &data, false).is_atomic());
    }

    #[test]
    fn test_ipv4_fragment_info() {
        // MF set, offset field 185 -> 1480 bytes
        let info = Ipv4FragmentInfo::from_raw(0x2000 | 185);
        assert_eq!(info.offset, 1480);
        assert!(info.more_fragments);
        assert!(!info.dont_fragment);
        assert!(info.is_fragment());

        let df = Ipv4FragmentInfo::from_raw(0x4000);
        assert!(df.dont_fragment);
        assert!(!df.is_fragment());
    }

    #[test]
    fn test_ipv6_fragment_info() {
        let info = Ipv6FragmentInfo::from_raw((181 << 3) | 1);
        assert_eq!(info.offset, 1448);
        assert!(info.more_fragments);

        let last = Ipv6FragmentInfo::from_raw(181 << 3);
        assert!(!last.more_fragments);
    }
}
