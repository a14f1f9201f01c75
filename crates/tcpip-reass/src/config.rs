// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reassembly configuration.
//!
//! Fixed at start-up. The pool sizes every buffer from these values once and
//! never allocates afterwards, so nothing here can be changed on a live
//! [`Reassembler`](crate::Reassembler).

use std::fmt;

/// IP fragmentation unit in bytes (RFC 791 fragment offset granularity).
pub const FRAGMENT_UNIT: usize = 8;

/// Maximum IPv4 header length (IHL = 15).
pub const IPV4_MAX_HEADER_LEN: usize = 60;

/// IPv6 fixed header length.
pub const IPV6_MAX_HEADER_LEN: usize = 40;

/// Largest datagram an IP length field can describe.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Reassembly configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReassemblyConfig {
    /// Number of reassembly buffers in the pool.
    pub buffer_count: usize,
    /// Datagram ceiling: `offset + length` of any fragment must not exceed it.
    pub max_datagram_size: usize,
    /// Bytes reserved in front of the payload for the first fragment's header.
    pub max_header_len: usize,
    /// Buffers older than this many ticks are expired.
    pub timeout_ticks: u32,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            buffer_count: 4,
            max_datagram_size: 1500,
            max_header_len: IPV4_MAX_HEADER_LEN,
            timeout_ticks: 50,
        }
    }
}

impl ReassemblyConfig {
    /// Check the configuration for values the pool cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_count == 0 || self.buffer_count > usize::from(u16::MAX) {
            return Err(ConfigError::BufferCount(self.buffer_count));
        }
        if self.max_datagram_size < FRAGMENT_UNIT || self.max_datagram_size > MAX_DATAGRAM_SIZE {
            return Err(ConfigError::DatagramSize(self.max_datagram_size));
        }
        if self.max_header_len > usize::from(u8::MAX) {
            return Err(ConfigError::HeaderLen(self.max_header_len));
        }
        Ok(())
    }

    /// Physical bytes per buffer: header area plus ceiling, rounded up to 4.
    pub fn buffer_capacity(&self) -> usize {
        (self.max_header_len + self.max_datagram_size).next_multiple_of(4)
    }

    /// Total bytes the pool reserves at start-up.
    pub fn memory_footprint(&self) -> usize {
        self.buffer_count * self.buffer_capacity()
    }
}

/// Configuration rejected by [`ReassemblyConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Buffer count is zero or exceeds 65535.
    BufferCount(usize),
    /// Datagram ceiling below one fragmentation unit or above 65535.
    DatagramSize(usize),
    /// Header area larger than 255 bytes.
    HeaderLen(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferCount(n) => write!(f, "invalid buffer count: {}", n),
            Self::DatagramSize(n) => write!(f, "invalid max datagram size: {}", n),
            Self::HeaderLen(n) => write!(f, "invalid max header length: {}", n),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ReassemblyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity(), 1560);
        assert_eq!(config.memory_footprint(), 4 * 1560);
    }

    #[test]
    fn test_capacity_rounds_up() {
        let config = ReassemblyConfig {
            max_header_len: IPV6_MAX_HEADER_LEN,
            max_datagram_size: 1501,
            ..Default::default()
        };
        assert_eq!(config.buffer_capacity(), 1544);
    }

    #[test]
    fn test_rejects_zero_buffers() {
        let config = ReassemblyConfig {
            buffer_count: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BufferCount(0)));
    }

    #[test]
    fn test_rejects_datagram_size_bounds() {
        let small = ReassemblyConfig {
            max_datagram_size: 7,
            ..Default::default()
        };
        assert_eq!(small.validate(), Err(ConfigError::DatagramSize(7)));

        let large = ReassemblyConfig {
            max_datagram_size: MAX_DATAGRAM_SIZE + 1,
            ..Default::default()
        };
        assert_eq!(
            large.validate(),
            Err(ConfigError::DatagramSize(MAX_DATAGRAM_SIZE + 1))
        );
    }

    #[test]
    fn test_rejects_header_len() {
        let config = ReassemblyConfig {
            max_header_len: 256,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::HeaderLen(256)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_partial_config() {
        let config: ReassemblyConfig =
            serde_json::from_str(r#"{"buffer_count": 8, "timeout_ticks": 10}"#).unwrap();
        assert_eq!(config.buffer_count, 8);
        assert_eq!(config.timeout_ticks, 10);
        assert_eq!(config.max_datagram_size, 1500);
    }
}
