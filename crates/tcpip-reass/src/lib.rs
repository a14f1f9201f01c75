// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tcpip-reass - Fixed-Buffer IP Datagram Reassembly
//!
//! Reassembles fragmented IPv4 and IPv6 datagrams into a fixed pool of
//! buffers sized at start-up.
//!
//! ## Design Constraints
//!
//! - **No allocation after start-up** (every buffer reserved in [`BufferPool::new`])
//! - **RFC 815** hole descriptors stored inside the reassembly area
//! - **RFC 5722** overlapping fragments rejected, for IPv4 as well as IPv6
//! - **RFC 6946** atomic fragments never join an in-flight reassembly
//! - **Tick-based aging**: no wall clock, wrapping counter
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------+
//! |  IPv4 / IPv6 receive path (caller)      |
//! +-----------------------------------------+
//!           v  FragmentDescriptor   ^ ReassemblyOutcome
//! +-----------------------------------------+
//! |  Reassembler / SharedReassembler        |
//! +-----------------------------------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  BufferPool (ChannelKey match, aging)   |
//! +-----------------------------------------+
//!           v                    ^
//! +-----------------------------------------+
//! |  HoleList (carve -> Placement -> commit)|
//! +-----------------------------------------+
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` -- Serialize/Deserialize for [`ReassemblyConfig`]
//!
//! ## Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use tcpip_reass::{ChannelKey, FragmentDescriptor, Reassembler, ReassemblyConfig, ReassemblyOutcome};
//!
//! let mut reassembler = Reassembler::new(ReassemblyConfig::default()).unwrap();
//! let key = ChannelKey::ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 0x1234, 17);
//!
//! let first = [0xAAu8; 8];
//! let last = [0xBBu8; 3];
//! reassembler.on_fragment(&FragmentDescriptor::new(key, 0, &first, true));
//!
//! match reassembler.on_fragment(&FragmentDescriptor::new(key, 8, &last, false)) {
//!     ReassemblyOutcome::Complete(handle) => {
//!         assert_eq!(reassembler.payload(handle).unwrap().len(), 11);
//!         reassembler.release(handle).unwrap();
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Tick counter for buffer aging
pub mod clock;

/// Pool sizing and timeout configuration
pub mod config;

/// Error types
pub mod error;

/// Fragment descriptor, range validation, header field decoding
pub mod fragment;

/// RFC 815 hole descriptor list
pub mod hole_list;

/// Channel key (identification + addresses)
pub mod key;

/// Fixed buffer pool
pub mod pool;

/// Reassembly entry point
pub mod reassembler;

/// Mutex-protected reassembler
pub mod shared;

// Re-exports for convenience
pub use crate::clock::{AgingClock, Tick};
pub use crate::config::{
    ConfigError, ReassemblyConfig, FRAGMENT_UNIT, IPV4_MAX_HEADER_LEN, IPV6_MAX_HEADER_LEN,
};
pub use crate::error::{FragmentError, PoolError};
pub use crate::fragment::{FragmentDescriptor, FragmentRange, Ipv4FragmentInfo, Ipv6FragmentInfo};
pub use crate::hole_list::{Completion, HoleList};
pub use crate::key::{AddressFamily, ChannelKey};
pub use crate::pool::{BufferHandle, BufferPool, ReassemblyBuffer};
pub use crate::reassembler::{Reassembler, ReassemblyOutcome, ReassemblyStats};
pub use crate::shared::SharedReassembler;
