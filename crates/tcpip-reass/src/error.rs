// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for IP reassembly.
//!
//! Every error here is local and recoverable: a rejected fragment is dropped,
//! and no other channel's buffer is touched. Mapping these to stack-wide
//! statistics or production-error reports is the caller's job.

use std::fmt;

/// Reason a single fragment was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentError {
    /// `offset + length` exceeds the configured datagram ceiling, or the
    /// offset is not aligned to the fragmentation unit.
    Offset,
    /// Zero-length payload, or a non-final fragment whose length is not a
    /// multiple of the fragmentation unit.
    Length,
    /// The fragment is not fully contained in exactly one hole (RFC 5722).
    Overlap,
}

impl fmt::Display for FragmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset => write!(f, "fragment offset exceeds reassembly capacity"),
            Self::Length => write!(f, "invalid fragment length"),
            Self::Overlap => write!(f, "overlapping fragment"),
        }
    }
}

impl std::error::Error for FragmentError {}

/// Misuse of a buffer handle, or a header that does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Handle index does not name a buffer of this pool.
    InvalidHandle,
    /// Buffer was released or reused since the handle was issued.
    StaleHandle,
    /// Header longer than the configured header area.
    HeaderTooLong {
        /// Offered header length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "invalid buffer handle"),
            Self::StaleHandle => write!(f, "stale buffer handle"),
            Self::HeaderTooLong { len, max } => {
                write!(f, "header of {} bytes exceeds maximum of {}", len, max)
            }
        }
    }
}

impl std::error::Error for PoolError {}
