// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reassembly entry point.
//!
//! One call per received fragment:
//!
//! ```text
//! validate range --err--> Error(kind)               (no buffer touched)
//!      |
//! lookup / allocate --none--> OutOfBuffers
//!      |
//! hole list insert --err--> Error(kind)             (buffer contents kept)
//!      |
//! age > timeout ----yes---> Timeout(handle)         (caller discards)
//!      |
//! Complete(handle) | Incomplete(handle)
//! ```
//!
//! After `Complete`, the caller reads the datagram and calls
//! [`Reassembler::release`]. After `Timeout` it releases without reading.
//!
//! # Usage
//!
//! ```ignore
//! let mut reassembler = Reassembler::new(ReassemblyConfig::default())?;
//!
//! // On fragment received
//! match reassembler.on_fragment(&fragment) {
//!     ReassemblyOutcome::Complete(handle) => {
//!         deliver(reassembler.datagram(handle)?);
//!         reassembler.release(handle)?;
//!     }
//!     ReassemblyOutcome::Timeout(handle) => reassembler.release(handle)?,
//!     _ => {}
//! }
//!
//! // From the periodic main function
//! reassembler.age_tick();
//! ```

use crate::clock::{AgingClock, Tick};
use crate::config::{ConfigError, ReassemblyConfig};
use crate::error::{FragmentError, PoolError};
use crate::fragment::{FragmentDescriptor, FragmentRange};
use crate::hole_list::Completion;
use crate::pool::{BufferHandle, BufferPool, ReassemblyBuffer};

/// Result of feeding one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyOutcome {
    /// Accepted; more fragments needed.
    Incomplete(BufferHandle),
    /// Accepted; datagram complete.
    Complete(BufferHandle),
    /// No free or expired buffer.
    OutOfBuffers,
    /// Accepted, but the buffer aged out; its data must be discarded.
    Timeout(BufferHandle),
    /// Fragment rejected.
    Error(FragmentError),
}

impl ReassemblyOutcome {
    /// Buffer handle carried by the outcome.
    pub fn handle(&self) -> Option<BufferHandle> {
        match *self {
            Self::Incomplete(h) | Self::Complete(h) | Self::Timeout(h) => Some(h),
            Self::OutOfBuffers | Self::Error(_) => None,
        }
    }

    /// True for [`ReassemblyOutcome::Complete`].
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Reassembly statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Fragments offered.
    pub fragments_received: u64,
    /// Datagrams completed.
    pub datagrams_completed: u64,
    /// Fragments rejected for offset.
    pub offset_errors: u64,
    /// Fragments rejected for length.
    pub length_errors: u64,
    /// Fragments rejected for overlap.
    pub overlaps_rejected: u64,
    /// Fragments dropped for lack of buffers.
    pub out_of_buffers: u64,
    /// Insertions reported as timed out.
    pub timeouts: u64,
    /// Expired buffers reclaimed for a new channel.
    pub expired_reclaimed: u64,
    /// Buffers currently in use (snapshot).
    pub buffers_in_use: usize,
}

/// IP datagram reassembler.
#[derive(Debug)]
pub struct Reassembler {
    config: ReassemblyConfig,
    pool: BufferPool,
    clock: AgingClock,
    stats: ReassemblyStats,
}

impl Reassembler {
    /// Create a reassembler; all buffers are allocated here.
    pub fn new(config: ReassemblyConfig) -> Result<Self, ConfigError> {
        let pool = BufferPool::new(&config)?;
        Ok(Self {
            config,
            pool,
            clock: AgingClock::new(),
            stats: ReassemblyStats::default(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
    }

    /// Buffer pool.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Advance the aging clock; call at a fixed period.
    pub fn age_tick(&mut self) -> Tick {
        self.clock.advance()
    }

    /// Feed one fragment at the current tick.
    pub fn on_fragment(&mut self, fragment: &FragmentDescriptor<'_>) -> ReassemblyOutcome {
        let now = self.clock.now();
        self.reassemble(fragment, now)
    }

    /// Feed one fragment received at `now`.
    pub fn reassemble(
        &mut self,
        fragment: &FragmentDescriptor<'_>,
        now: Tick,
    ) -> ReassemblyOutcome {
        self.stats.fragments_received += 1;

        let range = match FragmentRange::of(fragment, self.config.max_datagram_size) {
            Ok(range) => range,
            Err(e) => return self.reject(e, fragment),
        };

        let handle = match self.pool.lookup(fragment) {
            Some(handle) => handle,
            None => match self.pool.allocate_tracked(fragment.key, now) {
                Some((handle, reclaimed)) => {
                    if reclaimed {
                        self.stats.expired_reclaimed += 1;
                    }
                    handle
                }
                None => {
                    self.stats.out_of_buffers += 1;
                    log::warn!(
                        "[Reass] out of buffers: {:?} offset={} dropped",
                        fragment.key,
                        fragment.offset
                    );
                    return ReassemblyOutcome::OutOfBuffers;
                }
            },
        };

        let buffer = self.pool.slot_mut(handle);
        let completion = match buffer.insert(&range, fragment.payload) {
            Ok(completion) => completion,
            Err(e) => return self.reject(e, fragment),
        };
        let timestamp = buffer.timestamp();
        let size = buffer.high_water_mark();

        if range.first() == 0 {
            if let Some(header) = fragment.header {
                if let Err(e) = self.pool.store_header(handle, header) {
                    log::warn!("[Reass] header not stored for {:?}: {}", fragment.key, e);
                }
            }
        }

        log::debug!(
            "[Reass] {:?} frag [{}, {}] more={} stored in buffer {}",
            fragment.key,
            range.first(),
            range.last(),
            range.more(),
            handle.index()
        );

        if now.is_expired(timestamp, self.config.timeout_ticks) {
            self.stats.timeouts += 1;
            log::warn!(
                "[Reass] {:?} timed out (age {} > {})",
                fragment.key,
                now.age_since(timestamp),
                self.config.timeout_ticks
            );
            return ReassemblyOutcome::Timeout(handle);
        }

        match completion {
            Completion::Complete => {
                self.stats.datagrams_completed += 1;
                log::debug!("[Reass] [OK] {:?} complete: {} bytes", fragment.key, size);
                ReassemblyOutcome::Complete(handle)
            }
            Completion::Incomplete => ReassemblyOutcome::Incomplete(handle),
        }
    }

    fn reject(
        &mut self,
        error: FragmentError,
        fragment: &FragmentDescriptor<'_>,
    ) -> ReassemblyOutcome {
        match error {
            FragmentError::Offset => self.stats.offset_errors += 1,
            FragmentError::Length => self.stats.length_errors += 1,
            FragmentError::Overlap => self.stats.overlaps_rejected += 1,
        }
        log::debug!(
            "[Reass] {:?} offset={} len={} rejected: {}",
            fragment.key,
            fragment.offset,
            fragment.payload.len(),
            error
        );
        ReassemblyOutcome::Error(error)
    }

    /// Return a buffer to the pool.
    pub fn release(&mut self, handle: BufferHandle) -> Result<(), PoolError> {
        self.pool.release(handle)
    }

    /// Borrow a buffer.
    pub fn buffer(&self, handle: BufferHandle) -> Result<&ReassemblyBuffer, PoolError> {
        self.pool.get(handle)
    }

    /// Reassembled payload `[0, high_water_mark)`.
    pub fn payload(&self, handle: BufferHandle) -> Result<&[u8], PoolError> {
        self.pool.payload(handle)
    }

    /// Stored header followed by the payload.
    pub fn datagram(&self, handle: BufferHandle) -> Result<&[u8], PoolError> {
        self.pool.datagram(handle)
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> ReassemblyStats {
        let mut stats = self.stats.clone();
        stats.buffers_in_use = self.pool.in_use();
        stats
    }

    /// Statistics snapshot; counters reset to zero.
    pub fn take_stats(&mut self) -> ReassemblyStats {
        let stats = self.stats();
        self.stats = ReassemblyStats::default();
        stats
    }
}
