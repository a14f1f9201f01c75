// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-safe reassembler handle.
//!
//! Fragment reception and the periodic aging tick usually run on
//! different threads. [`SharedReassembler`] serializes them behind one
//! mutex; clones share the same buffers.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::clock::Tick;
use crate::config::{ConfigError, ReassemblyConfig};
use crate::error::PoolError;
use crate::fragment::FragmentDescriptor;
use crate::pool::BufferHandle;
use crate::reassembler::{Reassembler, ReassemblyOutcome, ReassemblyStats};

/// Cloneable, lock-protected [`Reassembler`].
#[derive(Debug, Clone)]
pub struct SharedReassembler {
    inner: Arc<Mutex<Reassembler>>,
}

impl SharedReassembler {
    /// Create a shared reassembler.
    pub fn new(config: ReassemblyConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_reassembler(Reassembler::new(config)?))
    }

    /// Wrap an existing reassembler.
    pub fn from_reassembler(reassembler: Reassembler) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reassembler)),
        }
    }

    /// Lock for a multi-step sequence (insert, read, release).
    pub fn lock(&self) -> MutexGuard<'_, Reassembler> {
        self.inner.lock()
    }

    /// See [`Reassembler::on_fragment`].
    pub fn on_fragment(&self, fragment: &FragmentDescriptor<'_>) -> ReassemblyOutcome {
        self.inner.lock().on_fragment(fragment)
    }

    /// See [`Reassembler::reassemble`].
    pub fn reassemble(&self, fragment: &FragmentDescriptor<'_>, now: Tick) -> ReassemblyOutcome {
        self.inner.lock().reassemble(fragment, now)
    }

    /// See [`Reassembler::age_tick`].
    pub fn age_tick(&self) -> Tick {
        self.inner.lock().age_tick()
    }

    /// See [`Reassembler::release`].
    pub fn release(&self, handle: BufferHandle) -> Result<(), PoolError> {
        self.inner.lock().release(handle)
    }

    /// Run `f` on the reassembled datagram (header + payload) under the lock.
    pub fn with_datagram<R>(
        &self,
        handle: BufferHandle,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, PoolError> {
        let guard = self.inner.lock();
        Ok(f(guard.datagram(handle)?))
    }

    /// Copy out a completed datagram and release its buffer.
    pub fn take_datagram(&self, handle: BufferHandle) -> Result<Vec<u8>, PoolError> {
        let mut guard = self.inner.lock();
        let datagram = guard.datagram(handle)?.to_vec();
        guard.release(handle)?;
        Ok(datagram)
    }

    /// See [`Reassembler::stats`].
    pub fn stats(&self) -> ReassemblyStats {
        self.inner.lock().stats()
    }

    /// See [`Reassembler::take_stats`].
    pub fn take_stats(&self) -> ReassemblyStats {
        self.inner.lock().take_stats()
    }
}
