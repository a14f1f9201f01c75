// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed pool of reassembly buffers.
//!
//! All buffers are sized and allocated once in [`BufferPool::new`]; no
//! allocation happens afterwards. Each buffer is laid out as:
//!
//! ```text
//! +------------------------+----------------------------------+-----+
//! |  header area           |  payload (datagram ceiling)      | pad |
//! +------------------------+----------------------------------+-----+
//!          ^ header_start   ^ header_area
//! ```
//!
//! The first fragment's IP header is stored right-aligned in the header
//! area, so header and payload form one contiguous datagram.
//!
//! Handles carry a generation counter. A handle issued before the buffer
//! was released or reclaimed is rejected with [`PoolError::StaleHandle`].

use crate::clock::Tick;
use crate::config::{ConfigError, ReassemblyConfig};
use crate::error::{FragmentError, PoolError};
use crate::fragment::{FragmentDescriptor, FragmentRange};
use crate::hole_list::{Completion, HoleList};
use crate::key::{AddressFamily, ChannelKey};

/// Handle to an allocated reassembly buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    index: u16,
    generation: u32,
}

impl BufferHandle {
    /// Buffer index within the pool.
    pub fn index(self) -> usize {
        usize::from(self.index)
    }
}

/// One reassembly buffer.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    data: Box<[u8]>,
    header_area: usize,
    header_start: usize,
    used: bool,
    key: ChannelKey,
    timestamp: Tick,
    high_water_mark: usize,
    holes: HoleList,
    generation: u32,
}

impl ReassemblyBuffer {
    fn new(config: &ReassemblyConfig) -> Self {
        Self {
            data: vec![0u8; config.buffer_capacity()].into_boxed_slice(),
            header_area: config.max_header_len,
            header_start: config.max_header_len,
            used: false,
            key: ChannelKey::new(AddressFamily::V4, 0, [0; 16], [0; 16]),
            timestamp: Tick::default(),
            high_water_mark: 0,
            holes: HoleList::new(config.max_datagram_size),
            generation: 0,
        }
    }

    fn allocate(&mut self, key: ChannelKey, now: Tick) {
        self.holes.reset();
        self.used = true;
        self.key = key;
        self.timestamp = now;
        self.high_water_mark = 0;
        self.header_start = self.header_area;
        self.generation = self.generation.wrapping_add(1);
    }

    fn clear(&mut self) {
        self.holes.reset();
        self.used = false;
        self.generation = self.generation.wrapping_add(1);
    }

    fn handle(&self, index: usize) -> BufferHandle {
        BufferHandle {
            // Pool size is bounded by ReassemblyConfig::validate.
            index: index as u16,
            generation: self.generation,
        }
    }

    /// Buffer is owned by a channel.
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Owning channel.
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Tick of allocation.
    pub fn timestamp(&self) -> Tick {
        self.timestamp
    }

    /// Highest payload offset written so far, plus one.
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Outstanding holes.
    pub fn holes(&self) -> &HoleList {
        &self.holes
    }

    /// Payload bytes `[0, high_water_mark)`.
    pub fn payload(&self) -> &[u8] {
        &self.data[self.header_area..self.header_area + self.high_water_mark]
    }

    /// Stored header of the offset-0 fragment; empty if none arrived yet.
    pub fn header(&self) -> &[u8] {
        &self.data[self.header_start..self.header_area]
    }

    /// Header followed by payload.
    pub fn datagram(&self) -> &[u8] {
        &self.data[self.header_start..self.header_area + self.high_water_mark]
    }

    /// Place one validated fragment.
    pub(crate) fn insert(
        &mut self,
        range: &FragmentRange,
        payload: &[u8],
    ) -> Result<Completion, FragmentError> {
        if payload.len() != range.len() {
            return Err(FragmentError::Length);
        }
        let area = self.data.len() - self.header_area;
        if range.end() > self.holes.ceiling() || range.end() > area {
            return Err(FragmentError::Offset);
        }

        let placement = self.holes.carve(range)?;
        let end = placement.commit(&mut self.data[self.header_area..], payload)?;
        self.high_water_mark = self.high_water_mark.max(end);
        Ok(self.holes.completion())
    }

    fn store_header(&mut self, header: &[u8]) -> Result<(), PoolError> {
        let start = self
            .header_area
            .checked_sub(header.len())
            .ok_or(PoolError::HeaderTooLong {
                len: header.len(),
                max: self.header_area,
            })?;
        self.data[start..self.header_area].copy_from_slice(header);
        self.header_start = start;
        Ok(())
    }
}

/// Pool of reassembly buffers.
#[derive(Debug)]
pub struct BufferPool {
    buffers: Box<[ReassemblyBuffer]>,
    timeout: u32,
}

impl BufferPool {
    /// Allocate every buffer up front.
    pub fn new(config: &ReassemblyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let buffers = (0..config.buffer_count)
            .map(|_| ReassemblyBuffer::new(config))
            .collect();
        log::debug!(
            "[ReassPool] {} buffers x {} bytes reserved",
            config.buffer_count,
            config.buffer_capacity()
        );
        Ok(Self {
            buffers,
            timeout: config.timeout_ticks,
        })
    }

    /// Number of buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Always false for a validated pool.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Payload bytes each buffer can hold (the datagram ceiling).
    pub fn capacity(&self) -> usize {
        self.buffers.first().map_or(0, |b| b.holes.ceiling())
    }

    /// Buffers currently owned by a channel.
    pub fn in_use(&self) -> usize {
        self.buffers.iter().filter(|b| b.used).count()
    }

    /// In-use buffer owned by `key`.
    pub fn find_by_channel(&self, key: &ChannelKey) -> Option<BufferHandle> {
        self.buffers
            .iter()
            .enumerate()
            .find(|(_, b)| b.used && b.key.matches(key))
            .map(|(i, b)| b.handle(i))
    }

    /// Buffer a fragment belongs to, if any.
    ///
    /// Atomic fragments (RFC 6946) never join an in-flight reassembly.
    pub fn lookup(&self, fragment: &FragmentDescriptor<'_>) -> Option<BufferHandle> {
        if fragment.is_atomic() {
            return None;
        }
        self.find_by_channel(&fragment.key)
    }

    /// Claim a free buffer, else reclaim an expired one.
    pub fn allocate(&mut self, key: ChannelKey, now: Tick) -> Option<BufferHandle> {
        self.allocate_tracked(key, now).map(|(handle, _)| handle)
    }

    /// Like [`allocate`](Self::allocate); also reports whether an expired
    /// buffer was reclaimed.
    pub(crate) fn allocate_tracked(
        &mut self,
        key: ChannelKey,
        now: Tick,
    ) -> Option<(BufferHandle, bool)> {
        let timeout = self.timeout;
        let (index, reclaimed) = match self.buffers.iter().position(|b| !b.used) {
            Some(index) => (index, false),
            None => {
                let index = self
                    .buffers
                    .iter()
                    .position(|b| now.is_expired(b.timestamp, timeout))?;
                log::debug!(
                    "[ReassPool] reclaiming expired buffer {} ({:?}, age {})",
                    index,
                    self.buffers[index].key,
                    now.age_since(self.buffers[index].timestamp)
                );
                self.buffers[index].clear();
                (index, true)
            }
        };

        let buffer = &mut self.buffers[index];
        buffer.allocate(key, now);
        Some((buffer.handle(index), reclaimed))
    }

    /// Return a buffer to the free state.
    pub fn release(&mut self, handle: BufferHandle) -> Result<(), PoolError> {
        self.get_mut(handle)?.clear();
        Ok(())
    }

    /// Buffer age exceeds the reassembly timeout.
    pub fn is_expired(&self, handle: BufferHandle, now: Tick) -> Result<bool, PoolError> {
        let buffer = self.get(handle)?;
        Ok(now.is_expired(buffer.timestamp, self.timeout))
    }

    /// Store the IP header of the offset-0 fragment.
    pub fn store_header(&mut self, handle: BufferHandle, header: &[u8]) -> Result<(), PoolError> {
        self.get_mut(handle)?.store_header(header)
    }

    /// Reassembled payload `[0, high_water_mark)`.
    pub fn payload(&self, handle: BufferHandle) -> Result<&[u8], PoolError> {
        Ok(self.get(handle)?.payload())
    }

    /// Stored header followed by the payload.
    pub fn datagram(&self, handle: BufferHandle) -> Result<&[u8], PoolError> {
        Ok(self.get(handle)?.datagram())
    }

    /// Borrow a buffer by handle.
    pub fn get(&self, handle: BufferHandle) -> Result<&ReassemblyBuffer, PoolError> {
        let buffer = self
            .buffers
            .get(handle.index())
            .ok_or(PoolError::InvalidHandle)?;
        if !buffer.used || buffer.generation != handle.generation {
            return Err(PoolError::StaleHandle);
        }
        Ok(buffer)
    }

    pub(crate) fn get_mut(
        &mut self,
        handle: BufferHandle,
    ) -> Result<&mut ReassemblyBuffer, PoolError> {
        let buffer = self
            .buffers
            .get_mut(handle.index())
            .ok_or(PoolError::InvalidHandle)?;
        if !buffer.used || buffer.generation != handle.generation {
            return Err(PoolError::StaleHandle);
        }
        Ok(buffer)
    }

    /// Buffer behind a handle this pool issued during the current call.
    pub(crate) fn slot_mut(&mut self, handle: BufferHandle) -> &mut ReassemblyBuffer {
        &mut self.buffers[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn config(buffer_count: usize) -> ReassemblyConfig {
        ReassemblyConfig {
            buffer_count,
            ..Default::default()
        }
    }

    fn key(id: u16) -> ChannelKey {
        ChannelKey::ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), id, 17)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert_eq!(
            BufferPool::new(&config(0)).unwrap_err(),
            ConfigError::BufferCount(0)
        );
    }

    #[test]
    fn test_allocate_and_find() {
        let mut pool = BufferPool::new(&config(2)).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.capacity(), 1500);
        assert!(pool.find_by_channel(&key(1)).is_none());

        let handle = pool.allocate(key(1), Tick(0)).unwrap();
        assert_eq!(pool.find_by_channel(&key(1)), Some(handle));
        assert!(pool.find_by_channel(&key(2)).is_none());
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    fn test_exhaustion_then_release() {
        let mut pool = BufferPool::new(&config(2)).unwrap();
        let a = pool.allocate(key(1), Tick(0)).unwrap();
        pool.allocate(key(2), Tick(0)).unwrap();
        assert!(pool.allocate(key(3), Tick(0)).is_none());

        pool.release(a).unwrap();
        let c = pool.allocate(key(3), Tick(0)).unwrap();
        assert_eq!(c.index(), a.index());
        assert_ne!(c, a);
    }

    #[test]
    fn test_free_buffer_preferred_over_expired() {
        let mut pool = BufferPool::new(&config(2)).unwrap();
        let old = pool.allocate(key(1), Tick(0)).unwrap();

        let (fresh, reclaimed) = pool.allocate_tracked(key(2), Tick(100)).unwrap();
        assert!(!reclaimed);
        assert_ne!(fresh.index(), old.index());
        assert!(pool.get(old).is_ok());
    }

    #[test]
    fn test_expired_buffer_reclaimed() {
        let mut pool = BufferPool::new(&config(1)).unwrap();
        let old = pool.allocate(key(1), Tick(0)).unwrap();

        // Age 50 is not yet expired with the default timeout of 50.
        assert!(pool.allocate(key(2), Tick(50)).is_none());

        let (new, reclaimed) = pool.allocate_tracked(key(2), Tick(51)).unwrap();
        assert!(reclaimed);
        assert_eq!(pool.get(old).unwrap_err(), PoolError::StaleHandle);
        assert_eq!(pool.get(new).unwrap().key(), &key(2));
        assert!(pool.find_by_channel(&key(1)).is_none());
    }

    #[test]
    fn test_release_twice_is_stale() {
        let mut pool = BufferPool::new(&config(1)).unwrap();
        let handle = pool.allocate(key(1), Tick(0)).unwrap();
        pool.release(handle).unwrap();
        assert_eq!(pool.release(handle), Err(PoolError::StaleHandle));
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_invalid_handle_index() {
        let mut big = BufferPool::new(&config(4)).unwrap();
        let mut small = BufferPool::new(&config(1)).unwrap();
        big.allocate(key(1), Tick(0)).unwrap();
        big.allocate(key(2), Tick(0)).unwrap();
        let foreign = big.allocate(key(3), Tick(0)).unwrap();
        assert_eq!(small.release(foreign), Err(PoolError::InvalidHandle));
    }

    #[test]
    fn test_lookup_skips_atomic_fragment() {
        let mut pool = BufferPool::new(&config(1)).unwrap();
        pool.allocate(key(1), Tick(0)).unwrap();

        let data = [0u8; 8];
        let atomic = FragmentDescriptor::new(key(1), 0, &data, false);
        assert!(pool.lookup(&atomic).is_none());

        let first = FragmentDescriptor::new(key(1), 0, &data, true);
        assert!(pool.lookup(&first).is_some());
    }

    #[test]
    fn test_store_header_and_datagram() {
        let mut pool = BufferPool::new(&config(1)).unwrap();
        let handle = pool.allocate(key(1), Tick(0)).unwrap();

        let range = FragmentRange::validate(0, 4, false, 1500).unwrap();
        pool.get_mut(handle)
            .unwrap()
            .insert(&range, &[1, 2, 3, 4])
            .unwrap();
        pool.store_header(handle, &[0x45; 20]).unwrap();

        let buffer = pool.get(handle).unwrap();
        assert_eq!(buffer.header(), &[0x45; 20]);
        assert_eq!(buffer.payload(), &[1, 2, 3, 4]);
        assert_eq!(buffer.datagram().len(), 24);
        assert_eq!(&buffer.datagram()[20..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_store_header_too_long() {
        let mut pool = BufferPool::new(&config(1)).unwrap();
        let handle = pool.allocate(key(1), Tick(0)).unwrap();
        assert_eq!(
            pool.store_header(handle, &[0u8; 61]),
            Err(PoolError::HeaderTooLong { len: 61, max: 60 })
        );
    }

    #[test]
    fn test_reallocation_resets_state() {
        let mut pool = BufferPool::new(&config(1)).unwrap();
        let handle = pool.allocate(key(1), Tick(0)).unwrap();
        let range = FragmentRange::validate(0, 8, true, 1500).unwrap();
        pool.get_mut(handle).unwrap().insert(&range, &[9; 8]).unwrap();
        pool.store_header(handle, &[1; 20]).unwrap();
        pool.release(handle).unwrap();

        let handle = pool.allocate(key(2), Tick(5)).unwrap();
        let buffer = pool.get(handle).unwrap();
        assert_eq!(buffer.high_water_mark(), 0);
        assert!(buffer.header().is_empty());
        assert_eq!(buffer.timestamp(), Tick(5));
        assert_eq!(buffer.holes().holes().collect::<Vec<_>>(), vec![(0, 1499)]);
    }
}
