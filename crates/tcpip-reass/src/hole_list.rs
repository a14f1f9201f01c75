// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RFC 815 hole descriptor list.
//!
//! Each reassembly buffer tracks the byte ranges it has not received yet as
//! a singly linked list of holes, sorted by first byte. Descriptors live in
//! an arena with one [`Slot`] per fragmentation unit of the datagram, so a
//! hole starting at byte `b` is stored at slot `b / FRAGMENT_UNIT`. No
//! bookkeeping memory exists outside the arena apart from the dummy head.
//!
//! # Insertion
//!
//! ```text
//! hole H:         [first ..................................... last]
//! fragment:                [f.first ........ f.last]
//! result:         [first .. f.first-1]              [f.last+1 .. last]
//!                  front remainder                   trailing hole (MF only)
//! ```
//!
//! A fragment must lie entirely inside one hole. Anything else is an
//! overlap and is rejected without touching the list (RFC 5722, applied to
//! IPv4 as well). A final fragment must also lie in the last hole, and that
//! hole must still reach the ceiling, so only the first final fragment can
//! fix the datagram length.
//!
//! # Step ordering
//!
//! A hole's descriptor is copied out and the list relinked before any
//! payload byte is written. [`HoleList::carve`] is the only producer of a
//! [`Placement`], and [`Placement::commit`] is the only way to copy payload
//! into the buffer, so the ordering holds by construction.

use crate::config::FRAGMENT_UNIT;
use crate::error::FragmentError;
use crate::fragment::FragmentRange;

/// One unreceived byte range `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoleDescriptor {
    /// First missing byte.
    pub first: usize,
    /// Last missing byte (inclusive).
    pub last: usize,
    /// Slot index of the next hole, `None` at end of list.
    next: Option<usize>,
}

/// Arena slot for one fragmentation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// A hole starts at this unit.
    Hole(HoleDescriptor),
    /// Payload bytes only, no descriptor.
    Data,
}

/// Result of a successful insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Holes remain.
    Incomplete,
    /// Hole list is empty.
    Complete,
}

/// Permission to write one fragment's payload.
///
/// Issued by [`HoleList::carve`] after the hole list no longer references
/// the bytes it covers.
#[must_use = "a carved range must be filled with its payload"]
#[derive(Debug)]
pub struct Placement {
    first: usize,
    len: usize,
}

impl Placement {
    /// First byte offset.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Copy `payload` into `area` at the carved offset.
    ///
    /// Returns the offset one past the last written byte.
    pub fn commit(self, area: &mut [u8], payload: &[u8]) -> Result<usize, FragmentError> {
        if payload.len() != self.len {
            return Err(FragmentError::Length);
        }
        let end = self.first + self.len;
        let dst = area
            .get_mut(self.first..end)
            .ok_or(FragmentError::Offset)?;
        dst.copy_from_slice(payload);
        Ok(end)
    }
}

/// Hole list of one reassembly buffer.
#[derive(Debug)]
pub struct HoleList {
    /// Next link of the dummy head node.
    head: Option<usize>,
    slots: Box<[Slot]>,
    ceiling: usize,
}

impl HoleList {
    /// List covering `[0, ceiling)` as a single hole.
    ///
    /// A zero ceiling yields an empty, already complete list that accepts
    /// no fragment.
    pub fn new(ceiling: usize) -> Self {
        let units = ceiling.div_ceil(FRAGMENT_UNIT).max(1);
        let mut list = Self {
            head: None,
            slots: vec![Slot::Data; units].into_boxed_slice(),
            ceiling,
        };
        list.reset();
        list
    }

    /// Forget all received ranges: one hole spanning the whole ceiling.
    pub fn reset(&mut self) {
        self.slots.fill(Slot::Data);
        if self.ceiling == 0 {
            self.head = None;
            return;
        }
        self.slots[0] = Slot::Hole(HoleDescriptor {
            first: 0,
            last: self.ceiling - 1,
            next: None,
        });
        self.head = Some(0);
    }

    /// Datagram ceiling this list was built for.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// True once every hole has been filled.
    pub fn is_complete(&self) -> bool {
        self.head.is_none()
    }

    /// Completion state.
    pub fn completion(&self) -> Completion {
        if self.is_complete() {
            Completion::Complete
        } else {
            Completion::Incomplete
        }
    }

    /// Iterate holes in list order.
    pub fn holes(&self) -> Holes<'_> {
        Holes {
            list: self,
            cursor: self.head,
        }
    }

    /// Remove `range` from the hole list.
    ///
    /// On [`FragmentError::Overlap`] the list is unchanged.
    pub fn carve(&mut self, range: &FragmentRange) -> Result<Placement, FragmentError> {
        let (prev, index, hole) = self.find(range).ok_or(FragmentError::Overlap)?;

        // A final fragment may only truncate the open-ended last hole. Any
        // later hole, or data already received past this hole, means bytes
        // beyond the declared end exist.
        if !range.more() && (hole.next.is_some() || hole.last + 1 != self.ceiling) {
            return Err(FragmentError::Overlap);
        }

        // `hole` is a copy: slot `index` may be overwritten from here on.
        let front = range.first() > hole.first;
        let back = range.last() < hole.last && range.more();
        let mut successor = hole.next;

        if back {
            // A non-final range ends on a unit boundary, so the tail hole
            // starts its own slot past the fragment.
            let tail = HoleDescriptor {
                first: range.end(),
                last: hole.last,
                next: hole.next,
            };
            let tail_index = tail.first / FRAGMENT_UNIT;
            self.slots[tail_index] = Slot::Hole(tail);
            successor = Some(tail_index);
            log::trace!(
                "[HoleList] tail hole [{}, {}] after fragment [{}, {}]",
                tail.first,
                tail.last,
                range.first(),
                range.last()
            );
        }

        if front {
            self.slots[index] = Slot::Hole(HoleDescriptor {
                first: hole.first,
                last: range.first() - 1,
                next: successor,
            });
        } else {
            self.slots[index] = Slot::Data;
            self.link(prev, successor);
        }

        Ok(Placement {
            first: range.first(),
            len: range.len(),
        })
    }

    /// Find the hole containing `range`: (predecessor, slot index, copy).
    fn find(&self, range: &FragmentRange) -> Option<(Option<usize>, usize, HoleDescriptor)> {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let hole = self.hole_at(index)?;
            if range.first() >= hole.first && range.last() <= hole.last {
                return Some((prev, index, hole));
            }
            if hole.first > range.last() {
                // Sorted list: no later hole can contain the range.
                return None;
            }
            prev = Some(index);
            cursor = hole.next;
        }
        None
    }

    fn hole_at(&self, index: usize) -> Option<HoleDescriptor> {
        match self.slots.get(index) {
            Some(Slot::Hole(hole)) => Some(*hole),
            _ => None,
        }
    }

    fn link(&mut self, prev: Option<usize>, next: Option<usize>) {
        match prev {
            None => self.head = next,
            Some(index) => {
                if let Some(Slot::Hole(hole)) = self.slots.get_mut(index) {
                    hole.next = next;
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

/// Iterator over holes as `(first, last)`.
pub struct Holes<'a> {
    list: &'a HoleList,
    cursor: Option<usize>,
}

impl Iterator for Holes<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let hole = self.list.hole_at(self.cursor?)?;
        self.cursor = hole.next;
        Some((hole.first, hole.last))
    }
}

#[cfg(test)]
#[path = "hole_list_tests.rs"]
mod tests;
