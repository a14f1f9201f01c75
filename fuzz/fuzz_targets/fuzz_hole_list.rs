// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use tcpip_reass::{FragmentRange, HoleList};

const CEILING: usize = 1500;

fuzz_target!(|data: &[u8]| {
    let mut list = HoleList::new(CEILING);
    let mut area = vec![0u8; CEILING];

    for record in data.chunks_exact(4) {
        let offset = usize::from(u16::from_be_bytes([record[0], record[1]]));
        let len = usize::from(record[2]);
        let more = record[3] & 0x01 != 0;

        let Ok(range) = FragmentRange::validate(offset, len, more, CEILING) else {
            continue;
        };
        if let Ok(placement) = list.carve(&range) {
            let payload = vec![record[3]; range.len()];
            assert!(placement.commit(&mut area, &payload).is_ok());
        }

        // Holes stay sorted, disjoint and inside the ceiling.
        let mut prev_last: Option<usize> = None;
        for (first, last) in list.holes() {
            assert!(first <= last && last < CEILING);
            if let Some(p) = prev_last {
                assert!(p < first);
            }
            prev_last = Some(last);
        }

        if list.is_complete() {
            list.reset();
        }
    }
});
