// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::net::Ipv4Addr;
use tcpip_reass::{
    ChannelKey, FragmentDescriptor, Ipv4FragmentInfo, Reassembler, ReassemblyConfig,
    ReassemblyOutcome,
};

// Record: [channel, frag word hi, frag word lo, length, control]
const RECORD_LEN: usize = 5;

fuzz_target!(|data: &[u8]| {
    let config = ReassemblyConfig {
        buffer_count: 3,
        timeout_ticks: 4,
        ..Default::default()
    };
    let Ok(mut reassembler) = Reassembler::new(config) else {
        return;
    };
    let payload = [0xA5u8; 256];
    let header = [0x45u8; 20];

    for record in data.chunks_exact(RECORD_LEN) {
        let key = ChannelKey::ipv4(
            Ipv4Addr::new(10, 0, 0, record[0] & 0x03),
            Ipv4Addr::new(10, 0, 0, 254),
            u16::from(record[0] >> 2),
            17,
        );
        let info = Ipv4FragmentInfo::from_raw(u16::from_be_bytes([record[1], record[2]]));
        let len = usize::from(record[3]);
        let control = record[4];

        let mut fragment =
            FragmentDescriptor::new(key, info.offset, &payload[..len], info.more_fragments);
        if control & 0x01 != 0 {
            fragment = fragment.with_header(&header);
        }

        match reassembler.on_fragment(&fragment) {
            ReassemblyOutcome::Complete(handle) => {
                let datagram = reassembler.datagram(handle).map(<[u8]>::len);
                assert!(datagram.is_ok());
                let _ = reassembler.release(handle);
            }
            ReassemblyOutcome::Timeout(handle) => {
                let _ = reassembler.release(handle);
            }
            _ => {}
        }

        if control & 0x02 != 0 {
            reassembler.age_tick();
        }
    }

    assert!(reassembler.stats().buffers_in_use <= 3);
});
