#![no_main]

use libfuzzer_sys::fuzz_target;
use wps_net::{decode, Inbound, Reassembler};

fuzz_target!(|data: &[u8]| {
    // Only panics are interesting; every input must decode or be rejected.
    if let Ok(Inbound::Wsc { frame, .. }) = decode(data) {
        let mut reassembler = Reassembler::new();
        let _ = reassembler.push(&frame);
    }
});
