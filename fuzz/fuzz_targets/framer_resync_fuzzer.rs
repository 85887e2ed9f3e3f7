//! Fuzz target for the bundle framer's resync scanning.
//!
//! Arbitrary byte streams must never panic and must always make forward
//! progress: the framer either returns an empty tail or a strictly shorter
//! one than the input, never looping forever on adversarial input.

#![no_main]

use animlock_proto::framer::scan;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (_items, tail) = scan(data);
    assert!(tail.len() <= data.len());
});
