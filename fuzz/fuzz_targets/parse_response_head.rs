//! Fuzz the incremental response-head parser.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buf = BytesMut::from(data);
    // Must never panic, whatever the split of outcomes.
    let _ = colstore_http::parse_response_head(&mut buf, 8 * 1024);
});
