//! Fuzz the chunked transfer-encoding decoder.

#![no_main]

use bytes::BytesMut;
use colstore_http::ChunkedDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = ChunkedDecoder::new();
    let mut buf = BytesMut::from(data);
    // Drive to a fixpoint; errors are fine, panics are not.
    while let Ok(Some(_)) = decoder.decode(&mut buf) {}
});
