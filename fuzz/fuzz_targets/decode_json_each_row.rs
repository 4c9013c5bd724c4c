//! Fuzz the JSONEachRow decoder with arbitrary fragmentation.

#![no_main]

use colstore_formats::{JsonEachRowDecoder, RowDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = JsonEachRowDecoder::<serde_json::Value>::new();
    for piece in data.chunks(7) {
        decoder.feed(piece);
        while let Ok(Some(_)) = decoder.try_next() {}
    }
    let _ = decoder.finish();
});
