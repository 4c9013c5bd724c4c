//! Fuzz the DSN parser.

#![no_main]

use colstore_client::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Config::from_dsn(text);
    }
});
