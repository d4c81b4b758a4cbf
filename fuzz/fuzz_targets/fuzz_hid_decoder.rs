#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use waterer_hardware::hid::HidDecoder;

fuzz_target!(|data: &[u8]| {
    let offset = data.first().map(|b| (*b % 8) as usize).unwrap_or(0);
    for code in HidDecoder::new(offset).scans(Cursor::new(data)).take(64) {
        let _ = code;
    }
});
