#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use waterer_hardware::pump::{MAX_RESPONSE_LEN, STX, read_response};

fuzz_target!(|data: &[u8]| {
    if let Ok(resp) = read_response(&mut Cursor::new(data)) {
        assert_eq!(resp.as_bytes().first(), Some(&STX));
        assert!(resp.as_bytes().len() <= MAX_RESPONSE_LEN);
    }
});
