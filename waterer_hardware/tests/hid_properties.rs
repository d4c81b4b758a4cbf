use std::io::Cursor;

use proptest::prelude::*;
use waterer_hardware::hid::{
    HidDecoder, REPORT_LEN, SHIFT_KEYCODE, TERMINATOR_KEYCODE, shifted_char, unshifted_char,
};

/// Usage ids present in both tables.
fn mapped_keycode() -> impl Strategy<Value = u8> {
    prop_oneof![4u8..=39, 44u8..=49, 51u8..=56]
}

/// One keystroke per report, with the shift modifier in byte 0 when pressed.
fn encode(keys: &[(bool, u8)]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity((keys.len() + 1) * REPORT_LEN);
    for &(shift, code) in keys {
        let mut report = [0u8; REPORT_LEN];
        if shift {
            report[0] = SHIFT_KEYCODE;
        }
        report[2] = code;
        bytes.extend_from_slice(&report);
    }
    let mut end = [0u8; REPORT_LEN];
    end[2] = TERMINATOR_KEYCODE;
    bytes.extend_from_slice(&end);
    bytes
}

proptest! {
    #[test]
    fn one_char_per_mapped_keycode(keys in prop::collection::vec((any::<bool>(), mapped_keycode()), 0..40)) {
        let mut stream = Cursor::new(encode(&keys));
        let decoded = HidDecoder::default().decode(&mut stream).unwrap();
        prop_assert_eq!(decoded.chars().count(), keys.len());
    }

    #[test]
    fn table_follows_shift_state_at_consumption(keys in prop::collection::vec((any::<bool>(), mapped_keycode()), 1..40)) {
        let mut stream = Cursor::new(encode(&keys));
        let decoded: Vec<char> = HidDecoder::default().decode(&mut stream).unwrap().chars().collect();
        for (ch, &(shift, code)) in decoded.iter().zip(keys.iter()) {
            let expected = if shift { shifted_char(code) } else { unshifted_char(code) };
            prop_assert_eq!(Some(*ch), expected);
        }
    }

    #[test]
    fn shift_only_reports_emit_nothing(presses in 0usize..6) {
        // Several shift-only reports followed by one key: only that key is shifted.
        let mut bytes = Vec::new();
        for _ in 0..presses {
            let mut r = [0u8; REPORT_LEN];
            r[0] = SHIFT_KEYCODE;
            bytes.extend_from_slice(&r);
        }
        bytes.extend(encode(&[(false, 4), (false, 5)]));
        let decoded = HidDecoder::default().decode(&mut Cursor::new(bytes)).unwrap();
        let expected = if presses > 0 { "Ab" } else { "ab" };
        prop_assert_eq!(decoded, expected);
    }
}
