//! Barcode scanner HID report decoder.
//!
//! The scanner emulates a keyboard and the station reads its raw input reports
//! (8 bytes each) straight from the hidraw node. Every nonzero byte from the
//! configured offset onwards is interpreted:
//!
//! - `40` (Enter) terminates the code,
//! - `2` (the left-shift modifier bit) selects the shifted table for the next
//!   mapped keycode only,
//! - anything else is a usage id looked up in the active table.

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use tracing::{debug, trace};
use waterer_traits::{BarcodeScanner, BoxError};

use crate::error::{DecodeError, HwError};

/// Size of one input report.
pub const REPORT_LEN: usize = 8;
/// Enter key usage id; ends a code.
pub const TERMINATOR_KEYCODE: u8 = 40;
/// Left-shift modifier as it appears in the report.
pub const SHIFT_KEYCODE: u8 = 2;

/// Unshifted usage id table: lowercase, digits, unshifted punctuation.
pub fn unshifted_char(code: u8) -> Option<char> {
    Some(match code {
        4..=29 => (b'a' + (code - 4)) as char,
        30..=38 => (b'1' + (code - 30)) as char,
        39 => '0',
        44 => ' ',
        45 => '-',
        46 => '=',
        47 => '[',
        48 => ']',
        49 => '\\',
        51 => ';',
        52 => '\'',
        53 => '~',
        54 => ',',
        55 => '.',
        56 => '/',
        _ => return None,
    })
}

/// Shifted usage id table: uppercase and shifted punctuation.
pub fn shifted_char(code: u8) -> Option<char> {
    const DIGIT_ROW: [char; 10] = ['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'];
    Some(match code {
        4..=29 => (b'A' + (code - 4)) as char,
        30..=39 => DIGIT_ROW[(code - 30) as usize],
        44 => ' ',
        45 => '_',
        46 => '+',
        47 => '{',
        48 => '}',
        49 => '|',
        51 => ':',
        52 => '"',
        53 => '~',
        54 => '<',
        55 => '>',
        56 => '?',
        _ => return None,
    })
}

/// Decoder configuration; every decode starts with shift released.
#[derive(Debug, Clone, Copy, Default)]
pub struct HidDecoder {
    first_byte: usize,
}

impl HidDecoder {
    /// `first_byte` is the first report offset carrying key data (0..8).
    pub fn new(first_byte: usize) -> Self {
        Self {
            first_byte: first_byte.min(REPORT_LEN),
        }
    }

    pub fn first_byte(&self) -> usize {
        self.first_byte
    }

    /// Fresh per-scan state for report-at-a-time decoding.
    pub fn assembler(&self) -> ScanAssembler {
        ScanAssembler {
            first_byte: self.first_byte,
            ..ScanAssembler::default()
        }
    }

    /// Decode one code, blocking on `reader` until the terminator arrives.
    pub fn decode<R: Read>(&self, reader: &mut R) -> Result<String, DecodeError> {
        self.decode_next(reader)?.ok_or(DecodeError::EndOfStream)
    }

    /// Lazy sequence of codes. Ends when the stream ends between codes.
    pub fn scans<R: Read>(&self, reader: R) -> Scans<R> {
        Scans {
            decoder: *self,
            reader,
            done: false,
        }
    }

    /// `Ok(None)` when the stream ends before any report of a new code.
    fn decode_next<R: Read>(&self, reader: &mut R) -> Result<Option<String>, DecodeError> {
        let mut scan = self.assembler();
        let mut report = [0u8; REPORT_LEN];
        loop {
            if !read_report(reader, &mut report)? {
                return scan.end_of_stream();
            }
            if let Some(done) = scan.push(&report) {
                return done.map(Some);
            }
        }
    }
}

/// Accumulates one physical scan, report by report.
///
/// An unmapped keycode poisons the scan: the remaining keys up to the
/// terminator are swallowed and the scan completes as `UnknownKeycode`, so
/// the next scan never starts mid-frame.
#[derive(Debug, Clone, Default)]
pub struct ScanAssembler {
    first_byte: usize,
    out: String,
    shift: bool,
    unknown: Option<u8>,
    reports: usize,
}

impl ScanAssembler {
    /// True once any report of the current scan has arrived.
    pub fn in_progress(&self) -> bool {
        self.reports > 0
    }

    /// Feed one report; `Some` when it completed a scan. State resets after.
    pub fn push(&mut self, report: &[u8; REPORT_LEN]) -> Option<Result<String, DecodeError>> {
        self.reports += 1;
        trace!(?report, "hid report");
        for &code in report[self.first_byte..].iter().filter(|&&b| b != 0) {
            if code == TERMINATOR_KEYCODE {
                return Some(self.finish());
            }
            if code == SHIFT_KEYCODE {
                self.shift = true;
                continue;
            }
            if self.unknown.is_none() {
                let ch = if self.shift {
                    shifted_char(code)
                } else {
                    unshifted_char(code)
                };
                match ch {
                    Some(ch) => self.out.push(ch),
                    None => {
                        debug!(code, "unmapped keycode, discarding rest of scan");
                        self.unknown = Some(code);
                    }
                }
            }
            self.shift = false;
        }
        None
    }

    /// Stream closed: `Ok(None)` between scans, otherwise the scan's failure.
    pub fn end_of_stream(&mut self) -> Result<Option<String>, DecodeError> {
        let scan = self.take();
        match (scan.unknown, scan.reports) {
            (Some(code), _) => Err(DecodeError::UnknownKeycode(code)),
            (None, 0) => Ok(None),
            (None, _) => Err(DecodeError::EndOfStream),
        }
    }

    fn finish(&mut self) -> Result<String, DecodeError> {
        let scan = self.take();
        match scan.unknown {
            Some(code) => Err(DecodeError::UnknownKeycode(code)),
            None => {
                debug!(code = %scan.out, reports = scan.reports, "barcode decoded");
                Ok(scan.out)
            }
        }
    }

    fn take(&mut self) -> Self {
        let fresh = Self {
            first_byte: self.first_byte,
            ..Self::default()
        };
        std::mem::replace(self, fresh)
    }
}

/// Fill `report`; `Ok(false)` on a clean end of stream.
fn read_report<R: Read>(reader: &mut R, report: &mut [u8; REPORT_LEN]) -> Result<bool, DecodeError> {
    match reader.read_exact(report) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(DecodeError::Io(e)),
    }
}

/// Iterator returned by [`HidDecoder::scans`].
pub struct Scans<R> {
    decoder: HidDecoder,
    reader: R,
    done: bool,
}

impl<R: Read> Iterator for Scans<R> {
    type Item = Result<String, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.decode_next(&mut self.reader) {
            Ok(Some(code)) => Some(Ok(code)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                if matches!(e, DecodeError::EndOfStream | DecodeError::Io(_)) {
                    self.done = true;
                }
                Some(Err(e))
            }
        }
    }
}

/// Barcode scanner decoding straight from a byte source (test buffer, replay file).
/// Every call blocks until a whole scan has been read.
pub struct HidScanner<R> {
    decoder: HidDecoder,
    reader: R,
}

impl<R: Read> HidScanner<R> {
    pub fn new(reader: R, decoder: HidDecoder) -> Self {
        Self { decoder, reader }
    }
}

impl<R: Read> BarcodeScanner for HidScanner<R> {
    fn read_code(&mut self) -> Result<Option<String>, BoxError> {
        self.decoder
            .decode(&mut self.reader)
            .map(Some)
            .map_err(|e| HwError::from(e).into())
    }
}

/// Barcode scanner fed by a reader thread, so a poll gives up after
/// `poll_timeout` and the caller can check for shutdown between polls.
///
/// The thread owns the device node and exits when the scanner is dropped
/// and the next report arrives, or when the node fails.
pub struct PolledHidScanner {
    rx: xch::Receiver<std::io::Result<[u8; REPORT_LEN]>>,
    scan: ScanAssembler,
    poll_timeout: Duration,
}

impl PolledHidScanner {
    pub fn spawn<R: Read + Send + 'static>(
        mut reader: R,
        decoder: HidDecoder,
        poll_timeout: Duration,
    ) -> Self {
        let (tx, rx) = xch::bounded(64);
        std::thread::spawn(move || {
            loop {
                let mut report = [0u8; REPORT_LEN];
                let item = reader.read_exact(&mut report).map(|()| report);
                let failed = item.is_err();
                if tx.send(item).is_err() {
                    debug!("barcode consumer gone, reader thread exiting");
                    break;
                }
                if failed {
                    break;
                }
            }
            trace!("barcode reader thread exiting");
        });
        Self {
            rx,
            scan: decoder.assembler(),
            poll_timeout,
        }
    }
}

impl BarcodeScanner for PolledHidScanner {
    fn read_code(&mut self) -> Result<Option<String>, BoxError> {
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(Ok(report)) => {
                    if let Some(done) = self.scan.push(&report) {
                        return done.map(Some).map_err(|e| HwError::from(e).into());
                    }
                }
                Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    return match self.scan.end_of_stream() {
                        Ok(None) => Err(HwError::from(DecodeError::EndOfStream).into()),
                        Ok(Some(code)) => Ok(Some(code)),
                        Err(e) => Err(HwError::from(e).into()),
                    };
                }
                Ok(Err(e)) => return Err(HwError::from(DecodeError::Io(e)).into()),
                // Partial scans stay buffered for the next poll.
                Err(xch::RecvTimeoutError::Timeout) => return Ok(None),
                Err(xch::RecvTimeoutError::Disconnected) => {
                    return Err(HwError::from(DecodeError::EndOfStream).into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn report(keys: &[u8]) -> [u8; REPORT_LEN] {
        let mut r = [0u8; REPORT_LEN];
        r[..keys.len()].copy_from_slice(keys);
        r
    }

    fn stream(reports: &[[u8; REPORT_LEN]]) -> Cursor<Vec<u8>> {
        Cursor::new(reports.iter().flatten().copied().collect())
    }

    #[test]
    fn tables_cover_letters_and_digits() {
        assert_eq!(unshifted_char(4), Some('a'));
        assert_eq!(unshifted_char(29), Some('z'));
        assert_eq!(unshifted_char(30), Some('1'));
        assert_eq!(unshifted_char(39), Some('0'));
        assert_eq!(shifted_char(4), Some('A'));
        assert_eq!(shifted_char(31), Some('@'));
        assert_eq!(shifted_char(39), Some(')'));
        assert_eq!(unshifted_char(50), None);
        assert_eq!(shifted_char(TERMINATOR_KEYCODE), None);
    }

    #[test]
    fn decodes_digits_until_enter() {
        // "7" then "3" then Enter, one key per report like a real scanner.
        let mut s = stream(&[report(&[0, 0, 36]), report(&[0, 0, 32]), report(&[0, 0, 40])]);
        let code = HidDecoder::default().decode(&mut s).unwrap();
        assert_eq!(code, "73");
    }

    #[test]
    fn shift_applies_to_next_key_only() {
        let mut s = stream(&[report(&[2, 0, 4]), report(&[0, 0, 5]), report(&[0, 0, 40])]);
        assert_eq!(HidDecoder::default().decode(&mut s).unwrap(), "Ab");
    }

    #[test]
    fn first_byte_offset_skips_modifier_slot() {
        let mut s = stream(&[report(&[2, 0, 4]), report(&[0, 0, 40])]);
        assert_eq!(HidDecoder::new(2).decode(&mut s).unwrap(), "a");
    }

    #[test]
    fn unknown_keycode_is_reported() {
        let mut s = stream(&[report(&[0, 0, 50]), report(&[0, 0, 40])]);
        match HidDecoder::default().decode(&mut s) {
            Err(DecodeError::UnknownKeycode(50)) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_terminator_is_end_of_stream() {
        let mut s = stream(&[report(&[0, 0, 30])]);
        assert!(matches!(
            HidDecoder::default().decode(&mut s),
            Err(DecodeError::EndOfStream)
        ));
    }

    #[test]
    fn scans_restart_with_shift_released() {
        // A dangling shift at the end of the first code must not leak.
        let s = stream(&[
            report(&[0, 0, 30]),
            report(&[2, 0, 40]),
            report(&[0, 0, 4]),
            report(&[0, 0, 40]),
        ]);
        let codes: Vec<String> = HidDecoder::default()
            .scans(s)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(codes, vec!["1".to_string(), "a".to_string()]);
    }

    #[test]
    fn unknown_keycode_swallows_rest_of_scan() {
        // "9", unmapped 50, "7", Enter as one scan, then a clean "1" scan.
        let s = stream(&[
            report(&[0, 0, 38]),
            report(&[0, 0, 50]),
            report(&[0, 0, 36]),
            report(&[0, 0, 40]),
            report(&[0, 0, 30]),
            report(&[0, 0, 40]),
        ]);
        let results: Vec<Result<String, DecodeError>> = HidDecoder::default().scans(s).collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(DecodeError::UnknownKeycode(50))));
        assert_eq!(results[1].as_ref().unwrap(), "1");
    }

    #[test]
    fn scanner_does_not_resume_mid_frame() {
        let mut scanner = HidScanner::new(
            stream(&[
                report(&[0, 0, 38]),
                report(&[0, 0, 50]),
                report(&[0, 0, 36]),
                report(&[0, 0, 40]),
            ]),
            HidDecoder::default(),
        );
        assert!(scanner.read_code().is_err());
        let next = scanner.read_code().expect_err("stream is exhausted");
        let hw = next.downcast_ref::<HwError>().expect("HwError");
        assert!(matches!(hw, HwError::Decode(DecodeError::EndOfStream)));
    }

    #[test]
    fn assembler_completes_on_terminator_only() {
        let mut scan = HidDecoder::default().assembler();
        assert!(scan.push(&report(&[0, 0, 36])).is_none());
        assert!(scan.in_progress());
        assert_eq!(scan.push(&report(&[0, 0, 40])).unwrap().unwrap(), "7");
        assert!(!scan.in_progress());
        assert_eq!(scan.end_of_stream().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn polled_scanner_times_out_without_losing_partial_scan() {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let (mut device, node) = UnixStream::pair().unwrap();
        let mut scanner =
            PolledHidScanner::spawn(node, HidDecoder::default(), Duration::from_millis(20));

        assert_eq!(scanner.read_code().unwrap(), None);

        device.write_all(&report(&[0, 0, 36])).unwrap();
        assert_eq!(scanner.read_code().unwrap(), None);

        device.write_all(&report(&[0, 0, 32])).unwrap();
        device.write_all(&report(&[0, 0, 40])).unwrap();
        let code = (0..50)
            .find_map(|_| scanner.read_code().unwrap())
            .expect("scan completes");
        assert_eq!(code, "73");
    }

    #[cfg(unix)]
    #[test]
    fn polled_scanner_reports_closed_node() {
        use std::os::unix::net::UnixStream;

        let (device, node) = UnixStream::pair().unwrap();
        let mut scanner =
            PolledHidScanner::spawn(node, HidDecoder::default(), Duration::from_secs(5));
        drop(device);
        let err = scanner.read_code().expect_err("node closed");
        let hw = err.downcast_ref::<HwError>().expect("HwError");
        assert!(matches!(hw, HwError::Decode(DecodeError::EndOfStream)));
    }

    #[test]
    fn scanner_boxes_decode_errors() {
        let mut scanner = HidScanner::new(stream(&[report(&[0, 0, 50])]), HidDecoder::default());
        let err = scanner.read_code().expect_err("unknown keycode");
        let hw = err.downcast_ref::<HwError>().expect("HwError");
        assert!(matches!(hw, HwError::Decode(DecodeError::UnknownKeycode(50))));
    }
}
