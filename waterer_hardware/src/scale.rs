//! Scale line reader.
//!
//! The scale streams ASCII lines at 9600 baud. Byte 0 is a status flag and
//! bytes 1..=8 hold the signed weight in grams, e.g. `X+0123.45\r\n`.

use std::io::{ErrorKind, Read};

use tracing::{debug, trace};
use waterer_traits::{BoxError, Scale};

use crate::error::{HwError, ScaleError};

pub const SCALE_BAUD_RATE: u32 = 9600;

/// Byte range of the weight field inside a line.
const FIELD: std::ops::Range<usize> = 1..9;

/// Parse one raw line. An empty line means the scale has nothing yet.
pub fn parse_reading(line: &[u8]) -> Result<Option<f64>, ScaleError> {
    if line.is_empty() {
        return Ok(None);
    }
    let end = FIELD.end.min(line.len());
    let field = line.get(FIELD.start..end).unwrap_or_default();
    let text = std::str::from_utf8(field)
        .map_err(|_| ScaleError::MalformedReading(String::from_utf8_lossy(line).into_owned()))?;
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite())
        .map(Some)
        .ok_or_else(|| ScaleError::MalformedReading(String::from_utf8_lossy(line).into_owned()))
}

/// Non-blocking line assembler over a scale port.
///
/// Bytes are buffered across polls, so a line split over two reads is still
/// returned whole.
pub struct LineScale<R> {
    port: R,
    line_ending: u8,
    pending: Vec<u8>,
}

impl<R: Read> LineScale<R> {
    pub fn new(port: R) -> Self {
        Self::with_line_ending(port, b'\n')
    }

    pub fn with_line_ending(port: R, line_ending: u8) -> Self {
        Self {
            port,
            line_ending,
            pending: Vec::new(),
        }
    }

    /// Next complete line (terminator included), or empty when none is ready.
    pub fn read_line(&mut self) -> Result<Vec<u8>, ScaleError> {
        let mut b = [0u8; 1];
        loop {
            match self.port.read(&mut b) {
                Ok(0) => return Ok(Vec::new()),
                Ok(_) => {
                    self.pending.push(b[0]);
                    if b[0] == self.line_ending {
                        let line = std::mem::take(&mut self.pending);
                        trace!(line = %String::from_utf8_lossy(&line).trim_end(), "scale line");
                        return Ok(line);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(Vec::new());
                }
                Err(e) => return Err(ScaleError::Io(e)),
            }
        }
    }
}

impl<R: Read> Scale for LineScale<R> {
    fn read_weight(&mut self) -> Result<Option<f64>, BoxError> {
        let line = self.read_line().map_err(HwError::from)?;
        let grams = parse_reading(&line).map_err(HwError::from)?;
        if let Some(g) = grams {
            debug!(weight_g = g, "scale reading");
        }
        Ok(grams)
    }
}
