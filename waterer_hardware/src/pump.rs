//! Peristaltic pump serial protocol.
//!
//! Wire format:
//! ```text
//! Enquiry:        ENQ
//! Command frame:  STX 'P' <address:2> <verb> [value] CR
//! Speed register: 'P' <address:2> 'V' <speed:4> CR      (no STX)
//! ```
//!
//! Verbs: `R` reset/select, `I` identify, `S` signed revolution count
//! (`+0012`), `G` go, `H` halt. There is no length field and no checksum;
//! the UART runs at 4800 baud, 7 data bits, odd parity, 1 stop bit.
//!
//! A response starts with STX and lasts until the line goes quiet.

use std::io::{ErrorKind, Read, Write};

use tracing::{debug, trace};
use waterer_traits::{BoxError, Pump};

use crate::error::{HwError, ProtocolError};

pub const STX: u8 = 0x02;
pub const ENQ: u8 = 0x05;
pub const CR: u8 = 0x0D;

/// Address every pump on the bus answers to.
pub const BROADCAST_ADDRESS: u8 = 99;

pub const PUMP_BAUD_RATE: u32 = 4800;
pub const PUMP_DATA_BITS: u8 = 7;
pub const PUMP_STOP_BITS: u8 = 1;

/// Upper bound on a response; a chattering line must not grow the buffer forever.
pub const MAX_RESPONSE_LEN: usize = 256;

const MAX_FIELD: f64 = 9999.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PumpCommand {
    Enquiry,
    Identify,
    Reset,
    SetSpeed(f64),
    SetRevolutions(f64),
    Start,
    Stop,
}

impl PumpCommand {
    /// Build the wire bytes for the pump at `address`.
    pub fn encode(&self, address: u8) -> Result<Vec<u8>, ProtocolError> {
        if address > BROADCAST_ADDRESS {
            return Err(ProtocolError::InvalidAddress(address));
        }
        let frame = match self {
            PumpCommand::Enquiry => vec![ENQ],
            PumpCommand::Identify => framed(address, 'I', ""),
            PumpCommand::Reset => framed(address, 'R', ""),
            PumpCommand::Start => framed(address, 'G', ""),
            PumpCommand::Stop => framed(address, 'H', ""),
            PumpCommand::SetRevolutions(count) => {
                let magnitude = field_value(*count)?;
                let sign = if count.is_sign_negative() && magnitude > 0 {
                    '-'
                } else {
                    '+'
                };
                framed(address, 'S', &format!("{sign}{magnitude:04}"))
            }
            PumpCommand::SetSpeed(percent) => {
                if percent.is_sign_negative() && *percent != 0.0 {
                    return Err(ProtocolError::ValueOutOfRange(*percent));
                }
                let speed = percent.round();
                if !speed.is_finite() || speed > MAX_FIELD {
                    return Err(ProtocolError::ValueOutOfRange(*percent));
                }
                format!("P{address:02}V{:04}", speed as u32)
                    .into_bytes()
                    .into_iter()
                    .chain([CR])
                    .collect()
            }
        };
        Ok(frame)
    }

    /// Enquiry and identify are answered; motion commands are fire-and-forget.
    pub fn expects_response(&self) -> bool {
        matches!(self, PumpCommand::Enquiry | PumpCommand::Identify)
    }
}

fn framed(address: u8, verb: char, value: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(6 + value.len());
    frame.push(STX);
    frame.extend_from_slice(format!("P{address:02}{verb}{value}").as_bytes());
    frame.push(CR);
    frame
}

/// Integer part of `value`, which must fit the 4-digit field.
fn field_value(value: f64) -> Result<u32, ProtocolError> {
    let magnitude = value.abs().trunc();
    if !magnitude.is_finite() || magnitude > MAX_FIELD {
        return Err(ProtocolError::ValueOutOfRange(value));
    }
    Ok(magnitude as u32)
}

/// Raw response frame, STX included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpResponse(Vec<u8>);

impl PumpResponse {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload between STX and the trailing CR, if any.
    pub fn body(&self) -> &[u8] {
        let body = self.0.get(1..).unwrap_or_default();
        body.strip_suffix(&[CR]).unwrap_or(body)
    }

    pub fn body_lossy(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }
}

/// One byte, or `None` when the source has nothing more to give.
fn read_byte<R: Read>(port: &mut R) -> Result<Option<u8>, ProtocolError> {
    let mut b = [0u8; 1];
    loop {
        match port.read(&mut b) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(b[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Ok(None);
            }
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
}

/// Read one response: STX followed by everything up to the first empty read.
pub fn read_response<R: Read>(port: &mut R) -> Result<PumpResponse, ProtocolError> {
    match read_byte(port)? {
        None => Err(ProtocolError::Timeout),
        Some(STX) => {
            let mut frame = vec![STX];
            while let Some(b) = read_byte(port)? {
                if frame.len() >= MAX_RESPONSE_LEN {
                    return Err(ProtocolError::FrameTooLong(MAX_RESPONSE_LEN));
                }
                frame.push(b);
            }
            trace!(len = frame.len(), "pump response");
            Ok(PumpResponse(frame))
        }
        Some(other) => Err(ProtocolError::UnexpectedFrameStart(other)),
    }
}

/// Pump driver over any byte port (serial device, test double).
pub struct PumpProtocol<P> {
    port: P,
    address: u8,
}

impl<P: Read + Write> PumpProtocol<P> {
    pub fn new(port: P, address: u8) -> Result<Self, ProtocolError> {
        if address > BROADCAST_ADDRESS {
            return Err(ProtocolError::InvalidAddress(address));
        }
        Ok(Self { port, address })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn into_inner(self) -> P {
        self.port
    }

    /// Send one command frame; wait for a response only when the verb has one.
    pub fn send(&mut self, command: &PumpCommand) -> Result<Option<PumpResponse>, ProtocolError> {
        self.send_to(self.address, command)
    }

    /// Like `send`, but to an explicit address (e.g. broadcast identify).
    pub fn send_to(
        &mut self,
        address: u8,
        command: &PumpCommand,
    ) -> Result<Option<PumpResponse>, ProtocolError> {
        let frame = command.encode(address)?;
        debug!(?command, address, frame = ?frame, "pump command");
        self.port.write_all(&frame)?;
        self.port.flush()?;
        if command.expects_response() {
            read_response(&mut self.port).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn enquire(&mut self) -> Result<PumpResponse, ProtocolError> {
        self.send(&PumpCommand::Enquiry)?
            .ok_or(ProtocolError::Timeout)
    }

    pub fn identify(&mut self, address: u8) -> Result<PumpResponse, ProtocolError> {
        self.send_to(address, &PumpCommand::Identify)?
            .ok_or(ProtocolError::Timeout)
    }

    fn command(&mut self, command: PumpCommand) -> Result<(), BoxError> {
        self.send(&command)
            .map(|_| ())
            .map_err(|e| HwError::from(e).into())
    }
}

impl<P: Read + Write> Pump for PumpProtocol<P> {
    fn set_motor_speed(&mut self, percent: f64) -> Result<(), BoxError> {
        self.command(PumpCommand::SetSpeed(percent))
    }

    fn set_revolutions(&mut self, count: f64) -> Result<(), BoxError> {
        self.command(PumpCommand::SetRevolutions(count))
    }

    fn go(&mut self) -> Result<(), BoxError> {
        self.command(PumpCommand::Start)
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        self.command(PumpCommand::Stop)
    }

    fn cancel(&mut self) -> Result<(), BoxError> {
        self.command(PumpCommand::Reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// In-memory port: reads from a canned response, records writes.
    struct LoopPort {
        rx: Cursor<Vec<u8>>,
        tx: Vec<u8>,
    }

    impl LoopPort {
        fn new(rx: &[u8]) -> Self {
            Self {
                rx: Cursor::new(rx.to_vec()),
                tx: Vec::new(),
            }
        }
    }

    impl Read for LoopPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.rx.read(buf)
        }
    }

    impl Write for LoopPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.tx.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn set_revolutions_truncates_and_pads() {
        let frame = PumpCommand::SetRevolutions(12.5).encode(2).unwrap();
        assert_eq!(frame, b"\x02P02S+0012\r");
    }

    #[test]
    fn negative_revolutions_carry_minus_sign() {
        let frame = PumpCommand::SetRevolutions(-3.9).encode(1).unwrap();
        assert_eq!(frame, b"\x02P01S-0003\r");
    }

    #[test]
    fn speed_register_is_not_stx_framed() {
        let frame = PumpCommand::SetSpeed(70.0).encode(1).unwrap();
        assert_eq!(frame, b"P01V0070\r");
    }

    #[test]
    fn enquiry_is_single_byte() {
        assert_eq!(PumpCommand::Enquiry.encode(7).unwrap(), vec![ENQ]);
    }

    #[test]
    fn verbs_without_value() {
        assert_eq!(PumpCommand::Reset.encode(2).unwrap(), b"\x02P02R\r");
        assert_eq!(PumpCommand::Stop.encode(1).unwrap(), b"\x02P01H\r");
        assert_eq!(PumpCommand::Start.encode(1).unwrap(), b"\x02P01G\r");
        assert_eq!(
            PumpCommand::Identify.encode(BROADCAST_ADDRESS).unwrap(),
            b"\x02P99I\r"
        );
    }

    #[test]
    fn rejects_values_that_overflow_the_field() {
        assert!(matches!(
            PumpCommand::SetRevolutions(10_000.0).encode(1),
            Err(ProtocolError::ValueOutOfRange(_))
        ));
        assert!(matches!(
            PumpCommand::SetRevolutions(f64::NAN).encode(1),
            Err(ProtocolError::ValueOutOfRange(_))
        ));
        assert!(matches!(
            PumpCommand::SetSpeed(-1.0).encode(1),
            Err(ProtocolError::ValueOutOfRange(_))
        ));
        assert!(matches!(
            PumpCommand::Stop.encode(100),
            Err(ProtocolError::InvalidAddress(100))
        ));
    }

    #[test]
    fn response_keeps_stx_and_reads_until_quiet() {
        let mut port = Cursor::new(b"\x02P01I0520\r".to_vec());
        let resp = read_response(&mut port).unwrap();
        assert_eq!(resp.as_bytes(), b"\x02P01I0520\r");
        assert_eq!(resp.body(), b"P01I0520");
    }

    #[test]
    fn response_without_stx_is_protocol_error() {
        let mut port = Cursor::new(vec![0x15]);
        assert!(matches!(
            read_response(&mut port),
            Err(ProtocolError::UnexpectedFrameStart(0x15))
        ));
    }

    #[test]
    fn empty_response_is_timeout() {
        let mut port = Cursor::new(Vec::new());
        assert!(matches!(read_response(&mut port), Err(ProtocolError::Timeout)));
    }

    #[test]
    fn enquiry_writes_enq_and_reads_reply() {
        let mut pump = PumpProtocol::new(LoopPort::new(b"\x02P01\r"), 1).unwrap();
        let resp = pump.enquire().unwrap();
        assert_eq!(resp.body(), b"P01");
        assert_eq!(pump.into_inner().tx, vec![ENQ]);
    }

    #[test]
    fn motion_commands_do_not_wait_for_reply() {
        let mut pump = PumpProtocol::new(LoopPort::new(b""), 2).unwrap();
        pump.set_motor_speed(70.0).unwrap();
        pump.set_revolutions(23.53).unwrap();
        pump.go().unwrap();
        pump.halt().unwrap();
        pump.cancel().unwrap();
        let tx = pump.into_inner().tx;
        assert_eq!(
            tx,
            b"P02V0070\r\x02P02S+0023\r\x02P02G\r\x02P02H\r\x02P02R\r".to_vec()
        );
    }
}
