use thiserror::Error;

/// Barcode HID decoding failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown HID keycode {0}")]
    UnknownKeycode(u8),
    #[error("HID stream ended before the terminator")]
    EndOfStream,
    #[error("hid io: {0}")]
    Io(#[from] std::io::Error),
}

/// Pump framing failures. Never retried by the protocol layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected frame start byte 0x{0:02x}")]
    UnexpectedFrameStart(u8),
    #[error("pump response timeout (no bytes read)")]
    Timeout,
    #[error("pump response exceeds {0} bytes")]
    FrameTooLong(usize),
    #[error("invalid pump address {0} (0..=99)")]
    InvalidAddress(u8),
    #[error("value {0} cannot be encoded in a 4-digit field")]
    ValueOutOfRange(f64),
    #[error("pump io: {0}")]
    Io(#[from] std::io::Error),
}

/// Scale line failures.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("malformed scale reading {0:?}")]
    MalformedReading(String),
    #[error("scale io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum HwError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Scale(#[from] ScaleError),
    #[error("device wait timeout")]
    WaitTimeout,
    #[cfg(feature = "hardware")]
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
