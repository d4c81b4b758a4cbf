//! `waterer probe-pump`: ENQ + Identify exchange for checking the pump link.

use std::io::{Read, Write};

use eyre::{Result, WrapErr};
use tracing::info;
use waterer_hardware::pump::PumpProtocol;

/// One reply, labelled by the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReply {
    pub request: &'static str,
    pub frame: Vec<u8>,
}

impl ProbeReply {
    /// Decimal byte values, then the printable characters.
    pub fn describe(&self) -> String {
        let bytes: Vec<String> = self.frame.iter().map(u8::to_string).collect();
        let text: String = self
            .frame
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        format!("{}: [{}] {:?}", self.request, bytes.join(" "), text)
    }
}

pub fn probe<P: Read + Write>(pump: &mut PumpProtocol<P>, address: u8) -> Result<Vec<ProbeReply>> {
    let enq = pump.enquire().wrap_err("pump did not answer ENQ")?;
    info!(len = enq.as_bytes().len(), "ENQ answered");
    let id = pump
        .identify(address)
        .wrap_err_with(|| format!("pump did not answer Identify at address {address}"))?;
    info!(address, body = %id.body_lossy(), "Identify answered");
    Ok(vec![
        ProbeReply {
            request: "ENQ",
            frame: enq.as_bytes().to_vec(),
        },
        ProbeReply {
            request: "Identify",
            frame: id.as_bytes().to_vec(),
        },
    ])
}

#[cfg(feature = "hardware")]
pub fn run(cfg: &waterer_config::Config, address: u8) -> Result<Vec<ProbeReply>> {
    use std::time::Duration;
    use waterer_hardware::serial::open_pump_port;
    use waterer_hardware::util::wait_for_path;

    let path = &cfg.devices.pump;
    wait_for_path(path, Duration::from_secs(5), Duration::from_millis(100))
        .wrap_err_with(|| format!("pump port {path:?} not found"))?;
    let port = open_pump_port(path, Duration::from_millis(cfg.pump.response_timeout_ms))?;
    let mut pump = PumpProtocol::new(port, cfg.pump.address)?;
    probe(&mut pump, address)
}

#[cfg(not(feature = "hardware"))]
pub fn run(_cfg: &waterer_config::Config, _address: u8) -> Result<Vec<ProbeReply>> {
    eyre::bail!("probe-pump needs a build with the `hardware` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Answers each written frame with the next scripted reply, then goes quiet.
    struct ReplyPort {
        replies: VecDeque<Vec<u8>>,
        pending: io::Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for ReplyPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.pending.read(buf)
        }
    }

    impl Write for ReplyPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            let next = self.replies.pop_front().unwrap_or_default();
            self.pending = io::Cursor::new(next);
            Ok(())
        }
    }

    #[test]
    fn sends_enq_then_broadcast_identify() {
        let port = ReplyPort {
            replies: VecDeque::from([b"\x020\r".to_vec(), b"\x02P01I505Du\r".to_vec()]),
            pending: io::Cursor::new(Vec::new()),
            written: Vec::new(),
        };
        let mut pump = PumpProtocol::new(port, 1).unwrap();
        let replies = probe(&mut pump, 99).unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].frame, b"\x02P01I505Du\r");
        let port = pump.into_inner();
        assert_eq!(port.written, b"\x05\x02P99I\r");
    }

    #[test]
    fn describes_bytes_and_printable_text() {
        let reply = ProbeReply {
            request: "ENQ",
            frame: vec![2, b'O', b'K', 13],
        };
        assert_eq!(reply.describe(), "ENQ: [2 79 75 13] \".OK.\"");
    }

    #[test]
    fn silent_pump_is_an_error() {
        let port = ReplyPort {
            replies: VecDeque::new(),
            pending: io::Cursor::new(Vec::new()),
            written: Vec::new(),
        };
        let mut pump = PumpProtocol::new(port, 1).unwrap();
        assert!(probe(&mut pump, 99).is_err());
    }
}
