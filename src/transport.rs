//! Byte-stream transport boundary for the Modbus RTU link.
//!
//! The protocol layer never touches a serial port directly; it talks to a
//! [`Transport`], a half-duplex request/response byte stream. The shipped
//! implementation ([`SerialTransport`], feature `serialport`) wraps a
//! blocking serial port and owns its line discipline (baud rate, parity,
//! stop bits) and read timeout.

use std::time::Duration;

/// A duplex byte stream carrying one request/response exchange at a time.
///
/// The stream provides no message boundaries; a single bounded read per
/// response is expected and the frame decoder alone determines validity.
/// A read timeout surfaces as [`std::io::ErrorKind::TimedOut`] and is
/// retryable at the next poll tick.
pub trait Transport {
    /// Writes one complete request frame.
    fn send(&mut self, frame: &[u8]) -> std::io::Result<()>;

    /// Reads the available response bytes into `buffer`, blocking at most
    /// for the configured timeout. Returns the number of bytes read.
    fn receive(&mut self, buffer: &mut [u8]) -> std::io::Result<usize>;
}

/// Blocking serial port transport.
#[cfg(feature = "serialport")]
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

#[cfg(feature = "serialport")]
impl SerialTransport {
    /// Opens the serial port with the given line settings.
    ///
    /// Data bits and flow control are fixed (8, none); the device speaks
    /// nothing else.
    pub fn open(
        device: &str,
        baud_rate: u32,
        parity: serialport::Parity,
        stop_bits: serialport::StopBits,
        timeout: Duration,
    ) -> serialport::Result<Self> {
        let port = serialport::new(device, baud_rate)
            .parity(parity)
            .stop_bits(stop_bits)
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;
        Ok(Self { port })
    }

    /// Changes the read timeout for subsequent exchanges.
    pub fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.port.set_timeout(timeout)
    }

    /// The currently configured read timeout.
    pub fn timeout(&self) -> Duration {
        self.port.timeout()
    }
}

#[cfg(feature = "serialport")]
impl Transport for SerialTransport {
    fn send(&mut self, frame: &[u8]) -> std::io::Result<()> {
        use std::io::Write;
        self.port.write_all(frame)?;
        self.port.flush()
    }

    fn receive(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
        use std::io::Read;
        self.port.read(buffer)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Transport;
    use std::collections::VecDeque;

    /// Scripted transport for exercising the client and poller without a
    /// serial line. Each `receive` consumes the next queued response.
    pub(crate) struct MockTransport {
        pub responses: VecDeque<std::io::Result<Vec<u8>>>,
        pub sent: Vec<Vec<u8>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                responses: VecDeque::new(),
                sent: Vec::new(),
            }
        }

        pub fn push_response(&mut self, frame: Vec<u8>) {
            self.responses.push_back(Ok(frame));
        }

        pub fn push_error(&mut self, kind: std::io::ErrorKind) {
            self.responses
                .push_back(Err(std::io::Error::new(kind, "scripted failure")));
        }
    }

    impl Transport for MockTransport {
        fn send(&mut self, frame: &[u8]) -> std::io::Result<()> {
            self.sent.push(frame.to_vec());
            Ok(())
        }

        fn receive(&mut self, buffer: &mut [u8]) -> std::io::Result<usize> {
            match self.responses.pop_front() {
                Some(Ok(frame)) => {
                    buffer[..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                Some(Err(error)) => Err(error),
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "no scripted response left",
                )),
            }
        }
    }
}
