//! Synchronous client for the AHU multisensor.
//!
//! One method per polled quantity; each call performs exactly one
//! request/response exchange over the owned [`Transport`]. Frames never
//! outlive their exchange.

use crate::protocol as proto;
use crate::transport::Transport;

/// All errors a single read can produce: transport I/O (including
/// timeout) or response validation.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wraps [`crate::Error`].
    #[error(transparent)]
    Protocol(#[from] crate::Error),

    /// Wraps transport read/write failures.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Client for one AHU multisensor on a Modbus RTU bus.
///
/// Owns the transport exclusively; the serial line is half-duplex and
/// exchanges must not interleave.
///
/// # Examples
///
/// ```no_run
/// use airunit_lib::{client::AirUnit, transport::SerialTransport};
/// use std::time::Duration;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let transport = SerialTransport::open(
///         "/dev/ttyUSB0",
///         9600,
///         serialport::Parity::None,
///         serialport::StopBits::One,
///         Duration::from_millis(200),
///     )?;
///     let mut unit = AirUnit::new(transport, 0x01);
///     println!("FAN_SPEED: {}", unit.read_fan_speed()?);
///     Ok(())
/// }
/// ```
pub struct AirUnit<T> {
    transport: T,
    device_address: u8,
}

impl<T: Transport> AirUnit<T> {
    /// Creates a client for the device at `device_address` behind
    /// `transport`.
    pub fn new(transport: T, device_address: u8) -> Self {
        Self {
            transport,
            device_address,
        }
    }

    /// The Modbus device address this client talks to.
    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    /// Exclusive access to the underlying transport, e.g. to adjust its
    /// timeout.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn read_holding_registers(
        &mut self,
        start_address: u16,
        quantity: u16,
    ) -> Result<Vec<u16>, Error> {
        let request = proto::encode_read_request(self.device_address, start_address, quantity);
        log::trace!("Request frame: {:02X?}", request);
        self.transport.send(&request)?;

        let mut buffer = [0u8; proto::MAX_RESPONSE_LENGTH];
        let received = self.transport.receive(&mut buffer)?;
        log::trace!("Response frame: {:02X?}", &buffer[..received]);
        Ok(proto::decode_read_response(&buffer[..received], quantity)?)
    }

    /// Reads the current fan speed.
    pub fn read_fan_speed(&mut self) -> Result<proto::FanSpeed, Error> {
        let registers =
            self.read_holding_registers(proto::FanSpeed::ADDRESS, proto::FanSpeed::QUANTITY)?;
        Ok(proto::FanSpeed::decode_from_holding_registers(&registers))
    }

    /// Reads the multisensor temperature word (masked to 12 bits).
    pub fn read_multisensor_temperature(
        &mut self,
    ) -> Result<proto::MultisensorTemperature, Error> {
        let registers = self.read_holding_registers(
            proto::MultisensorTemperature::ADDRESS,
            proto::MultisensorTemperature::QUANTITY,
        )?;
        Ok(proto::MultisensorTemperature::decode_from_holding_registers(
            &registers,
        ))
    }

    /// Reads the occupancy state.
    pub fn read_occupancy_state(&mut self) -> Result<proto::OccupancyState, Error> {
        let registers = self.read_holding_registers(
            proto::OccupancyState::ADDRESS,
            proto::OccupancyState::QUANTITY,
        )?;
        Ok(proto::OccupancyState::decode_from_holding_registers(
            &registers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc16;
    use crate::transport::mock::MockTransport;
    use assert_matches::assert_matches;

    fn build_response(registers: &[u16]) -> Vec<u8> {
        let mut frame = vec![0x01, 0x03, (registers.len() * 2) as u8];
        for register in registers {
            frame.extend_from_slice(&register.to_be_bytes());
        }
        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    #[test]
    fn read_fan_speed_sends_expected_frame() {
        let mut transport = MockTransport::new();
        transport.push_response(build_response(&[42]));
        let mut unit = AirUnit::new(transport, 0x01);

        let fan_speed = unit.read_fan_speed().unwrap();
        assert_eq!(*fan_speed, 42);
        assert_eq!(
            unit.transport_mut().sent,
            vec![vec![0x01, 0x03, 0x11, 0x01, 0x00, 0x01, 0xD0, 0xF6]]
        );
    }

    #[test]
    fn read_occupancy_state_decodes_masked_bit() {
        let mut transport = MockTransport::new();
        transport.push_response(build_response(&[0x8001]));
        let mut unit = AirUnit::new(transport, 0x01);

        assert_eq!(
            unit.read_occupancy_state().unwrap(),
            proto::OccupancyState::Away
        );
    }

    #[test]
    fn timeout_surfaces_as_io_error() {
        let mut transport = MockTransport::new();
        transport.push_error(std::io::ErrorKind::TimedOut);
        let mut unit = AirUnit::new(transport, 0x01);

        assert_matches!(unit.read_fan_speed(), Err(Error::Io(..)));
    }

    #[test]
    fn corrupted_response_surfaces_as_protocol_error() {
        let mut frame = build_response(&[42]);
        frame[3] ^= 0x10;
        let mut transport = MockTransport::new();
        transport.push_response(frame);
        let mut unit = AirUnit::new(transport, 0x01);

        assert_matches!(
            unit.read_fan_speed(),
            Err(Error::Protocol(crate::Error::CrcMismatch { .. }))
        );
    }
}
