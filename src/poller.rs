//! Poll orchestration: one cycle reads the fixed set of quantities in a
//! fixed order and reports a per-reading outcome for each.
//!
//! Failures are handled at single-reading granularity: a timeout or a
//! corrupt frame for one reading is recorded as a [`Diagnostic`] and the
//! cycle moves on to the next reading. There is no retry within a cycle;
//! the next scheduled cycle is the retry mechanism.

use crate::client::{AirUnit, Error as ClientError};
use crate::protocol as proto;
use crate::transport::Transport;
use std::time::SystemTime;

/// The polled quantities, identified by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    FanSpeed,
    MultisensorTemperature,
    OccupancyState,
}

impl Reading {
    /// The fixed order in which one cycle polls the readings.
    pub const CYCLE_ORDER: [Reading; 3] = [
        Reading::FanSpeed,
        Reading::MultisensorTemperature,
        Reading::OccupancyState,
    ];

    /// The reading's name as reported downstream.
    pub fn name(&self) -> &'static str {
        match self {
            Reading::FanSpeed => "FAN_SPEED",
            Reading::MultisensorTemperature => "Multisensor_temp",
            Reading::OccupancyState => "state",
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded, interpreted value for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    FanSpeed(proto::FanSpeed),
    MultisensorTemperature(proto::MultisensorTemperature),
    OccupancyState(proto::OccupancyState),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::FanSpeed(value) => value.fmt(f),
            Value::MultisensorTemperature(value) => value.fmt(f),
            Value::OccupancyState(value) => value.fmt(f),
        }
    }
}

/// One successfully polled reading.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub reading: Reading,
    pub value: Value,
    pub timestamp: SystemTime,
}

/// Classification of a per-reading failure, kept distinguishable for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport write/read failure, including timeout. Retryable at the
    /// next cycle.
    Io,
    /// Response shorter than the minimum for the requested count.
    TooShort,
    /// Frame integrity check failed.
    CrcMismatch,
}

impl From<&ClientError> for FailureKind {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::Io(_) => FailureKind::Io,
            ClientError::Protocol(crate::Error::ResponseTooShort { .. }) => FailureKind::TooShort,
            ClientError::Protocol(crate::Error::CrcMismatch { .. }) => FailureKind::CrcMismatch,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FailureKind::Io => write!(f, "io"),
            FailureKind::TooShort => write!(f, "too-short"),
            FailureKind::CrcMismatch => write!(f, "crc-mismatch"),
        }
    }
}

/// One failed reading, tagged with the reading name and failure kind.
#[derive(Debug)]
pub struct Diagnostic {
    pub reading: Reading,
    pub kind: FailureKind,
    pub error: ClientError,
}

/// Outcome of polling a single reading.
pub type ReadingOutcome = Result<Observation, Diagnostic>;

/// Drives poll cycles against one device.
///
/// Scheduling is left to the caller: `poll_cycle` executes exactly one
/// cycle, so tests and daemons alike decide when the next one runs.
pub struct Poller<T> {
    client: AirUnit<T>,
}

impl<T: Transport> Poller<T> {
    pub fn new(client: AirUnit<T>) -> Self {
        Self { client }
    }

    /// Exclusive access to the wrapped client.
    pub fn client_mut(&mut self) -> &mut AirUnit<T> {
        &mut self.client
    }

    /// Executes one poll cycle: all readings in [`Reading::CYCLE_ORDER`],
    /// strictly sequentially.
    ///
    /// The returned vector always holds one outcome per reading, in cycle
    /// order. A failed reading never blocks its siblings.
    pub fn poll_cycle(&mut self) -> Vec<ReadingOutcome> {
        Reading::CYCLE_ORDER
            .iter()
            .map(|reading| self.poll_reading(*reading))
            .collect()
    }

    fn poll_reading(&mut self, reading: Reading) -> ReadingOutcome {
        let result = match reading {
            Reading::FanSpeed => self.client.read_fan_speed().map(Value::FanSpeed),
            Reading::MultisensorTemperature => self
                .client
                .read_multisensor_temperature()
                .map(Value::MultisensorTemperature),
            Reading::OccupancyState => {
                self.client.read_occupancy_state().map(Value::OccupancyState)
            }
        };
        match result {
            Ok(value) => Ok(Observation {
                reading,
                value,
                timestamp: SystemTime::now(),
            }),
            Err(error) => {
                let kind = FailureKind::from(&error);
                log::warn!("Reading {reading} failed ({kind}): {error}");
                Err(Diagnostic {
                    reading,
                    kind,
                    error,
                })
            }
        }
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

    fn poller_with(transport: MockTransport) -> Poller<MockTransport> {
        Poller::new(AirUnit::new(transport, 0x01))
    }

    #[test]
    fn cycle_reports_all_readings_in_order() {
        let mut transport = MockTransport::new();
        transport.push_response(build_response(&[42]));
        transport.push_response(build_response(&[0x8FA3]));
        transport.push_response(build_response(&[0x0001]));
        let mut poller = poller_with(transport);

        let outcomes = poller.poll_cycle();
        assert_eq!(outcomes.len(), 3);

        let first = outcomes[0].as_ref().unwrap();
        assert_eq!(first.reading, Reading::FanSpeed);
        assert_matches!(first.value, Value::FanSpeed(speed) if *speed == 42);

        let second = outcomes[1].as_ref().unwrap();
        assert_eq!(second.reading, Reading::MultisensorTemperature);
        assert_matches!(
            second.value,
            Value::MultisensorTemperature(word) if *word == 0x0FA3
        );

        let third = outcomes[2].as_ref().unwrap();
        assert_eq!(third.reading, Reading::OccupancyState);
        assert_matches!(
            third.value,
            Value::OccupancyState(proto::OccupancyState::Away)
        );
    }

    #[test]
    fn failed_reading_does_not_block_siblings() {
        let mut transport = MockTransport::new();
        transport.push_error(std::io::ErrorKind::TimedOut);
        transport.push_response(build_response(&[0x0123]));
        transport.push_response(build_response(&[0x0000]));
        let mut poller = poller_with(transport);

        let outcomes = poller.poll_cycle();

        let diagnostic = outcomes[0].as_ref().unwrap_err();
        assert_eq!(diagnostic.reading, Reading::FanSpeed);
        assert_eq!(diagnostic.kind, FailureKind::Io);

        assert!(outcomes[1].is_ok());
        assert!(outcomes[2].is_ok());

        // All three exchanges were attempted on the wire.
        assert_eq!(poller.client_mut().transport_mut().sent.len(), 3);
    }

    #[test]
    fn diagnostics_distinguish_failure_kinds() {
        let mut corrupted = build_response(&[42]);
        corrupted[4] ^= 0x01;

        let mut transport = MockTransport::new();
        transport.push_response(build_response(&[42]));
        transport.push_response(corrupted);
        transport.push_response(build_response(&[0x0001])[..4].to_vec());
        let mut poller = poller_with(transport);

        let outcomes = poller.poll_cycle();
        assert!(outcomes[0].is_ok());
        assert_eq!(
            outcomes[1].as_ref().unwrap_err().kind,
            FailureKind::CrcMismatch
        );
        assert_eq!(
            outcomes[2].as_ref().unwrap_err().kind,
            FailureKind::TooShort
        );
    }
}
