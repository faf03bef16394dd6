//! A library for polling an air handling unit multisensor via Modbus RTU.
//!
//! The crate implements the wire protocol itself: request frame
//! construction, Modbus CRC-16 computation and verification, response
//! validation and decoding of register words into typed values.
//!
//! It is organized in layers:
//!
//! 1. **Protocol** ([`protocol`]): stateless frame encoding/decoding and
//!    the strongly-typed reading values (`FanSpeed`,
//!    `MultisensorTemperature`, `OccupancyState`).
//! 2. **Transport** ([`transport`]): the byte-stream boundary. The
//!    `serialport` feature provides the blocking serial implementation;
//!    anything implementing [`transport::Transport`] works.
//! 3. **Client** ([`client`]): one request/response exchange per typed
//!    read method.
//! 4. **Poller** ([`poller`]): one cycle of the fixed reading set with
//!    per-reading outcomes; a failure of one reading never aborts its
//!    siblings.
//!
//! ## Quick Start
//!
//! ```no_run
//! use airunit_lib::{client::AirUnit, poller::Poller, transport::SerialTransport};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = SerialTransport::open(
//!         "/dev/ttyUSB0",
//!         9600,
//!         serialport::Parity::None,
//!         serialport::StopBits::One,
//!         Duration::from_millis(200),
//!     )?;
//!     let mut poller = Poller::new(AirUnit::new(transport, 0x01));
//!
//!     for outcome in poller.poll_cycle() {
//!         match outcome {
//!             Ok(observation) => {
//!                 println!("{}: {}", observation.reading, observation.value)
//!             }
//!             Err(diagnostic) => {
//!                 eprintln!("{}: {}", diagnostic.reading, diagnostic.kind)
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod poller;
pub mod protocol;
pub mod transport;

pub use error::Error;
