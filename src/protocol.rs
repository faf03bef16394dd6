//! Modbus RTU protocol implementation for the AHU multisensor.
//!
//! This module contains the wire-level pieces of the protocol: the Modbus
//! CRC-16, construction of read-holding-registers request frames, and
//! validation and decoding of response frames. On top of that it defines
//! the register map of the device and one strongly-typed value per polled
//! quantity ([`FanSpeed`], [`MultisensorTemperature`], [`OccupancyState`]),
//! each with its own interpretation rule.
//!
//! The frame functions are low level and stateless. Most users should go
//! through [`crate::client::AirUnit`], which pairs them with a transport.

use crate::Error;

/// Modbus function code used for all reads of this device.
pub const FUNCTION_READ_HOLDING_REGISTERS: u8 = 0x03;

/// A read-holding-registers request frame is always 8 bytes:
/// address, function code, start address (2), quantity (2), CRC (2).
pub const REQUEST_FRAME_LENGTH: usize = 8;

/// Upper bound for a response frame; sizes the read buffer.
pub const MAX_RESPONSE_LENGTH: usize = 256;

/// Computes the Modbus CRC-16 (polynomial 0xA001, initial value 0xFFFF)
/// over `data`.
///
/// The result is transmitted low byte first in RTU frames; this function
/// returns the plain integer value and leaves byte ordering to the
/// frame encoder/decoder.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Builds a complete read-holding-registers request frame.
///
/// The 6-byte payload carries the start address and register quantity in
/// big-endian order; the CRC trailer is appended low byte first, per the
/// RTU convention.
///
/// `quantity` must be at least 1 and `start_address + quantity` must not
/// overflow 16 bits; both are guaranteed by the register map constants
/// this crate passes in.
pub fn encode_read_request(device_address: u8, start_address: u16, quantity: u16) -> Vec<u8> {
    debug_assert!(quantity >= 1);
    debug_assert!(start_address.checked_add(quantity).is_some());

    let mut frame = Vec::with_capacity(REQUEST_FRAME_LENGTH);
    frame.push(device_address);
    frame.push(FUNCTION_READ_HOLDING_REGISTERS);
    frame.extend_from_slice(&start_address.to_be_bytes());
    frame.extend_from_slice(&quantity.to_be_bytes());
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Validates a response frame and extracts the register values.
///
/// Validation happens in a fixed order and fails fast:
/// 1. Minimum length: `3 + 2 * quantity` bytes (address, function code and
///    byte-count header plus two bytes per register). Shorter frames fail
///    with [`Error::ResponseTooShort`].
/// 2. CRC: recomputed over all bytes except the trailing two and compared
///    against the little-endian trailer. [`Error::CrcMismatch`] otherwise.
/// 3. Extraction: `quantity` big-endian 16-bit words starting after the
///    3-byte header. Register words are big-endian, the opposite of the
///    CRC trailer.
///
/// Either all requested registers are returned or none are.
pub fn decode_read_response(frame: &[u8], quantity: u16) -> Result<Vec<u16>, Error> {
    let required = 3 + 2 * quantity as usize;
    if frame.len() < required {
        log::warn!(
            "Response too short - required={} received={}",
            required,
            frame.len()
        );
        return Err(Error::ResponseTooShort {
            required,
            received: frame.len(),
        });
    }

    let (body, trailer) = frame.split_at(frame.len() - 2);
    let calculated = crc16(body);
    let received = u16::from_le_bytes([trailer[0], trailer[1]]);
    if calculated != received {
        log::warn!(
            "CRC mismatch - calculated={:#06X} received={:#06X} frame={:02X?}",
            calculated,
            received,
            frame
        );
        return Err(Error::CrcMismatch {
            calculated,
            received,
        });
    }

    let data = &frame[3..];
    let mut registers = Vec::with_capacity(quantity as usize);
    for i in 0..quantity as usize {
        registers.push(u16::from_be_bytes([data[2 * i], data[2 * i + 1]]));
    }
    Ok(registers)
}

/// Current fan speed of the air handling unit.
///
/// The register word is reported as-is; the device defines no scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FanSpeed(u16);

impl FanSpeed {
    /// Holding register address of the fan speed (4353).
    pub const ADDRESS: u16 = 0x1101;
    /// Number of registers to read.
    pub const QUANTITY: u16 = 1;

    /// Decodes the fan speed from the registers returned by
    /// [`decode_read_response`].
    pub fn decode_from_holding_registers(registers: &[u16]) -> Self {
        Self(registers[0])
    }
}

impl std::ops::Deref for FanSpeed {
    type Target = u16;

    fn deref(&self) -> &u16 {
        &self.0
    }
}

impl std::fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Temperature word of the multisensor, masked to its meaningful bits.
///
/// The device transmits a 16-bit word of which only the low 12 bits carry
/// the measurement; the upper four bits are don't-care and are stripped
/// during decoding, never reported. The value is the raw masked integer,
/// the device documents no scaling factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MultisensorTemperature(u16);

impl MultisensorTemperature {
    /// Holding register address of the multisensor temperature (4363).
    pub const ADDRESS: u16 = 0x110B;
    /// Number of registers to read.
    pub const QUANTITY: u16 = 1;
    /// Only the low 12 bits of the register word are meaningful.
    pub const VALUE_MASK: u16 = 0x0FFF;

    /// Decodes the temperature from the registers returned by
    /// [`decode_read_response`], applying [`Self::VALUE_MASK`].
    pub fn decode_from_holding_registers(registers: &[u16]) -> Self {
        Self(registers[0] & Self::VALUE_MASK)
    }
}

impl std::ops::Deref for MultisensorTemperature {
    type Target = u16;

    fn deref(&self) -> &u16 {
        &self.0
    }
}

impl std::fmt::Display for MultisensorTemperature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Occupancy state reported by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OccupancyState {
    Home,
    Away,
}

impl OccupancyState {
    /// Holding register address of the occupancy state (4609).
    pub const ADDRESS: u16 = 0x1201;
    /// Number of registers to read.
    pub const QUANTITY: u16 = 1;
    /// Only bit 0 of the register word is meaningful.
    pub const STATE_MASK: u16 = 0x0001;

    /// Decodes the occupancy state from the registers returned by
    /// [`decode_read_response`].
    ///
    /// The word is masked to bit 0 before comparison, so the masked value
    /// is 0 or 1 by construction and no fallback branch exists.
    pub fn decode_from_holding_registers(registers: &[u16]) -> Self {
        if registers[0] & Self::STATE_MASK == 0 {
            OccupancyState::Home
        } else {
            OccupancyState::Away
        }
    }
}

impl std::fmt::Display for OccupancyState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OccupancyState::Home => write!(f, "home"),
            OccupancyState::Away => write!(f, "away"),
        }
    }
}
