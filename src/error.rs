/// Errors raised while validating a Modbus RTU response frame.
///
/// The two kinds are deliberately distinguishable so that per-reading
/// diagnostics can tell a truncated frame from line noise.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The response is shorter than the minimum required for the
    /// requested register count.
    #[error("Response too short: required {required} bytes, received {received}")]
    ResponseTooShort { required: usize, received: usize },

    /// The CRC-16 recomputed over the frame body does not match the
    /// transmitted CRC trailer.
    #[error("CRC mismatch: calculated {calculated:#06X}, received {received:#06X}")]
    CrcMismatch { calculated: u16, received: u16 },
}
