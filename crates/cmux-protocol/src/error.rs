//! Error types for modem profile and parameter handling

use thiserror::Error;

/// Errors raised while interpreting bring-up parameters
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Profile name is not one of the known modem families
    #[error("unknown modem profile: {0}")]
    UnknownProfile(String),

    /// Baud rate has no termios speed constant
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// MTU outside the range the multiplexing driver accepts
    #[error("MTU {mtu} out of range ({min}..={max})")]
    MtuOutOfRange { mtu: u32, min: u32, max: u32 },

    /// Encapsulation value reported by the driver is not basic or advanced
    #[error("unknown encapsulation mode: {0}")]
    UnknownEncapsulation(u32),
}
