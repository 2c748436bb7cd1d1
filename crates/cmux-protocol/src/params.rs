//! GSM 0710 multiplexing parameters
//!
//! These mirror the configuration block the kernel multiplexing driver
//! exposes. The driver fills in defaults; bring-up overwrites only the
//! fields it owns and writes the rest back untouched.

use crate::error::ProtocolError;

/// Acknowledgement timer T1, in hundredths of a second
pub const T1: u32 = 10;
/// Maximum number of retransmissions
pub const N2: u32 = 3;
/// Control channel response timer T2, in hundredths of a second
pub const T2: u32 = 30;
/// Wake-up response timer T3, in seconds
pub const T3: u32 = 10;
/// Window size for error recovery mode, as sent in `AT+CMUX`
pub const K: u32 = 2;

/// Smallest MTU the driver accepts
pub const MIN_MTU: u32 = 8;
/// Largest MTU the driver accepts
pub const MAX_MTU: u32 = 1500;

/// Frame encapsulation used on the multiplexed line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encapsulation {
    /// Basic option, flag-delimited frames without transparency
    #[default]
    Basic,
    /// Advanced option, HDLC-style byte stuffing
    Advanced,
}

impl Encapsulation {
    /// Numeric value used by the driver
    pub fn as_raw(self) -> u32 {
        match self {
            Encapsulation::Basic => 0,
            Encapsulation::Advanced => 1,
        }
    }
}

impl TryFrom<u32> for Encapsulation {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Encapsulation::Basic),
            1 => Ok(Encapsulation::Advanced),
            other => Err(ProtocolError::UnknownEncapsulation(other)),
        }
    }
}

/// Multiplexer configuration as read from and written to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MuxParameters {
    /// Convergence layer type
    pub adaption: u32,
    /// Frame encapsulation
    pub encapsulation: Encapsulation,
    /// True when this side starts the multiplexer (initiator role)
    pub initiator: bool,
    pub t1: u32,
    pub t2: u32,
    pub t3: u32,
    pub n2: u32,
    /// Maximum receive unit
    pub mru: u32,
    /// Maximum transmit unit
    pub mtu: u32,
    /// Window size
    pub k: u32,
    /// Frame type (UIH or UI)
    pub i: u32,
}

/// Check an MTU against the driver's accepted range
pub fn validate_mtu(mtu: u32) -> Result<u32, ProtocolError> {
    if (MIN_MTU..=MAX_MTU).contains(&mtu) {
        Ok(mtu)
    } else {
        Err(ProtocolError::MtuOutOfRange {
            mtu,
            min: MIN_MTU,
            max: MAX_MTU,
        })
    }
}
