//! CMUX Bring-up Protocol Library
//!
//! This crate holds everything needed to talk a GSM modem into 3GPP
//! TS 27.010 (GSM 0710) multiplexing mode, without doing any I/O itself:
//!
//! - **Modem profiles**: vendor families with their own command sequences
//! - **Step tables**: ordered AT commands tagged required or advisory
//! - **Reply classification**: `OK\r` token search over a bounded buffer
//! - **Multiplexer parameters**: the driver configuration block and the
//!   values bring-up writes into it
//!
//! # Example
//!
//! ```rust
//! use cmux_protocol::{AtOutcome, ModemProfile, StepPolicy};
//!
//! let plan = ModemProfile::Sim900.plan(115200, ModemProfile::Sim900.default_mtu());
//! assert_eq!(plan.steps[0].command, "AAAT");
//! assert_eq!(plan.steps[0].policy, StepPolicy::Required);
//!
//! assert_eq!(AtOutcome::classify(b"\r\nOK\r\n"), AtOutcome::Ok);
//! ```

pub mod at;
pub mod error;
pub mod params;
pub mod steps;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use at::{printable_reply, AtOutcome, OK_TOKEN, SIZE_BUF};
pub use error::ProtocolError;
pub use params::{validate_mtu, Encapsulation, MuxParameters};
pub use steps::{cmux_command, AtStep, BringUpPlan, StepPolicy};

/// Modem family, selecting the bring-up command sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ModemProfile {
    /// Generic modem (Quectel-style command set)
    #[default]
    Default,
    /// SIMCom SIM900
    Sim900,
    /// Telit modems
    Telit,
}

impl ModemProfile {
    /// Name used on the command line and in settings files
    pub fn name(&self) -> &'static str {
        match self {
            ModemProfile::Default => "default",
            ModemProfile::Sim900 => "sim900",
            ModemProfile::Telit => "telit",
        }
    }

    /// MTU used when none is configured
    pub fn default_mtu(&self) -> u32 {
        match self {
            ModemProfile::Sim900 => 255,
            ModemProfile::Default | ModemProfile::Telit => 512,
        }
    }

    /// Delay between the last AT command and the line discipline switch
    pub fn settle_delay(&self) -> Duration {
        match self {
            ModemProfile::Sim900 => Duration::from_millis(100),
            ModemProfile::Default | ModemProfile::Telit => Duration::from_secs(2),
        }
    }
}

impl fmt::Display for ModemProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModemProfile {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ModemProfile::Default),
            "sim900" => Ok(ModemProfile::Sim900),
            "telit" => Ok(ModemProfile::Telit),
            other => Err(ProtocolError::UnknownProfile(other.to_string())),
        }
    }
}

/// Line speeds with a termios constant on Linux
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000,
    3000000, 3500000, 4000000,
];

/// Reject baud rates the serial driver cannot be set to
pub fn validate_baud_rate(rate: u32) -> Result<u32, ProtocolError> {
    if SUPPORTED_BAUD_RATES.contains(&rate) {
        Ok(rate)
    } else {
        Err(ProtocolError::UnsupportedBaudRate(rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names_round_trip() {
        for profile in [ModemProfile::Default, ModemProfile::Sim900, ModemProfile::Telit] {
            assert_eq!(profile.name().parse::<ModemProfile>(), Ok(profile));
        }
    }

    #[test]
    fn test_unknown_profile() {
        assert_eq!(
            "quectel".parse::<ModemProfile>(),
            Err(ProtocolError::UnknownProfile("quectel".into()))
        );
    }

    #[test]
    fn test_default_mtu() {
        assert_eq!(ModemProfile::Sim900.default_mtu(), 255);
        assert_eq!(ModemProfile::Telit.default_mtu(), 512);
        assert_eq!(ModemProfile::Default.default_mtu(), 512);
    }

    #[test]
    fn test_validate_baud_rate() {
        assert_eq!(validate_baud_rate(115200), Ok(115200));
        assert_eq!(
            validate_baud_rate(115201),
            Err(ProtocolError::UnsupportedBaudRate(115201))
        );
        assert!(validate_baud_rate(0).is_err());
    }
}
