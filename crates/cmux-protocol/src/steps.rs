//! Vendor bring-up command tables
//!
//! Each modem profile switches into CMUX framing through a fixed, ordered
//! list of AT commands. Every step carries its own failure policy so the
//! sequencer never has to special-case individual commands.

use std::fmt;
use std::time::Duration;

use tracing::trace;

use crate::params::{K, N2, T1, T2, T3};
use crate::ModemProfile;

/// What a failed step means for the bring-up as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Failure aborts the bring-up
    Required,
    /// Failure is logged and the sequence continues
    Advisory,
}

/// One AT command in a bring-up sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtStep {
    /// Command text without the trailing carriage return
    pub command: String,
    pub policy: StepPolicy,
}

impl AtStep {
    pub fn required(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            policy: StepPolicy::Required,
        }
    }

    pub fn advisory(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            policy: StepPolicy::Advisory,
        }
    }

    /// Bytes written to the line: the command followed by CR
    pub fn wire(&self) -> String {
        format!("{}\r", self.command)
    }
}

impl fmt::Display for AtStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// Ordered steps plus the settle delay that follows them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpPlan {
    pub profile: ModemProfile,
    pub steps: Vec<AtStep>,
    /// Time the modem needs to switch framing before the host attaches
    /// its line discipline
    pub settle: Duration,
}

/// `AT+CMUX` with explicit frame parameters: basic mode, UIH frames,
/// 115200 port speed code, then N1 (MTU), T1, N2, T2, T3 and k
pub fn cmux_command(mtu: u32) -> String {
    format!("AT+CMUX=0,0,5,{mtu},{T1},{N2},{T2},{T3},{K}")
}

impl ModemProfile {
    /// Build the command sequence for this profile
    pub fn plan(self, speed: u32, mtu: u32) -> BringUpPlan {
        let steps = match self {
            ModemProfile::Sim900 => vec![
                AtStep::required("AAAT"),
                AtStep::required("AT+IFC=2,2"),
                AtStep::advisory("AT+GMM"),
                AtStep::advisory("AT"),
                AtStep::required(cmux_command(mtu)),
            ],
            ModemProfile::Telit => vec![
                AtStep::required("AT#SELINT=2"),
                AtStep::required("ATE0V1&K3&D2"),
                AtStep::required(format!("AT+IPR={speed}")),
                AtStep::required("AT#CMUXMODE=0"),
                AtStep::advisory("AT+CMUX=0"),
            ],
            ModemProfile::Default => vec![
                AtStep::required("AT+IFC=2,2"),
                AtStep::advisory("AT+GMM"),
                AtStep::advisory("AT"),
                AtStep::required(format!("AT+IPR={speed}&w")),
                AtStep::required(cmux_command(mtu)),
            ],
        };
        trace!(profile = self.name(), steps = steps.len(), "built bring-up plan");

        BringUpPlan {
            profile: self,
            steps,
            settle: self.settle_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn commands(plan: &BringUpPlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.command.as_str()).collect()
    }

    fn policies(plan: &BringUpPlan) -> Vec<StepPolicy> {
        plan.steps.iter().map(|s| s.policy).collect()
    }

    use StepPolicy::{Advisory, Required};

    #[test]
    fn test_sim900_plan() {
        let plan = ModemProfile::Sim900.plan(115200, 255);
        assert_eq!(
            commands(&plan),
            [
                "AAAT",
                "AT+IFC=2,2",
                "AT+GMM",
                "AT",
                "AT+CMUX=0,0,5,255,10,3,30,10,2"
            ]
        );
        assert_eq!(
            policies(&plan),
            [Required, Required, Advisory, Advisory, Required]
        );
        assert_eq!(plan.settle, Duration::from_millis(100));
    }

    #[test]
    fn test_telit_plan() {
        let plan = ModemProfile::Telit.plan(115200, 512);
        assert_eq!(
            commands(&plan),
            [
                "AT#SELINT=2",
                "ATE0V1&K3&D2",
                "AT+IPR=115200",
                "AT#CMUXMODE=0",
                "AT+CMUX=0"
            ]
        );
        assert_eq!(
            policies(&plan),
            [Required, Required, Required, Required, Advisory]
        );
        assert_eq!(plan.settle, Duration::from_secs(2));
    }

    #[test]
    fn test_default_plan() {
        let plan = ModemProfile::Default.plan(57600, 512);
        assert_eq!(
            commands(&plan),
            [
                "AT+IFC=2,2",
                "AT+GMM",
                "AT",
                "AT+IPR=57600&w",
                "AT+CMUX=0,0,5,512,10,3,30,10,2"
            ]
        );
        assert_eq!(
            policies(&plan),
            [Required, Advisory, Advisory, Required, Required]
        );
        assert_eq!(plan.settle, Duration::from_secs(2));
    }

    #[test]
    fn test_wire_appends_carriage_return() {
        assert_eq!(AtStep::required("AT").wire(), "AT\r");
        assert_eq!(AtStep::advisory("AT+GMM").to_string(), "AT+GMM");
    }

    proptest! {
        #[test]
        fn mtu_substituted_verbatim(mtu in 8u32..=1500) {
            let expected = format!("AT+CMUX=0,0,5,{},10,3,30,10,2", mtu);
            let sim900 = ModemProfile::Sim900.plan(115200, mtu);
            let default = ModemProfile::Default.plan(115200, mtu);
            prop_assert_eq!(&sim900.steps[4].command, &expected);
            prop_assert_eq!(&default.steps[4].command, &expected);
        }

        #[test]
        fn speed_substituted_verbatim(speed in prop::sample::select(crate::SUPPORTED_BAUD_RATES)) {
            let telit = ModemProfile::Telit.plan(speed, 512);
            let default = ModemProfile::Default.plan(speed, 512);
            prop_assert_eq!(&telit.steps[2].command, &format!("AT+IPR={}", speed));
            prop_assert_eq!(&default.steps[3].command, &format!("AT+IPR={}&w", speed));
        }
    }
}
