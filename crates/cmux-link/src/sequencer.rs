//! Vendor bring-up sequencer
//!
//! Walks a [`BringUpPlan`] through the AT channel in order. A rejected
//! required step stops the walk immediately; a rejected advisory step is
//! logged and skipped. After the last step the modem is given its
//! profile's settle delay.

use cmux_protocol::{AtOutcome, BringUpPlan, ModemProfile, StepPolicy};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::channel::AtChannel;
use crate::error::LinkError;
use crate::pacer::{Pacer, Wait};

/// Outcome of a single executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub command: String,
    pub policy: StepPolicy,
    pub outcome: AtOutcome,
}

/// Record of a completed bring-up sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub profile: ModemProfile,
    pub steps: Vec<StepReport>,
}

impl SequenceReport {
    /// Advisory steps the modem did not accept
    pub fn rejected_advisories(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.outcome.is_ok())
    }
}

/// Drive the modem into CMUX framing following `plan`
pub async fn switch_to_cmux<S, P>(
    channel: &mut AtChannel<'_, S, P>,
    plan: &BringUpPlan,
) -> Result<SequenceReport, LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    P: Pacer,
{
    info!("Switching {} modem to CMUX mode", plan.profile);

    let mut steps = Vec::with_capacity(plan.steps.len());
    for step in &plan.steps {
        let outcome = channel.exchange(&step.wire()).await?;

        match (outcome, step.policy) {
            (AtOutcome::Ok, _) => debug!("{}: accepted", step),
            (AtOutcome::NoResponseOrReject, StepPolicy::Required) => {
                return Err(LinkError::CommandRejected {
                    command: step.command.clone(),
                });
            }
            (AtOutcome::NoResponseOrReject, StepPolicy::Advisory) => {
                warn!("{}: bad response", step);
            }
        }

        steps.push(StepReport {
            command: step.command.clone(),
            policy: step.policy,
            outcome,
        });
    }

    debug!("Letting the modem settle for {:?}", plan.settle);
    channel.pacer().wait(Wait::Settle, plan.settle).await;

    Ok(SequenceReport {
        profile: plan.profile,
        steps,
    })
}
