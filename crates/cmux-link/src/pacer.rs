//! Explicit protocol waits
//!
//! The modem offers no readiness signal on the AT channel, so bring-up is
//! paced by fixed delays. They go through [`Pacer`] rather than a bare
//! sleep so tests can observe and skip them.

use std::future::Future;
use std::time::Duration;

use tracing::trace;

/// Which protocol delay is being waited out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Time given to the modem to answer an AT command
    Response,
    /// Time given to the modem to switch framing before the host does
    Settle,
}

/// Source of protocol delays
pub trait Pacer {
    /// Block the bring-up for `duration`
    fn wait(&self, kind: Wait, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Wall-clock delays on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    fn wait(&self, kind: Wait, duration: Duration) -> impl Future<Output = ()> + Send {
        trace!(?kind, ?duration, "waiting");
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_sleeps_for_duration() {
        let start = tokio::time::Instant::now();
        TokioPacer.wait(Wait::Settle, Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
