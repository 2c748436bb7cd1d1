//! Termination handling
//!
//! SIGINT and SIGTERM both do the same thing: end the resident phase so
//! teardown can run. Neither carries any other meaning.

use std::io;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Cancellation token distinguishing "running" from "told to stop"
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Block until the token is triggered
    pub async fn wait(&mut self) {
        // The sender lives in self, so the channel cannot close underneath us
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

/// Trigger `token` on the first SIGINT or SIGTERM
///
/// Handlers are registered before this returns, so a signal arriving right
/// after the call is not lost.
pub fn listen_for_termination(token: ShutdownToken) -> io::Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("SIGINT received"),
            _ = terminate.recv() => info!("SIGTERM received"),
        }
        token.trigger();
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_trigger() {
        let mut token = ShutdownToken::new();
        let trigger = token.clone();
        assert!(!token.is_triggered());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });

        tokio::time::timeout(Duration::from_secs(5), token.wait())
            .await
            .unwrap();
        assert!(token.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_blocks_while_running() {
        let mut token = ShutdownToken::new();
        let waited = tokio::time::timeout(Duration::from_secs(3600), token.wait()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_sigterm_triggers_token() {
        let mut token = ShutdownToken::new();
        let listener = listen_for_termination(token.clone()).unwrap();

        // SAFETY: signalling our own process; the handler is installed
        unsafe {
            libc::kill(libc::getpid(), libc::SIGTERM);
        }

        tokio::time::timeout(Duration::from_secs(5), token.wait())
            .await
            .unwrap();
        listener.await.unwrap();
    }
}
