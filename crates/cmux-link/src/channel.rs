//! AT command channel
//!
//! One exchange is: write the command, wait out the response delay, then do
//! a single bounded read and look for `OK\r`. There are no retries here;
//! whether a rejection is fatal is the caller's decision.

use std::io::ErrorKind;
use std::time::Duration;

use cmux_protocol::{printable_reply, AtOutcome, SIZE_BUF};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::debug;

use crate::error::LinkError;
use crate::pacer::{Pacer, Wait};

/// Delays used by each exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTiming {
    /// Fixed delay between writing a command and reading its reply
    pub response_wait: Duration,
    /// Bound on the single reply read; nothing inside it means no reply
    pub reply_window: Duration,
}

impl Default for ChannelTiming {
    fn default() -> Self {
        Self {
            response_wait: Duration::from_secs(1),
            reply_window: Duration::from_millis(50),
        }
    }
}

/// AT command channel over a borrowed serial line
///
/// Generic over the I/O type so a virtual modem on a `DuplexStream` can
/// stand in for the real port.
pub struct AtChannel<'a, S, P> {
    line: &'a mut S,
    pacer: &'a P,
    timing: ChannelTiming,
}

impl<'a, S, P> AtChannel<'a, S, P>
where
    S: AsyncRead + AsyncWrite + Unpin,
    P: Pacer,
{
    pub fn new(line: &'a mut S, pacer: &'a P) -> Self {
        Self::with_timing(line, pacer, ChannelTiming::default())
    }

    pub fn with_timing(line: &'a mut S, pacer: &'a P, timing: ChannelTiming) -> Self {
        Self {
            line,
            pacer,
            timing,
        }
    }

    pub fn pacer(&self) -> &P {
        self.pacer
    }

    /// Send `command` (caller supplies the trailing CR) and classify the reply
    ///
    /// Write and read failures are fatal; silence or a non-OK reply is
    /// returned as [`AtOutcome::NoResponseOrReject`].
    pub async fn exchange(&mut self, command: &str) -> Result<AtOutcome, LinkError> {
        let label = command.trim_end_matches('\r');

        let written = self
            .line
            .write(command.as_bytes())
            .await
            .map_err(|source| LinkError::Write {
                command: label.to_string(),
                source,
            })?;
        if written < command.len() {
            return Err(LinkError::ShortWrite {
                command: label.to_string(),
                written,
                expected: command.len(),
            });
        }
        // No flush: on a tty it drains, which blocks forever while CTS is low

        self.pacer
            .wait(Wait::Response, self.timing.response_wait)
            .await;

        let mut buf = [0u8; SIZE_BUF];
        let n = match timeout(self.timing.reply_window, self.line.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => 0,
            Ok(Err(source)) => {
                return Err(LinkError::Read {
                    command: label.to_string(),
                    source,
                })
            }
            Err(_) => 0,
        };

        if n == 0 {
            debug!("{}\t: No response", label);
            return Ok(AtOutcome::NoResponseOrReject);
        }

        let reply = &buf[..n];
        debug!("{}\t: {}", label, printable_reply(reply));
        Ok(AtOutcome::classify(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::future::Future;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, DuplexStream, ReadBuf};

    /// Counts response waits without sleeping
    #[derive(Default)]
    struct CountingPacer {
        waits: AtomicUsize,
    }

    impl Pacer for CountingPacer {
        fn wait(&self, _kind: Wait, _duration: Duration) -> impl Future<Output = ()> + Send {
            self.waits.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    /// Line that accepts writes but never finishes draining, like a UART
    /// held off by CTS
    struct StalledDrain {
        inner: DuplexStream,
    }

    impl AsyncRead for StalledDrain {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for StalledDrain {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
        }
    }

    /// Feed `reply` to the host side, then run one exchange
    async fn exchange_with_reply(reply: &[u8]) -> (AtOutcome, Vec<u8>) {
        let (mut host, mut modem) = duplex(4096);
        if !reply.is_empty() {
            modem.write_all(reply).await.unwrap();
        }
        let pacer = CountingPacer::default();
        let outcome = AtChannel::new(&mut host, &pacer)
            .exchange("AT\r")
            .await
            .unwrap();
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 1);

        let mut sent = [0u8; 16];
        let n = modem.read(&mut sent).await.unwrap();
        (outcome, sent[..n].to_vec())
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_ok_reply() {
        let (outcome, sent) = exchange_with_reply(b"OK\r").await;
        assert_eq!(outcome, AtOutcome::Ok);
        assert_eq!(sent, b"AT\r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ok_without_cr_is_rejected() {
        let (outcome, _) = exchange_with_reply(b"OK").await;
        assert_eq!(outcome, AtOutcome::NoResponseOrReject);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_is_not_fatal() {
        let (outcome, _) = exchange_with_reply(b"").await;
        assert_eq!(outcome, AtOutcome::NoResponseOrReject);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlong_reply_is_truncated() {
        let mut reply = vec![b'.'; SIZE_BUF * 2];
        reply.extend_from_slice(b"OK\r");
        let (outcome, _) = exchange_with_reply(&reply).await;
        assert_eq!(outcome, AtOutcome::NoResponseOrReject);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_to_closed_line_is_fatal() {
        let (mut host, modem) = duplex(64);
        drop(modem);
        let pacer = CountingPacer::default();
        let err = AtChannel::new(&mut host, &pacer)
            .exchange("AT\r")
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Write { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_write_is_fatal() {
        let (mut host, _modem) = duplex(4);
        let pacer = CountingPacer::default();
        let err = AtChannel::new(&mut host, &pacer)
            .exchange("AT+CMUX=0\r")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LinkError::ShortWrite {
                written: 4,
                expected: 10,
                ..
            }
        ));
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_modem_with_stalled_drain_is_bounded() {
        let (host, mut modem) = duplex(64);
        let mut line = StalledDrain { inner: host };
        let pacer = CountingPacer::default();

        let outcome = timeout(
            Duration::from_secs(3600),
            AtChannel::new(&mut line, &pacer).exchange("AT+IFC=2,2\r"),
        )
        .await
        .expect("exchange did not return")
        .unwrap();
        assert_eq!(outcome, AtOutcome::NoResponseOrReject);
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 1);

        let mut sent = [0u8; 16];
        let n = modem.read(&mut sent).await.unwrap();
        assert_eq!(&sent[..n], b"AT+IFC=2,2\r");
    }
}
