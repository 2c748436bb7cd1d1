//! Virtual modem
//!
//! Answers AT commands on one end of a `tokio::io::duplex` pair. Each
//! command can be scripted to succeed, fail, stay silent or return
//! arbitrary bytes; everything received is recorded for later assertions.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Buffer size of the simulated serial line
const LINE_BUFFER: usize = 4096;

/// How the modem answers a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `\r\nOK\r\n`
    Ok,
    /// `\r\nERROR\r\n`
    Error,
    /// Nothing at all
    Silent,
    /// Exactly these bytes
    Raw(Vec<u8>),
}

/// Scripted AT responder
#[derive(Debug, Clone)]
pub struct VirtualModem {
    replies: HashMap<String, Reply>,
    default_reply: Reply,
    echo: bool,
}

impl Default for VirtualModem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualModem {
    /// A modem that accepts every command
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            default_reply: Reply::Ok,
            echo: false,
        }
    }

    /// Answer `command` (without CR) with `reply`
    pub fn with_reply(mut self, command: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(command.into(), reply);
        self
    }

    pub fn reject(self, command: impl Into<String>) -> Self {
        self.with_reply(command, Reply::Error)
    }

    pub fn silence(self, command: impl Into<String>) -> Self {
        self.with_reply(command, Reply::Silent)
    }

    /// Reply used for commands without a scripted answer
    pub fn with_default_reply(mut self, reply: Reply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Echo each command back before the reply, like a modem in `ATE1`
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Bytes sent in response to `command`
    pub fn respond(&self, command: &str) -> Vec<u8> {
        let reply = self.replies.get(command).unwrap_or(&self.default_reply);
        let mut out = Vec::new();
        if self.echo && *reply != Reply::Silent {
            out.extend_from_slice(command.as_bytes());
            out.push(b'\r');
        }
        match reply {
            Reply::Ok => out.extend_from_slice(b"\r\nOK\r\n"),
            Reply::Error => out.extend_from_slice(b"\r\nERROR\r\n"),
            Reply::Silent => {}
            Reply::Raw(bytes) => out.extend_from_slice(bytes),
        }
        out
    }

    /// Start the modem on a fresh duplex line; returns the host end
    pub fn spawn(self) -> (DuplexStream, ModemHandle) {
        let (host, modem_end) = duplex(LINE_BUFFER);
        let received = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(run_virtual_modem_task(modem_end, self, received.clone()));
        (host, ModemHandle { received, task })
    }
}

/// Access to a running virtual modem
#[derive(Debug)]
pub struct ModemHandle {
    received: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<io::Result<()>>,
}

impl ModemHandle {
    /// Commands received so far, without their CR
    pub fn commands(&self) -> Vec<String> {
        self.received
            .lock()
            .map(|cmds| cmds.clone())
            .unwrap_or_default()
    }

    /// Wait for the modem to see the host close the line
    pub async fn join(self) -> io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

/// Serve AT commands on `stream` until the host closes it
pub async fn run_virtual_modem_task<S>(
    mut stream: S,
    modem: VirtualModem,
    received: Arc<Mutex<Vec<String>>>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut pending = Vec::new();
    let mut buf = [0u8; 512];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            debug!("Virtual modem line closed");
            return Ok(());
        }
        pending.extend_from_slice(&buf[..n]);

        while let Some(end) = pending.iter().position(|&b| b == b'\r') {
            let line: Vec<u8> = pending.drain(..=end).collect();
            let command = String::from_utf8_lossy(&line[..end]).into_owned();
            trace!("Virtual modem received {:?}", command);

            let reply = modem.respond(&command);
            if let Ok(mut cmds) = received.lock() {
                cmds.push(command);
            }
            if !reply.is_empty() {
                stream.write_all(&reply).await?;
                stream.flush().await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_replies() {
        let modem = VirtualModem::new()
            .reject("AT+IFC=2,2")
            .silence("AT")
            .with_reply("AT+GMM", Reply::Raw(b"SIM900\r".to_vec()));

        assert_eq!(modem.respond("AAAT"), b"\r\nOK\r\n");
        assert_eq!(modem.respond("AT+IFC=2,2"), b"\r\nERROR\r\n");
        assert_eq!(modem.respond("AT"), b"");
        assert_eq!(modem.respond("AT+GMM"), b"SIM900\r");
    }

    #[test]
    fn test_echo() {
        let modem = VirtualModem::new().with_echo(true).silence("AT");
        assert_eq!(modem.respond("AT+GMM"), b"AT+GMM\r\r\nOK\r\n");
        assert_eq!(modem.respond("AT"), b"");
    }

    #[tokio::test]
    async fn test_task_answers_and_records() {
        let (mut host, handle) = VirtualModem::new().reject("AT+CMUX=0").spawn();

        host.write_all(b"AT\rAT+CMUX=0\r").await.unwrap();
        let mut reply = Vec::new();
        while reply.len() < b"\r\nOK\r\n\r\nERROR\r\n".len() {
            let mut buf = [0u8; 64];
            let n = host.read(&mut buf).await.unwrap();
            reply.extend_from_slice(&buf[..n]);
        }

        assert_eq!(reply, b"\r\nOK\r\n\r\nERROR\r\n");
        assert_eq!(handle.commands(), ["AT", "AT+CMUX=0"]);
    }
}
