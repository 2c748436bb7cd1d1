//! AT reply classification
//!
//! The modem answers each command with CR-delimited status tokens. Only the
//! literal `OK\r` token counts as success; anything else, including silence,
//! is a rejection.

/// Capacity of the reply buffer filled by a single read
pub const SIZE_BUF: usize = 256;

/// Success token searched for in modem replies
pub const OK_TOKEN: &[u8] = b"OK\r";

/// Result of one AT exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtOutcome {
    /// Reply contained the `OK\r` token
    Ok,
    /// No reply, or a reply without the `OK\r` token
    NoResponseOrReject,
}

impl AtOutcome {
    /// Classify a raw reply. Bytes past [`SIZE_BUF`] are never looked at.
    pub fn classify(reply: &[u8]) -> Self {
        let reply = &reply[..reply.len().min(SIZE_BUF)];
        if reply.windows(OK_TOKEN.len()).any(|w| w == OK_TOKEN) {
            AtOutcome::Ok
        } else {
            AtOutcome::NoResponseOrReject
        }
    }

    /// Whether the modem accepted the command
    pub fn is_ok(&self) -> bool {
        matches!(self, AtOutcome::Ok)
    }
}

/// Render a reply on one line, CR and LF replaced by spaces
pub fn printable_reply(reply: &[u8]) -> String {
    String::from_utf8_lossy(reply)
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}
