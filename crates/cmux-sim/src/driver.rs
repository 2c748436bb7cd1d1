//! Simulated n_gsm driver

use std::io;

use cmux_link::{GsmConfig, MuxDriver};
use tracing::debug;

/// Which control request should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Attach,
    Read,
    Write,
}

/// In-memory multiplexer driver that records every control request
#[derive(Debug, Clone)]
pub struct SimMuxDriver {
    config: GsmConfig,
    attached: bool,
    reads: usize,
    writes: Vec<GsmConfig>,
    failure: Option<Failure>,
}

impl Default for SimMuxDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimMuxDriver {
    /// Driver populated with the kernel's defaults
    pub fn new() -> Self {
        Self::with_defaults(GsmConfig {
            adaption: 1,
            encapsulation: 0,
            initiator: 0,
            t1: 10,
            t2: 34,
            t3: 10,
            n2: 3,
            mru: 64,
            mtu: 64,
            k: 2,
            i: 1,
            unused: [0; 8],
        })
    }

    pub fn with_defaults(config: GsmConfig) -> Self {
        Self {
            config,
            attached: false,
            reads: 0,
            writes: Vec::new(),
            failure: None,
        }
    }

    /// Fail the discipline attach, as when n_gsm is not loaded
    pub fn failing_attach(mut self) -> Self {
        self.failure = Some(Failure::Attach);
        self
    }

    pub fn failing_read(mut self) -> Self {
        self.failure = Some(Failure::Read);
        self
    }

    pub fn failing_write(mut self) -> Self {
        self.failure = Some(Failure::Write);
        self
    }

    pub fn attached(&self) -> bool {
        self.attached
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Configurations written, oldest first
    pub fn writes(&self) -> &[GsmConfig] {
        &self.writes
    }

    /// Current driver configuration
    pub fn config(&self) -> GsmConfig {
        self.config
    }

    fn check(&self, op: Failure) -> io::Result<()> {
        match self.failure {
            Some(Failure::Attach) if op == Failure::Attach => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "line discipline not registered",
            )),
            Some(failure) if failure == op => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "control request rejected",
            )),
            _ => Ok(()),
        }
    }
}

impl MuxDriver for SimMuxDriver {
    fn attach_discipline(&mut self) -> io::Result<()> {
        self.check(Failure::Attach)?;
        debug!("Simulated driver: discipline attached");
        self.attached = true;
        Ok(())
    }

    fn read_config(&mut self) -> io::Result<GsmConfig> {
        self.check(Failure::Read)?;
        self.reads += 1;
        Ok(self.config)
    }

    fn write_config(&mut self, config: &GsmConfig) -> io::Result<()> {
        self.check(Failure::Write)?;
        self.writes.push(*config);
        self.config = *config;
        Ok(())
    }
}
