//! CMUX Link Bring-up Engine
//!
//! This crate takes a modem on a serial line from plain AT mode to a
//! running GSM 0710 multiplexer handled by the kernel's n_gsm line
//! discipline. Linux only.
//!
//! # Stages
//!
//! The stages run strictly one after another, each relying on the state
//! the previous one left behind:
//!
//! 1. [`serial`]: open the tty and set raw mode, RTS/CTS, speed
//! 2. [`sequencer`]: send the profile's AT commands through an [`AtChannel`]
//! 3. [`driver`]: attach n_gsm and write the multiplexer parameters
//! 4. [`nodes`]: create `{base}1..={base}N` for the multiplexed channels
//!
//! Protocol delays go through a [`Pacer`] so tests run without wall-clock
//! waits.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::os::unix::io::AsRawFd;
//!
//! use cmux_link::{activate, open_line, switch_to_cmux, AtChannel, GsmLineDiscipline, TokioPacer};
//! use cmux_protocol::ModemProfile;
//!
//! # async fn run() -> Result<(), cmux_link::LinkError> {
//! let mut line = open_line("/dev/ttyS1", 115200)?;
//! let mut driver = GsmLineDiscipline::new(line.as_raw_fd());
//!
//! let plan = ModemProfile::Sim900.plan(115200, 255);
//! let mut channel = AtChannel::new(&mut line, &TokioPacer);
//! switch_to_cmux(&mut channel, &plan).await?;
//! activate(&mut driver, 255)?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod nodes;
pub mod pacer;
pub mod sequencer;
pub mod serial;

pub use channel::{AtChannel, ChannelTiming};
pub use driver::{activate, GsmConfig, GsmLineDiscipline, MuxDriver, N_GSM0710};
pub use error::LinkError;
pub use nodes::{
    discover_major, find_major, CharDeviceBackend, DeviceNodes, NodeBackend, NodeLayout,
    DEVICE_REGISTRY, MAX_NODES,
};
pub use pacer::{Pacer, TokioPacer, Wait};
pub use sequencer::{switch_to_cmux, SequenceReport, StepReport};
pub use serial::{configure_line, open_line};
