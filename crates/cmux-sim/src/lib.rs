//! CMUX Bring-up Simulation Library
//!
//! Stand-ins for everything the bring-up engine touches, so the whole
//! sequence can run in tests without a modem, root, or the n_gsm module:
//!
//! - **VirtualModem**: scripted AT responder on an in-memory duplex stream
//! - **SimMuxDriver**: records discipline attach and configuration traffic
//! - **PlaceholderNodeBackend**: regular files in place of device nodes
//! - **RecordingPacer**: records protocol waits and returns immediately
//!
//! # Example
//!
//! ```rust
//! use cmux_link::{switch_to_cmux, AtChannel};
//! use cmux_protocol::ModemProfile;
//! use cmux_sim::{RecordingPacer, VirtualModem};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut line, modem) = VirtualModem::new().reject("AT+GMM").spawn();
//! let pacer = RecordingPacer::new();
//!
//! let plan = ModemProfile::Sim900.plan(115200, 255);
//! let mut channel = AtChannel::new(&mut line, &pacer);
//! let report = switch_to_cmux(&mut channel, &plan).await.unwrap();
//!
//! assert_eq!(report.rejected_advisories().count(), 1);
//! assert_eq!(modem.commands().len(), 5);
//! # }
//! ```

pub mod driver;
pub mod modem;
pub mod nodes;
pub mod pacer;

pub use driver::SimMuxDriver;
pub use modem::{run_virtual_modem_task, ModemHandle, Reply, VirtualModem};
pub use nodes::PlaceholderNodeBackend;
pub use pacer::RecordingPacer;
