//! Error types for the bring-up engine
//!
//! Every variant is fatal: either the environment is unusable or a required
//! AT step was rejected. Best-effort failures never surface here.

use std::io;

use thiserror::Error;

/// Errors that abort the bring-up
#[derive(Debug, Error)]
pub enum LinkError {
    /// Failed to open the serial device
    #[error("cannot open {path}")]
    OpenSerial {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// Baud rate has no termios constant
    #[error("unsupported line speed {0}")]
    UnsupportedSpeed(u32),

    /// tcgetattr failed
    #[error("cannot get line attributes")]
    GetAttributes(#[source] io::Error),

    /// cfsetispeed/cfsetospeed failed
    #[error("cannot set line speed")]
    SetSpeed(#[source] io::Error),

    /// tcsetattr failed
    #[error("cannot set line attributes")]
    SetAttributes(#[source] io::Error),

    /// Writing an AT command failed
    #[error("cannot write {command} to the serial line")]
    Write {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The line accepted only part of an AT command
    #[error("short write of {command}: {written} of {expected} bytes")]
    ShortWrite {
        command: String,
        written: usize,
        expected: usize,
    },

    /// Reading the reply to an AT command failed
    #[error("cannot read reply to {command}")]
    Read {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A required AT step got no reply or a rejection
    #[error("{command}: bad response")]
    CommandRejected { command: String },

    /// TIOCSETD with N_GSM0710 failed
    #[error("cannot set line discipline, is the n_gsm module registered?")]
    AttachDiscipline(#[source] io::Error),

    /// GSMIOC_GETCONF failed
    #[error("cannot get GSM multiplex parameters")]
    GetMuxConfig(#[source] io::Error),

    /// GSMIOC_SETCONF failed
    #[error("cannot set GSM multiplex parameters")]
    SetMuxConfig(#[source] io::Error),

    /// The device registry could not be opened or read
    #[error("cannot read {path}")]
    Registry {
        path: String,
        #[source]
        source: io::Error,
    },

    /// No registry line names the driver
    #[error("cannot get major number for {driver}")]
    MajorNotFound { driver: String },
}
