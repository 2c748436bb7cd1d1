//! Multiplex driver facade
//!
//! Hands the serial descriptor over to the kernel's n_gsm line discipline
//! and configures it. Everything after a successful [`activate`] is framed
//! by the kernel.

use std::io;
use std::os::unix::io::RawFd;

use cmux_protocol::params::{N2, T1, T2, T3};
use cmux_protocol::{Encapsulation, MuxParameters};
use tracing::{debug, info};

use crate::error::LinkError;

/// Line discipline number of n_gsm
pub const N_GSM0710: libc::c_int = 21;

/// Kernel `struct gsm_config` from `linux/gsmmux.h`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GsmConfig {
    pub adaption: libc::c_uint,
    pub encapsulation: libc::c_uint,
    pub initiator: libc::c_uint,
    pub t1: libc::c_uint,
    pub t2: libc::c_uint,
    pub t3: libc::c_uint,
    pub n2: libc::c_uint,
    pub mru: libc::c_uint,
    pub mtu: libc::c_uint,
    pub k: libc::c_uint,
    pub i: libc::c_uint,
    pub unused: [libc::c_uint; 8],
}

/// `_IOR('G', 0, struct gsm_config)`
pub const GSMIOC_GETCONF: libc::Ioctl = libc::_IOR::<GsmConfig>(b'G' as u32, 0);
/// `_IOW('G', 1, struct gsm_config)`
pub const GSMIOC_SETCONF: libc::Ioctl = libc::_IOW::<GsmConfig>(b'G' as u32, 1);

impl GsmConfig {
    /// Overwrite the fields bring-up owns; everything else stays as read,
    /// including the reserved words
    pub fn apply_bring_up(&mut self, mtu: u32) {
        self.initiator = 1;
        self.encapsulation = Encapsulation::Basic.as_raw();
        self.mru = mtu;
        self.mtu = mtu;
        self.t1 = T1;
        self.n2 = N2;
        self.t2 = T2;
        self.t3 = T3;
    }
}

impl TryFrom<GsmConfig> for MuxParameters {
    type Error = io::Error;

    fn try_from(raw: GsmConfig) -> Result<Self, Self::Error> {
        let encapsulation = Encapsulation::try_from(raw.encapsulation)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(MuxParameters {
            adaption: raw.adaption,
            encapsulation,
            initiator: raw.initiator != 0,
            t1: raw.t1,
            t2: raw.t2,
            t3: raw.t3,
            n2: raw.n2,
            mru: raw.mru,
            mtu: raw.mtu,
            k: raw.k,
            i: raw.i,
        })
    }
}

/// Control interface of the kernel multiplexing driver
pub trait MuxDriver {
    /// Switch the line to the GSM 0710 discipline
    fn attach_discipline(&mut self) -> io::Result<()>;

    /// Read the current multiplexer configuration block
    fn read_config(&mut self) -> io::Result<GsmConfig>;

    /// Write a multiplexer configuration block
    fn write_config(&mut self, config: &GsmConfig) -> io::Result<()>;
}

/// n_gsm driver reached through ioctls on the serial descriptor
///
/// Does not own the descriptor; whoever owns the serial line closes it.
#[derive(Debug)]
pub struct GsmLineDiscipline {
    fd: RawFd,
}

impl GsmLineDiscipline {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl MuxDriver for GsmLineDiscipline {
    fn attach_discipline(&mut self) -> io::Result<()> {
        let ldisc: libc::c_int = N_GSM0710;
        // SAFETY: TIOCSETD reads one int from the pointer
        if unsafe { libc::ioctl(self.fd, libc::TIOCSETD, &ldisc as *const libc::c_int) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn read_config(&mut self) -> io::Result<GsmConfig> {
        let mut raw = GsmConfig::default();
        // SAFETY: GSMIOC_GETCONF fills exactly one struct gsm_config
        if unsafe { libc::ioctl(self.fd, GSMIOC_GETCONF, &mut raw as *mut GsmConfig) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(raw)
    }

    fn write_config(&mut self, config: &GsmConfig) -> io::Result<()> {
        // SAFETY: GSMIOC_SETCONF reads exactly one struct gsm_config
        if unsafe { libc::ioctl(self.fd, GSMIOC_SETCONF, config as *const GsmConfig) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Attach the discipline and configure it with a read-modify-write cycle
///
/// The block read from the driver is written back with only the bring-up
/// fields changed. Returns the written configuration.
pub fn activate<D: MuxDriver>(driver: &mut D, mtu: u32) -> Result<MuxParameters, LinkError> {
    driver
        .attach_discipline()
        .map_err(LinkError::AttachDiscipline)?;

    let mut raw = driver.read_config().map_err(LinkError::GetMuxConfig)?;
    debug!(?raw, "driver defaults");

    raw.apply_bring_up(mtu);
    let params = MuxParameters::try_from(raw).map_err(LinkError::SetMuxConfig)?;
    driver.write_config(&raw).map_err(LinkError::SetMuxConfig)?;

    info!("Line discipline set");
    Ok(params)
}
