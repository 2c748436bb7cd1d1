//! Serial line configuration
//!
//! Opens the modem's tty and puts it in raw mode with hardware flow control,
//! which is what both the AT handshake and the n_gsm discipline expect.
//! The attributes stay on the device after the process exits.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::debug;

use crate::error::LinkError;

/// Open `path` and configure it for AT command exchange at `speed` baud
///
/// The device is opened non-blocking and without becoming the controlling
/// terminal.
pub fn open_line(path: &str, speed: u32) -> Result<SerialStream, LinkError> {
    debug!("Opening {} at {} baud", path, speed);

    let stream = tokio_serial::new(path, speed)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::Hardware)
        .open_native_async()
        .map_err(|source| LinkError::OpenSerial {
            path: path.to_string(),
            source,
        })?;

    configure_line(stream.as_raw_fd(), speed)?;
    Ok(stream)
}

/// Overwrite the line attributes of `fd`
///
/// No input/output processing, 8 data bits, receiver on, modem control lines
/// ignored, RTS/CTS flow control, non-canonical with VMIN=1/VTIME=0, and
/// `speed` in both directions.
pub fn configure_line(fd: RawFd, speed: u32) -> Result<(), LinkError> {
    let baud = baud_constant(speed).ok_or(LinkError::UnsupportedSpeed(speed))?;

    // SAFETY: termios is plain data and tcgetattr fully initialises it
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut tio) } == -1 {
        return Err(LinkError::GetAttributes(io::Error::last_os_error()));
    }

    tio.c_iflag = 0;
    tio.c_oflag = 0;
    tio.c_cflag = libc::CS8 | libc::CREAD | libc::CLOCAL | libc::CRTSCTS;
    tio.c_lflag = 0;
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    unsafe {
        if libc::cfsetospeed(&mut tio, baud) < 0 || libc::cfsetispeed(&mut tio, baud) < 0 {
            return Err(LinkError::SetSpeed(io::Error::last_os_error()));
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) == -1 {
            return Err(LinkError::SetAttributes(io::Error::last_os_error()));
        }
    }

    debug!("Line attributes set on fd {}", fd);
    Ok(())
}

/// termios speed constant for a baud rate
pub fn baud_constant(speed: u32) -> Option<libc::speed_t> {
    let baud = match speed {
        50 => libc::B50,
        75 => libc::B75,
        110 => libc::B110,
        134 => libc::B134,
        150 => libc::B150,
        200 => libc::B200,
        300 => libc::B300,
        600 => libc::B600,
        1200 => libc::B1200,
        1800 => libc::B1800,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        460800 => libc::B460800,
        500000 => libc::B500000,
        576000 => libc::B576000,
        921600 => libc::B921600,
        1000000 => libc::B1000000,
        1152000 => libc::B1152000,
        1500000 => libc::B1500000,
        2000000 => libc::B2000000,
        2500000 => libc::B2500000,
        3000000 => libc::B3000000,
        3500000 => libc::B3500000,
        4000000 => libc::B4000000,
        _ => return None,
    };
    Some(baud)
}
