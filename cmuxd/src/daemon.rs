//! Detaching from the terminal

use std::io;

use tracing::info;

/// Fork into the background, chdir to `/` and point stdio at `/dev/null`
///
/// Diagnostics written to the terminal after this are lost, so it must
/// run only once every loud failure is behind us.
pub fn detach() -> io::Result<()> {
    info!("Going to background");
    // SAFETY: single-threaded runtime, no locks held across the fork
    if unsafe { libc::daemon(0, 0) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
