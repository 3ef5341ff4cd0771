use super::ProcessError;

/// Sends SIGKILL to every process in the group led by `pgid`. A group that
/// is already gone is not an error.
#[cfg(unix)]
pub fn kill_process_group(pgid: u32) -> Result<(), ProcessError> {
    let group = libc::pid_t::try_from(pgid).map_err(|_| ProcessError::InvalidPid(pgid))?;
    if group <= 0 {
        return Err(ProcessError::InvalidPid(pgid));
    }

    let rc = unsafe { libc::killpg(group, libc::SIGKILL) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(ProcessError::Signal(err));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn kill_process_group(_pgid: u32) -> Result<(), ProcessError> {
    Ok(())
}
