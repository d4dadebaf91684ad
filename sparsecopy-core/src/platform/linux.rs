use nix::errno::Errno;
use nix::ioctl_none;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

ioctl_none!(blkrrpart, 0x12, 95);

/// Flushes all pending filesystem and block-device buffers.
pub fn sync_all_filesystems() {
    nix::unistd::sync();
}

/// Asks the kernel to re-scan the partition table of a block device.
///
/// Returns the raw error on refusal. A busy device reports
/// [`io::ErrorKind::ResourceBusy`], which callers may retry.
pub fn reread_partition_table(device: &File) -> io::Result<()> {
    // SAFETY: BLKRRPART takes no argument and the descriptor is owned by
    // `device` for the duration of the call.
    match unsafe { blkrrpart(device.as_raw_fd()) } {
        Ok(_) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Whether an error from [`reread_partition_table`] means "try again later".
pub fn is_device_busy(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ResourceBusy || err.raw_os_error() == Some(Errno::EBUSY as i32)
}
