use std::fs::File;
use std::io;

/// Flushes pending filesystem buffers. No global barrier exists here.
pub fn sync_all_filesystems() {}

/// Partition table re-reads are only implemented on Linux.
pub fn reread_partition_table(_device: &File) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "partition table re-read is not supported on this platform",
    ))
}

/// Whether an error from [`reread_partition_table`] means "try again later".
pub fn is_device_busy(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ResourceBusy
}
