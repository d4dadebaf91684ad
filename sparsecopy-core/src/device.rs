use std::fmt;
use std::fs::Metadata;

/// The kind of object a destination stream refers to.
///
/// Block-special devices cannot change size, so the finalizer treats them
/// differently from regular files. Everything else (character devices,
/// pipes, sockets) is left untouched after the copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// A regular file whose length can be set.
    RegularFile,
    /// A block-special device (e.g. `/dev/sdb`).
    BlockDevice,
    /// Anything else.
    Other,
}

impl DeviceKind {
    /// Classifies a destination from its metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_file() {
            return Self::RegularFile;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_block_device() {
                return Self::BlockDevice;
            }
        }
        Self::Other
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RegularFile => "regular file",
            Self::BlockDevice => "block device",
            Self::Other => "special file",
        };
        f.write_str(name)
    }
}
