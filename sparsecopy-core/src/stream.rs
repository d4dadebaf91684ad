//! Source and destination stream handles.
//!
//! A [`SourceStream`] knows its extent when the underlying reader is seekable
//! and reads in whole blocks. A [`DestinationStream`] captures the original
//! extent of the destination once, before anything is written; the engine
//! uses that baseline to decide which skipped blocks need a consistency probe.
//!
//! The [`Destination`] trait is the seam between the engine and real files.
//! It is implemented for [`File`] and for an in-memory `Cursor<Vec<u8>>`.
use crate::device::DeviceKind;
use crate::error::{Result, SparseCopyError};
use crate::os_options::OpenOptionsExt;
use crate::{config::Config, platform};
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Path that selects standard input as the source.
pub const STDIN_PATH: &str = "-";

/// Operations the engine and finalizer need from a destination.
pub trait Destination: Read + Write + Seek {
    /// Commits written data to stable storage.
    fn sync_data(&mut self) -> io::Result<()>;

    /// Sets the logical length of the destination.
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Reports what kind of object the destination is.
    fn kind(&self) -> io::Result<DeviceKind>;

    /// Waits for all pending I/O to reach the device.
    fn sync_barrier(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    /// Asks the OS to re-scan the partition table of a block device.
    fn reread_partition_table(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "destination has no partition table",
        ))
    }
}

impl Destination for File {
    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn kind(&self) -> io::Result<DeviceKind> {
        Ok(DeviceKind::from_metadata(&self.metadata()?))
    }

    fn sync_barrier(&mut self) -> io::Result<()> {
        platform::sync_all_filesystems();
        Ok(())
    }

    fn reread_partition_table(&mut self) -> io::Result<()> {
        platform::reread_partition_table(self)
    }
}

impl Destination for Cursor<Vec<u8>> {
    fn sync_data(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length too large"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }

    fn kind(&self) -> io::Result<DeviceKind> {
        Ok(DeviceKind::RegularFile)
    }
}

/// The input side of a transfer.
#[derive(Debug)]
pub struct SourceStream<R> {
    inner: R,
    extent: Option<u64>,
}

impl<R: Read> SourceStream<R> {
    /// Wraps a reader whose length cannot be determined (a pipe, a socket).
    pub fn unseekable(inner: R) -> Self {
        Self {
            inner,
            extent: None,
        }
    }

    /// Length of the source, if it could be determined at open time.
    pub fn extent(&self) -> Option<u64> {
        self.extent
    }

    /// Whether the source supports seeking.
    pub fn is_seekable(&self) -> bool {
        self.extent.is_some()
    }

    /// Reads into `buf` until it is full or the source reaches end of input.
    ///
    /// Returns the number of bytes read; `0` means end of input.
    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SparseCopyError::SourceRead(e)),
            }
        }
        Ok(filled)
    }

    /// Consumes the handle, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> SourceStream<R> {
    /// Wraps a reader, querying its extent by seeking to the end.
    ///
    /// A failed extent query marks the source as unseekable. When the query
    /// succeeds the reader is rewound to the start.
    pub fn probe(mut inner: R) -> Result<Self> {
        let extent = match inner.seek(SeekFrom::End(0)) {
            Ok(extent) => extent,
            Err(e) => {
                debug!(error = %e, "source is not seekable; progress disabled");
                return Ok(Self::unseekable(inner));
            }
        };
        inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| SparseCopyError::seek("rewind source", e))?;
        Ok(Self {
            inner,
            extent: Some(extent),
        })
    }
}

/// The output side of a transfer.
#[derive(Debug)]
pub struct DestinationStream<D> {
    inner: D,
    original_extent: u64,
}

impl<D: Destination> DestinationStream<D> {
    /// Wraps a destination, records its original extent, and positions the
    /// cursor at `seek_position`.
    pub fn new(mut inner: D, seek_position: u64) -> Result<Self> {
        let original_extent = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| SparseCopyError::seek("query destination extent", e))?;
        inner
            .seek(SeekFrom::Start(seek_position))
            .map_err(|e| SparseCopyError::seek("position destination", e))?;
        Ok(Self {
            inner,
            original_extent,
        })
    }

    /// Extent of the destination before the transfer started.
    pub fn original_extent(&self) -> u64 {
        self.original_extent
    }

    /// Current cursor position.
    pub fn position(&mut self) -> Result<u64> {
        self.inner
            .stream_position()
            .map_err(|e| SparseCopyError::seek("get destination position", e))
    }

    /// Moves the cursor to an absolute position.
    pub(crate) fn seek_to(&mut self, position: u64, context: &'static str) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(position))
            .map(|_| ())
            .map_err(|e| SparseCopyError::seek(context, e))
    }

    /// Moves the cursor forward without writing, leaving a hole.
    pub(crate) fn skip(&mut self, len: u64) -> Result<()> {
        let offset = i64::try_from(len).map_err(|_| {
            SparseCopyError::seek(
                "sparse skip",
                io::Error::new(io::ErrorKind::InvalidInput, "skip length too large"),
            )
        })?;
        self.inner
            .seek(SeekFrom::Current(offset))
            .map(|_| ())
            .map_err(|e| SparseCopyError::seek("sparse skip", e))
    }

    /// Writes all of `data` at the cursor; a short write is an error.
    pub(crate) fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).map_err(SparseCopyError::Write)
    }

    /// Reads into `buf` until it is full or the destination ends.
    pub(crate) fn read_probe(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SparseCopyError::DestinationRead(e)),
            }
        }
        Ok(filled)
    }

    /// Borrows the wrapped destination.
    pub fn get_ref(&self) -> &D {
        &self.inner
    }

    /// Mutably borrows the wrapped destination.
    pub fn get_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    /// Consumes the handle, returning the wrapped destination.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

/// Opens the source named by `path`; `-` selects standard input.
pub fn open_source(path: &Path) -> Result<SourceStream<File>> {
    let file = if path == Path::new(STDIN_PATH) {
        duplicate_stdin().map_err(SparseCopyError::SourceOpen)?
    } else {
        File::open(path).map_err(SparseCopyError::SourceOpen)?
    };
    let source = SourceStream::probe(file)?;
    debug!(path = %path.display(), extent = ?source.extent(), "opened source");
    Ok(source)
}

#[cfg(unix)]
fn duplicate_stdin() -> io::Result<File> {
    use std::os::fd::AsFd;
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    Ok(File::from(fd))
}

#[cfg(not(unix))]
fn duplicate_stdin() -> io::Result<File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "reading the source from standard input is not supported on this platform",
    ))
}

/// Opens or creates the destination named by `path`.
///
/// The destination is truncated unless `config.overlay_existing` is set, and
/// is opened for reading as well when a zero check needs to look at it.
pub fn open_destination(path: &Path, config: &Config) -> Result<DestinationStream<File>> {
    let file = OpenOptions::new()
        .read(config.needs_destination_read())
        .write(true)
        .create(true)
        .truncate(!config.overlay_existing)
        .mode(0o666)
        .open(path)
        .map_err(SparseCopyError::DestinationOpen)?;
    let destination = DestinationStream::new(file, config.seek_position)?;
    debug!(
        path = %path.display(),
        original_extent = destination.original_extent(),
        overlay = config.overlay_existing,
        "opened destination"
    );
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// A reader that hands out one byte per call and cannot seek.
    struct Trickle(Vec<u8>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn test_probe_reports_extent_and_rewinds() {
        let mut cursor = Cursor::new(vec![1u8; 100]);
        cursor.set_position(40);
        let mut source = SourceStream::probe(cursor).unwrap();
        assert_eq!(source.extent(), Some(100));
        let mut buf = [0u8; 10];
        assert_eq!(source.read_block(&mut buf).unwrap(), 10);
        assert_eq!(source.into_inner().position(), 10);
    }

    #[test]
    fn test_read_block_fills_from_short_reads() {
        let mut source = SourceStream::unseekable(Trickle(vec![7u8; 5]));
        assert!(!source.is_seekable());
        let mut buf = [0u8; 4];
        assert_eq!(source.read_block(&mut buf).unwrap(), 4);
        assert_eq!(source.read_block(&mut buf).unwrap(), 1);
        assert_eq!(source.read_block(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_destination_records_original_extent() {
        let mut dest = DestinationStream::new(Cursor::new(vec![9u8; 64]), 16).unwrap();
        assert_eq!(dest.original_extent(), 64);
        assert_eq!(dest.position().unwrap(), 16);
    }

    #[test]
    fn test_skip_past_end_extends_on_write() {
        let mut dest = DestinationStream::new(Cursor::new(Vec::new()), 0).unwrap();
        dest.skip(8).unwrap();
        dest.write_block(&[1, 2]).unwrap();
        assert_eq!(dest.into_inner().into_inner(), vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_open_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_source(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceOpenFailed);
    }

    #[test]
    fn test_open_destination_truncates_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dest.img");
        std::fs::write(&path, [5u8; 1000]).unwrap();

        let dest = open_destination(&path, &Config::default()).unwrap();
        assert_eq!(dest.original_extent(), 0);
    }

    #[test]
    fn test_open_destination_overlay_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dest.img");
        std::fs::write(&path, [5u8; 1000]).unwrap();

        let config = Config::default()
            .with_overlay_existing(true)
            .with_seek_position(100);
        let mut dest = open_destination(&path, &config).unwrap();
        assert_eq!(dest.original_extent(), 1000);
        assert_eq!(dest.position().unwrap(), 100);
    }

    #[test]
    fn test_open_destination_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/dest.img");
        let err = open_destination(&path, &Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationOpenFailed);
    }

    #[test]
    fn test_cursor_set_len() {
        let mut cursor = Cursor::new(vec![1u8; 10]);
        Destination::set_len(&mut cursor, 4).unwrap();
        assert_eq!(cursor.get_ref().len(), 4);
        Destination::set_len(&mut cursor, 6).unwrap();
        assert_eq!(cursor.into_inner(), vec![1, 1, 1, 1, 0, 0]);
    }
}
