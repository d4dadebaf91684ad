#[cfg(unix)]
pub(crate) use std::os::unix::fs::OpenOptionsExt;

#[cfg(not(unix))]
pub(crate) trait OpenOptionsExt {
    fn mode(&mut self, mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        // Permission bits have no equivalent when creating files here; the
        // platform default ACL applies.
        self
    }
}
