//! Provides platform-specific functionality.
//!
//! This module holds the operating system calls the finalizer needs for
//! block-special destinations: a global sync barrier and the request to
//! re-read a device's partition table.
//!
//! It uses conditional compilation (`#[cfg]`) to expose the correct
//! implementation for the target OS. Each submodule exposes the same API, so
//! the rest of the library can call it without caring about the platform.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::*;

#[cfg(not(target_os = "linux"))]
mod other;
#[cfg(not(target_os = "linux"))]
pub use self::other::*;
