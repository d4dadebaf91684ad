//! The core, UI-agnostic library for the `sparsecopy` utility.
//!
//! `sparsecopy-core` copies a file or device to a destination while turning
//! runs of zero blocks into holes. It can also superimpose the source onto an
//! existing destination, in which case it checks that every region it leaves
//! as a hole already reads as zero, so no stale data shows through.
//!
//! The library is structured into several key modules:
//! - [`config`]: The [`Config`](config::Config) record that governs a transfer.
//! - [`stream`]: Source and destination handles and the [`Destination`](stream::Destination) trait.
//! - [`engine`]: The block scanning loop.
//! - [`finalize`]: Destination length reconciliation and block device handling.
//! - [`stats`] and [`progress`]: Counters and percentage reporting.
//! - [`platform`]: Operating system calls for block devices.
//!
//! The primary entry point is [`transfer::run`], which opens both streams,
//! copies, finalizes, and reports progress via callbacks so the calling
//! application can display it in any way it chooses.
//!
//! ## Example: Making a Sparse Copy
//!
//! ```rust,no_run
//! use sparsecopy_core::{config::Config, transfer};
//! use std::path::Path;
//!
//! fn main() -> sparsecopy_core::Result<()> {
//!     let config = Config::default()
//!         .with_block_size(4096)
//!         .with_show_progress(true);
//!
//!     let report = transfer::run(
//!         Path::new("disk.raw"),
//!         Path::new("disk-sparse.raw"),
//!         &config,
//!         |expected| println!("copying {expected:?} bytes"),
//!         |progress| println!("{:.1}%", progress.percent()),
//!         || println!("rereading partition table"),
//!     )?;
//!
//!     println!("sparsecopy: {}", report.statistics);
//!     Ok(())
//! }
//! ```

pub mod config;
mod consistency;
pub mod device;
pub mod engine;
pub mod error;
pub mod finalize;
mod os_options;
pub mod platform;
pub mod progress;
pub mod stats;
pub mod stream;
mod sync;
pub mod transfer;
pub mod zero;

pub use consistency::SkipSafety;
pub use error::{ErrorKind, Result, SparseCopyError};
