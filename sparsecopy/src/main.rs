mod progress;
mod size;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use sparsecopy_core::SparseCopyError;
use sparsecopy_core::config::{Config, DEFAULT_BLOCK_SIZE};
use sparsecopy_core::finalize::Finalization;
use sparsecopy_core::transfer;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::progress::CopyProgress;
use crate::size::parse_size;

const AFTER_HELP: &str = "\
Copies from SOURCE (sparse or not) to DEST, making DEST sparse on the way.
If DEST already exists, --overlay superimposes SOURCE on top of it; unless
--nocheck is given as well, every block to be left as a hole is first checked
to be zero in DEST already. Block devices are never resized.

SOURCE can be \"-\" for standard input. SOURCE and DEST can be raw devices.
To make an empty sparse file, use /dev/null as SOURCE together with -f.

SIZE and POS count blocks by default, or take one of these suffixes:
     B  Bytes      (2^0  bytes)
     K  Kilobytes  (2^10 bytes)
     M  Megabytes  (2^20 bytes)
     G  Gigabytes  (2^30 bytes)
     T  Terabytes  (2^40 bytes)
     P  Petabytes  (2^50 bytes)
     E  Exabytes   (2^60 bytes)

--blocksize itself counts 512-byte blocks, so --blocksize 1024 means 512K;
write 1024B if you mean bytes. Suffixes are binary, as in dd.";

#[derive(Parser)]
#[command(name = "sparsecopy")]
#[command(about = "Copy a file or device, making the destination sparse", version)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// File or device to read, or "-" for standard input
    source: PathBuf,

    /// File or device to write
    dest: PathBuf,

    /// Overlay existing DEST rather than truncating it
    #[arg(short = 'o', long)]
    overlay: bool,

    /// Skip the zero check of blocks left as holes
    #[arg(short = 'n', long)]
    nocheck: bool,

    /// Quiet
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Copy at most SIZE bytes from SOURCE
    #[arg(short = 'm', long = "max", visible_alias = "maxwrite", value_name = "SIZE")]
    max: Option<String>,

    /// Fail if SOURCE holds more than --max
    #[arg(short = 'e', long = "errorremainder")]
    error_remainder: bool,

    /// Block size (default 512 bytes)
    #[arg(short = 'b', long = "blocksize", value_name = "SIZE")]
    block_size: Option<String>,

    /// Start writing SOURCE at POS in DEST
    #[arg(short = 's', long = "seek", value_name = "POS")]
    seek: Option<String>,

    /// Set the size of DEST to SIZE when done (no effect on block devices)
    #[arg(short = 'f', long = "finalsize", value_name = "SIZE")]
    final_size: Option<String>,

    /// Abort unless the first block of DEST is zero
    #[arg(short = 'c', long)]
    check: bool,

    /// Display a progress bar on stderr
    #[arg(short = 'p', long)]
    progress: bool,

    /// Flush written data to disk every SIZE bytes
    #[arg(short = 'y', long = "syncevery", value_name = "SIZE")]
    sync_every: Option<String>,

    /// Log what the copy is doing
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    /// Builds the transfer configuration. The block size is parsed first
    /// because the other sizes are counted in blocks.
    fn to_config(&self) -> Result<Config, SparseCopyError> {
        let block_size = match &self.block_size {
            Some(arg) => parse_size(arg, DEFAULT_BLOCK_SIZE)?,
            None => DEFAULT_BLOCK_SIZE,
        };
        let size = |arg: &Option<String>| {
            arg.as_deref()
                .map(|a| parse_size(a, block_size))
                .transpose()
        };

        let config = Config::default()
            .with_block_size(block_size)
            .with_seek_position(size(&self.seek)?.unwrap_or(0))
            .with_max_bytes(size(&self.max)?)
            .with_sync_every(size(&self.sync_every)?)
            .with_final_size(size(&self.final_size)?)
            .with_overlay_existing(self.overlay)
            .with_skip_consistency_check(self.nocheck)
            .with_verify_first_block_zero(self.check)
            .with_quiet(self.quiet)
            .with_show_progress(self.progress && CopyProgress::should_show())
            .with_error_on_remainder(self.error_remainder);
        config.validate()?;
        Ok(config)
    }
}

/// Installs a stderr log subscriber. `RUST_LOG` overrides the level chosen
/// from `--quiet` and `--verbose`.
fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn report_finalization(finalization: &Finalization) {
    if let Finalization::PartitionTableUnchanged { error, .. } = finalization {
        eprintln!(
            "{} partition table not reread: {}",
            style("note:").yellow(),
            error
        );
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.to_config()?;
    debug!(?config, "parsed arguments");

    let bar = if config.show_progress {
        CopyProgress::new()
    } else {
        CopyProgress::hidden()
    };

    let report = transfer::run(
        &cli.source,
        &cli.dest,
        &config,
        |expected| bar.start(expected),
        |progress| bar.update(progress),
        || {
            if !config.quiet {
                bar.notice("Rereading partition table");
            }
        },
    )
    .with_context(|| {
        format!(
            "copying {} to {}",
            cli.source.display(),
            cli.dest.display()
        )
    })?;
    drop(bar);

    if !config.quiet {
        report_finalization(&report.finalization);
        eprintln!("sparsecopy: {}", report.statistics);
    }
    Ok(())
}

fn core_error(err: &anyhow::Error) -> Option<&SparseCopyError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SparseCopyError>())
}

/// Exit status for a failed run: the error kind's code when the failure came
/// from the core library, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    core_error(err).map_or(1, SparseCopyError::exit_code)
}

/// Whether the copy refused to proceed because the data did not meet a
/// requested condition, as opposed to failing on I/O.
fn is_refusal(err: &anyhow::Error) -> bool {
    core_error(err).is_some_and(SparseCopyError::is_consistency_violation)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            // Printing usage can only fail if stderr is gone.
            e.print().ok();
            return ExitCode::from(code);
        }
    };

    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let label = if is_refusal(&e) {
                style("sparsecopy: refused:").yellow().bold()
            } else {
                style("sparsecopy:").red().bold()
            };
            eprintln!("{label} {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
