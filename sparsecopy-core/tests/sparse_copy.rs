//! Integration tests for sparse transfers through the public API.

use proptest::prelude::*;
use sparsecopy_core::config::Config;
use sparsecopy_core::finalize::{Finalization, RescanPolicy};
use sparsecopy_core::stream::{DestinationStream, SourceStream};
use sparsecopy_core::transfer::{self, Report};
use sparsecopy_core::ErrorKind;
use std::fs;
use std::io::Cursor;

fn copy_in_memory(config: &Config, source: &[u8], destination: Vec<u8>) -> (Report, Vec<u8>) {
    let mut src = SourceStream::probe(Cursor::new(source.to_vec())).unwrap();
    let mut dst = DestinationStream::new(Cursor::new(destination), config.seek_position).unwrap();
    let policy = RescanPolicy::default();
    let report = transfer::transfer(config, &mut src, &mut dst, &policy, |_| {}, || {}).unwrap();
    (report, dst.into_inner().into_inner())
}

/// Source content made of whole zero and non-zero runs, so both paths of the
/// engine are exercised.
fn runs() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec((any::<bool>(), 1usize..1500, 1u8..=255), 0..12).prop_map(|runs| {
        runs.into_iter()
            .flat_map(|(zero, len, byte)| std::iter::repeat_n(if zero { 0 } else { byte }, len))
            .collect()
    })
}

proptest! {
    #[test]
    fn round_trip_matches_source(data in runs(), block_size in 1u64..2048) {
        let config = Config::default().with_block_size(block_size);
        let (report, out) = copy_in_memory(&config, &data, Vec::new());
        prop_assert_eq!(&out, &data);
        let stats = report.statistics;
        prop_assert_eq!(stats.total_bytes_processed(), data.len() as u64);
        prop_assert_eq!(stats.bytes_nonzero_destination, 0);
    }

    #[test]
    fn overlay_round_trip_over_dirty_destination(
        data in runs(),
        dirt in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let config = Config::default().with_overlay_existing(true);
        let (_, out) = copy_in_memory(&config, &data, dirt.clone());
        prop_assert_eq!(&out[..data.len()], &data[..]);
        if dirt.len() > data.len() {
            prop_assert_eq!(&out[data.len()..], &dirt[data.len()..]);
        }
    }

    #[test]
    fn rerun_is_idempotent(data in runs(), dirt in prop::collection::vec(any::<u8>(), 0..4096)) {
        let config = Config::default().with_overlay_existing(true);
        let (first, out) = copy_in_memory(&config, &data, dirt);
        let (second, again) = copy_in_memory(&config, &data, out.clone());
        prop_assert_eq!(&again, &out);
        let (first, second) = (first.statistics, second.statistics);
        prop_assert_eq!(first.total_bytes_processed(), second.total_bytes_processed());
        prop_assert_eq!(second.bytes_nonzero_destination, 0);
        prop_assert_eq!(
            second.bytes_written_real,
            first.bytes_written_real - first.bytes_nonzero_destination
        );
    }
}

#[test]
fn test_all_zero_source_writes_nothing() {
    let (report, out) = copy_in_memory(&Config::default(), &[0u8; 1 << 16], Vec::new());
    assert_eq!(report.statistics.bytes_written_real, 0);
    assert_eq!(report.statistics.bytes_skipped_sparse, 1 << 16);
    assert_eq!(out.len(), 1 << 16);
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn test_seek_position_offsets_output() {
    let config = Config::default()
        .with_overlay_existing(true)
        .with_seek_position(1024);
    let (_, out) = copy_in_memory(&config, &[5u8; 100], vec![3u8; 2048]);
    assert!(out[..1024].iter().all(|&b| b == 3));
    assert!(out[1024..1124].iter().all(|&b| b == 5));
    assert!(out[1124..].iter().all(|&b| b == 3));
    assert_eq!(out.len(), 2048);
}

#[test]
fn test_run_on_real_files_with_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.img");
    let dst = dir.path().join("dst.img");

    let mut source = vec![0u8; 8192];
    source[4096..4196].fill(0x11);
    fs::write(&src, &source).unwrap();

    let mut existing = vec![0u8; 16384];
    existing[1000] = 0x22;
    existing[12000] = 0x33;
    fs::write(&dst, &existing).unwrap();

    let config = Config::default().with_overlay_existing(true);
    let report = transfer::run(&src, &dst, &config, |_| {}, |_| {}, || {}).unwrap();

    assert_eq!(report.statistics.bytes_nonzero_destination, 512);
    assert_eq!(report.statistics.bytes_written_real, 1024);
    assert!(matches!(
        report.finalization,
        Finalization::Resized { length: 16384 }
    ));

    let out = fs::read(&dst).unwrap();
    assert_eq!(&out[..8192], &source[..]);
    assert_eq!(out[12000], 0x33);
}

#[test]
fn test_remainder_exceeds_limit_on_real_files() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.img");
    let dst = dir.path().join("dst.img");
    fs::write(&src, [1u8; 3000]).unwrap();

    let config = Config::default()
        .with_max_bytes(Some(2048))
        .with_error_on_remainder(true);
    let err = transfer::run(&src, &dst, &config, |_| {}, |_| {}, || {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemainderExceedsLimit);
    assert_eq!(err.exit_code(), 12);
    assert_eq!(fs::metadata(&dst).unwrap().len(), 2048);
}
