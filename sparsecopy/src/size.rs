//! Parsing of `SIZE` and `POS` arguments.
//!
//! A size is a decimal number, optionally followed by one suffix letter.
//! Without a suffix the number counts blocks; with one it counts powers of
//! 1024 bytes (`B`, `K`, `M`, `G`, `T`, `P`, `E`). Suffixes are binary on
//! purpose, to stay compatible with `dd`.

use sparsecopy_core::SparseCopyError;

const SUFFIXES: &str = "bkmgtpe";

/// Parses `arg` as a byte count, using `unit` bytes per bare number.
pub fn parse_size(arg: &str, unit: u64) -> Result<u64, SparseCopyError> {
    let bad = || SparseCopyError::BadArgument(format!("bad parameter '{arg}'"));

    let digits_end = arg
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(arg.len());
    let (digits, suffix) = arg.split_at(digits_end);
    if digits.is_empty() {
        return Err(bad());
    }
    let value: u64 = digits.parse().map_err(|_| bad())?;

    let multiplier = match suffix.chars().collect::<Vec<_>>().as_slice() {
        [] => unit,
        [c] => {
            let power = SUFFIXES
                .find(c.to_ascii_lowercase())
                .ok_or_else(bad)?;
            1u64 << (10 * power)
        }
        _ => return Err(bad()),
    };

    value.checked_mul(multiplier).ok_or_else(bad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number_counts_blocks() {
        assert_eq!(parse_size("4", 512).unwrap(), 2048);
        assert_eq!(parse_size("0", 4096).unwrap(), 0);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(parse_size("100B", 512).unwrap(), 100);
        assert_eq!(parse_size("4k", 512).unwrap(), 4096);
        assert_eq!(parse_size("2M", 512).unwrap(), 2 << 20);
        assert_eq!(parse_size("1g", 512).unwrap(), 1 << 30);
        assert_eq!(parse_size("1T", 512).unwrap(), 1 << 40);
        assert_eq!(parse_size("1P", 512).unwrap(), 1 << 50);
        assert_eq!(parse_size("3E", 512).unwrap(), 3 << 60);
    }

    #[test]
    fn test_rejects_garbage() {
        for arg in ["", "k", "12x", "-5", "1.5M", "10KB", " 10"] {
            assert!(parse_size(arg, 512).is_err(), "accepted {arg:?}");
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_size("16E", 512).is_err());
        assert!(parse_size("99999999999999999999", 1).is_err());
        assert!(parse_size("36028797018963968", 512).is_err());
    }
}
