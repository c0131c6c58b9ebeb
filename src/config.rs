//! Command-line configuration
//!
//! ```text
//! guestheap <script> [--heap-base N] [--page-size N] [--pages N]
//!                    [--max-pages N] [--snapshot-limit BYTES]
//!                    [--summary] [--verbose]
//! ```
//!
//! Numbers are decimal or `0x`-prefixed hex, with optional `_` separators.

use crate::constants::{ALIGNMENT, DEFAULT_SNAPSHOT_LIMIT, NULL};
use crate::memory::RegionConfig;
use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: guestheap <script> [options]

Options:
  --heap-base N          first heap address (default 1024, multiple of 8)
  --page-size N          bytes added per memory grow (default 65536)
  --pages N              pages allocated up front (default 1)
  --max-pages N          page ceiling (default 256)
  --snapshot-limit BYTES memory budget for the replay history
  --summary              print the final heap instead of opening the inspector
  --verbose              log allocator activity to stderr

Examples:
  guestheap demos/basic.heap
  guestheap demos/exhaustion.heap --pages 1 --max-pages 1 --summary";

/// Errors from argument parsing and validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no script file provided")]
    MissingScript,

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("unknown flag '{0}'")]
    UnknownFlag(String),

    #[error("flag '{0}' expects a value")]
    MissingValue(String),

    #[error("invalid number '{value}' for '{flag}'")]
    InvalidNumber { flag: String, value: String },

    #[error("page size must be greater than zero")]
    ZeroPageSize,

    #[error("initial pages ({initial}) exceed the page ceiling ({max})")]
    TooManyInitialPages { initial: u32, max: u32 },

    #[error("memory of {pages} pages of {page_size} bytes does not fit a 32-bit address space")]
    AddressSpace { pages: u32, page_size: u32 },

    #[error("heap base {0:#x} is not a multiple of 8")]
    MisalignedHeapBase(u32),

    #[error("heap base must be non-zero; address 0 is the guest's null")]
    NullHeapBase,

    #[error("heap base {heap_base:#x} lies beyond the initial memory ({size} bytes)")]
    HeapBaseOutOfRange { heap_base: u32, size: u64 },
}

/// Everything the binary needs to run one replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub script_path: PathBuf,
    pub region: RegionConfig,
    pub snapshot_limit: usize,
    /// Print the final heap and exit instead of opening the TUI
    pub summary: bool,
    pub verbose: bool,
}

impl Options {
    /// Parse arguments, excluding the program name
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut script_path = None;
        let mut region = RegionConfig::default();
        let mut snapshot_limit = DEFAULT_SNAPSHOT_LIMIT;
        let mut summary = false;
        let mut verbose = false;

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary" => summary = true,
                "--verbose" | "-v" => verbose = true,
                "--heap-base" | "--page-size" | "--pages" | "--max-pages" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    let number = parse_u32(&arg, &value)?;
                    match arg.as_str() {
                        "--heap-base" => region.heap_base = number,
                        "--page-size" => region.page_size = number,
                        "--pages" => region.initial_pages = number,
                        _ => region.max_pages = number,
                    }
                }
                "--snapshot-limit" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                    let number = parse_number(&value).ok_or_else(|| invalid(&arg, &value))?;
                    snapshot_limit =
                        usize::try_from(number).map_err(|_| invalid(&arg, &value))?;
                }
                flag if flag.starts_with('-') => {
                    return Err(ConfigError::UnknownFlag(arg));
                }
                _ => {
                    if script_path.is_some() {
                        return Err(ConfigError::UnexpectedArgument(arg));
                    }
                    script_path = Some(PathBuf::from(arg));
                }
            }
        }

        let script_path = script_path.ok_or(ConfigError::MissingScript)?;
        validate_region(&region)?;

        Ok(Options {
            script_path,
            region,
            snapshot_limit,
            summary,
            verbose,
        })
    }
}

/// Check that `config` describes a memory the guest heap can be bound to
pub fn validate_region(config: &RegionConfig) -> Result<(), ConfigError> {
    if config.page_size == 0 {
        return Err(ConfigError::ZeroPageSize);
    }
    if config.initial_pages > config.max_pages {
        return Err(ConfigError::TooManyInitialPages {
            initial: config.initial_pages,
            max: config.max_pages,
        });
    }
    let initial_size = config.page_size as u64 * config.initial_pages as u64;
    if initial_size > u32::MAX as u64 {
        return Err(ConfigError::AddressSpace {
            pages: config.initial_pages,
            page_size: config.page_size,
        });
    }
    if config.heap_base == NULL {
        return Err(ConfigError::NullHeapBase);
    }
    if config.heap_base % ALIGNMENT != 0 {
        return Err(ConfigError::MisalignedHeapBase(config.heap_base));
    }
    if config.heap_base as u64 > initial_size {
        return Err(ConfigError::HeapBaseOutOfRange {
            heap_base: config.heap_base,
            size: initial_size,
        });
    }
    Ok(())
}

/// Parse a decimal or `0x` hex number
pub fn parse_number(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        cleaned.parse().ok()
    }
}

fn parse_u32(flag: &str, value: &str) -> Result<u32, ConfigError> {
    parse_number(value)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid(flag, value))
}

fn invalid(flag: &str, value: &str) -> ConfigError {
    ConfigError::InvalidNumber {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::parse(["trace.heap"]).unwrap();
        assert_eq!(options.script_path, PathBuf::from("trace.heap"));
        assert_eq!(options.region, RegionConfig::default());
        assert_eq!(options.snapshot_limit, DEFAULT_SNAPSHOT_LIMIT);
        assert!(!options.summary);
        assert!(!options.verbose);
    }

    #[test]
    fn test_all_flags() {
        let options = Options::parse([
            "--heap-base",
            "0x40",
            "--page-size",
            "256",
            "--pages",
            "2",
            "--max-pages",
            "4",
            "--snapshot-limit",
            "1_000_000",
            "--summary",
            "--verbose",
            "trace.heap",
        ])
        .unwrap();

        assert_eq!(
            options.region,
            RegionConfig {
                page_size: 256,
                initial_pages: 2,
                max_pages: 4,
                heap_base: 64,
            }
        );
        assert_eq!(options.snapshot_limit, 1_000_000);
        assert!(options.summary);
        assert!(options.verbose);
    }

    #[test]
    fn test_missing_script() {
        assert_eq!(
            Options::parse(["--summary"]),
            Err(ConfigError::MissingScript)
        );
    }

    #[test]
    fn test_flag_errors() {
        assert_eq!(
            Options::parse(["a.heap", "--frobnicate"]),
            Err(ConfigError::UnknownFlag("--frobnicate".to_string()))
        );
        assert_eq!(
            Options::parse(["a.heap", "--pages"]),
            Err(ConfigError::MissingValue("--pages".to_string()))
        );
        assert_eq!(
            Options::parse(["a.heap", "--pages", "lots"]),
            Err(ConfigError::InvalidNumber {
                flag: "--pages".to_string(),
                value: "lots".to_string(),
            })
        );
        assert_eq!(
            Options::parse(["a.heap", "b.heap"]),
            Err(ConfigError::UnexpectedArgument("b.heap".to_string()))
        );
    }

    #[test]
    fn test_region_validation() {
        assert_eq!(
            Options::parse(["a.heap", "--heap-base", "12"]),
            Err(ConfigError::MisalignedHeapBase(12))
        );
        assert_eq!(
            Options::parse(["a.heap", "--heap-base", "0"]),
            Err(ConfigError::NullHeapBase)
        );
        assert_eq!(
            Options::parse(["a.heap", "--page-size", "0"]),
            Err(ConfigError::ZeroPageSize)
        );
        assert_eq!(
            Options::parse(["a.heap", "--pages", "5", "--max-pages", "4"]),
            Err(ConfigError::TooManyInitialPages { initial: 5, max: 4 })
        );
        assert_eq!(
            Options::parse(["a.heap", "--page-size", "64", "--heap-base", "128"]),
            Err(ConfigError::HeapBaseOutOfRange {
                heap_base: 128,
                size: 64
            })
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("0x2A"), Some(42));
        assert_eq!(parse_number("64_000"), Some(64_000));
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number(""), None);
    }
}
