use std::path::PathBuf;
use std::{fmt::Display, fmt::Formatter};

use clap::Parser;
use log::{debug, info};

use crate::compression::pool::PollPolicy;
use crate::error::{PzipError, Result};

/// Name of the environment variable holding the worker count.
pub const NTHREADS: &str = "NTHREADS";
/// Target chunk size in bytes before the splitter extends it to a run boundary.
pub const DEFAULT_CHUNK_SIZE: usize = 9000;
/// Printed when no input files are given.
pub const USAGE: &str = "pzip: file1 [file2 ...]";

/// Verbosity of user information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Errors,
    Warnings,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn level(self) -> log::LevelFilter {
        match self {
            Verbosity::Quiet => log::LevelFilter::Off,
            Verbosity::Errors => log::LevelFilter::Error,
            Verbosity::Warnings => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Zip or Unzip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Zip,
    Unzip,
}
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Command line interpretation - uses the clap crate.
#[derive(Parser, Debug)]
#[clap(
    name = "pzip",
    version,
    about = "Parallel run-length compressor",
    long_about = "
    Compresses the named files, in order, into one run-length encoded stream on standard output.
    Each record is a 4 byte little-endian run length followed by the repeated byte.
    Runs that cross from one file into the next are joined into a single record.

    The number of worker threads is taken from the NTHREADS environment variable (default 1)."
)]
pub struct Args {
    /// Files to process, in order
    #[clap()]
    files: Vec<PathBuf>,

    /// Expand compressed files instead of compressing
    #[clap(short = 'd', long = "decompress")]
    decompress: bool,

    /// Target chunk size in bytes handed to each worker
    #[clap(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Microseconds to sleep between polls while waiting (0 yields instead)
    #[clap(long = "poll-us", default_value_t = 0)]
    poll_us: u64,

    /// Be verbose (repeat for more)
    #[clap(short = 'v', long = "verbose", parse(from_occurrences))]
    verbose: u64,

    /// Suppress all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,
}

/// All user settable options that control program behavior
#[derive(Debug, Clone)]
pub struct PzOpts {
    /// Names of files to read for input, in processing order
    pub files: Vec<PathBuf>,
    /// Number of task slots, including the one the main thread runs
    pub threads: usize,
    /// Target chunk size in bytes
    pub chunk_size: usize,
    /// How waiting threads pass the time
    pub poll: PollPolicy,
    /// Compress/Decompress
    pub op_mode: Mode,
    /// Verbosity of user information
    pub verbose: Verbosity,
}

impl PzOpts {
    pub fn new() -> Self {
        Self {
            files: vec![],
            threads: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll: PollPolicy::Yield,
            op_mode: Mode::Zip,
            verbose: Verbosity::Errors,
        }
    }

    /// Combine parsed arguments with the raw NTHREADS value.
    pub fn from_args(args: Args, nthreads: Option<&str>) -> Result<Self> {
        if args.chunk_size == 0 {
            return Err(PzipError::Config(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        let verbose = if args.quiet {
            Verbosity::Quiet
        } else {
            match args.verbose {
                0 => Verbosity::Errors,
                1 => Verbosity::Warnings,
                2 => Verbosity::Info,
                3 => Verbosity::Debug,
                _ => Verbosity::Trace,
            }
        };
        Ok(Self {
            files: args.files,
            threads: parse_nthreads(nthreads)?,
            chunk_size: args.chunk_size,
            poll: PollPolicy::from_micros(args.poll_us),
            op_mode: if args.decompress {
                Mode::Unzip
            } else {
                Mode::Zip
            },
            verbose,
        })
    }
}

impl Default for PzOpts {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the NTHREADS value. Unset means one thread; anything other than a positive integer is
/// a configuration error.
pub fn parse_nthreads(raw: Option<&str>) -> Result<usize> {
    let raw = match raw {
        None => return Ok(1),
        Some(raw) => raw.trim(),
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => usize::try_from(n)
            .map_err(|_| PzipError::Config(format!("{} is too large: {}", NTHREADS, raw))),
        _ => Err(PzipError::Config(format!(
            "{} must be a positive integer, got '{}'",
            NTHREADS, raw
        ))),
    }
}

/// Read the command line and environment, set the log level and report what we will do.
pub fn pzopts_init() -> Result<PzOpts> {
    let args = Args::parse();
    let nthreads = std::env::var(NTHREADS).ok();
    let opts = PzOpts::from_args(args, nthreads.as_deref())?;

    // Set the log level
    log::set_max_level(opts.verbose.level());

    info!("---- pzip initialization start ----");
    info!("Verbosity set to {}", log::max_level());
    info!("Operational mode set to {}", opts.op_mode);
    info!("Using {} thread(s), chunk size {}", opts.threads, opts.chunk_size);
    debug!("Poll policy {:?}", opts.poll);
    for f in &opts.files {
        info!("Input file {}", f.display());
    }
    info!("---- pzip initialization end ----");
    Ok(opts)
}

#[cfg(test)]
mod test {
    use super::{parse_nthreads, Args, Mode, PzOpts, Verbosity};
    use crate::compression::pool::PollPolicy;
    use crate::error::PzipError;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn nthreads_default_test() {
        assert_eq!(parse_nthreads(None).unwrap(), 1);
        assert_eq!(parse_nthreads(Some("4")).unwrap(), 4);
        assert_eq!(parse_nthreads(Some(" 2 ")).unwrap(), 2);
    }

    #[test]
    fn nthreads_invalid_test() {
        for bad in ["0", "-3", "many", "", "1.5"] {
            assert!(
                matches!(parse_nthreads(Some(bad)), Err(PzipError::Config(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn args_test() {
        let args = Args::try_parse_from(["pzip", "-vv", "--chunk-size", "16", "a.txt", "b.txt"])
            .unwrap();
        let opts = PzOpts::from_args(args, Some("3")).unwrap();
        assert_eq!(opts.files.len(), 2);
        assert_eq!(opts.threads, 3);
        assert_eq!(opts.chunk_size, 16);
        assert_eq!(opts.op_mode, Mode::Zip);
        assert_eq!(opts.verbose, Verbosity::Info);
        assert_eq!(opts.poll, PollPolicy::Yield);
    }

    #[test]
    fn args_decompress_test() {
        let args = Args::try_parse_from(["pzip", "-d", "-q", "--poll-us", "50", "x.z"]).unwrap();
        let opts = PzOpts::from_args(args, None).unwrap();
        assert_eq!(opts.op_mode, Mode::Unzip);
        assert_eq!(opts.verbose, Verbosity::Quiet);
        assert_eq!(opts.poll, PollPolicy::Sleep(Duration::from_micros(50)));
    }

    #[test]
    fn zero_chunk_size_test() {
        let args = Args::try_parse_from(["pzip", "--chunk-size", "0", "a"]).unwrap();
        assert!(matches!(
            PzOpts::from_args(args, None),
            Err(PzipError::Config(_))
        ));
    }
}
