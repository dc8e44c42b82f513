//! pzip: a parallel run-length compressor.
//!
//! Splits one or more input files into chunks, compresses the chunks concurrently on a fixed
//! pool of worker slots, and writes the compressed chunks to a single output stream in input
//! order. Chunk boundaries never fall inside a run, and a run that crosses from one file into
//! the next is carried over, so the output is identical to compressing the concatenated input
//! on one thread.
//!
//! Basic usage to compress files is as follows:
//!
//! `$> NTHREADS=4 pzip a.txt b.txt > out.z`
//!
//! and to expand them again:
//!
//! `$> pzip -d out.z > ab.txt`
//!
pub mod bitstream;
pub mod compression;
pub mod error;
pub mod tools;

pub use compression::compress::{compress, RunStats};
pub use compression::decompress::decompress;
pub use error::{PzipError, Result};
pub use tools::cli::PzOpts;
