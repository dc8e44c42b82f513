//! The tools module provides the building blocks of pzip that do not involve threads.
//!
//! The tools are:
//! - cli: Command line and environment options.
//! - rle: The run-length codec, its carry state, and the serial reference compressor.
//! - splitter: Chooses chunk boundaries that never fall inside a run of identical bytes.
//!
pub mod cli;
pub mod rle;
pub mod splitter;
