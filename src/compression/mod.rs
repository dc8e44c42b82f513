//! The compression module holds the concurrent side of pzip.
//!
//! Compression happens in the following steps:
//! - Each input file is memory mapped (region).
//! - The dispatcher cuts the map into chunks that never split a run, numbers them, and hands
//!   them to idle task slots (compress, task).
//! - Each slot's worker run-length encodes its chunk into a local buffer, then waits for the
//!   write head to reach its number before appending the buffer to the output (sequencer).
//! - The final chunk of a file keeps its trailing run back so the next file can continue it.
//!
//! Worker threads are started once and reused for every chunk of every file (pool).
//!
//! Decompression is single threaded. It reads records and writes each byte `count` times.
//!
pub mod compress;
pub mod decompress;
pub mod pool;
pub mod region;
pub mod sequencer;
pub mod task;
