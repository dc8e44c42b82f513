//! The bitstream module forms the I/O subsystem for pzip.
//!
//! The compressed format is deliberately flat: a sequence of 5 byte records, each holding a
//! little-endian u32 run length followed by the repeated byte. There is no header, footer or
//! record count. The stream simply ends when the input ends.
//!
//! - record: Packing and unpacking of single records, plus the per-chunk output buffer that
//!   merges adjacent records of the same byte before a chunk is handed to the write head.
//! - record_reader: Streaming reader used by the decompressor.
//!
pub mod record;
pub mod record_reader;
