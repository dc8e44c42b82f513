use std::io::{Read, Write};

use crate::bitstream::record::RecordBuffer;
use crate::bitstream::record_reader::RecordReader;
use crate::error::Result;

/// Size of the fill buffer used when expanding long runs.
const EXPAND_BLOCK: usize = 64 * 1024;

/// Carry state of the run-length coder: the byte of the run in progress and how long it is.
/// A state with a zero count is empty and never produces a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    pub last_byte: Option<u8>,
    pub run_count: u64,
}

impl RunState {
    pub fn new(byte: u8, count: u64) -> Self {
        Self {
            last_byte: Some(byte),
            run_count: count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.run_count == 0
    }

    /// Emit the run in progress (if any) and reset to empty.
    pub fn flush(&mut self, out: &mut RecordBuffer) {
        if let Some(byte) = self.last_byte {
            out.push_run(byte, self.run_count);
        }
        *self = Self::default();
    }
}

/// Run-length encode `range`, continuing the run described by `carry`.
///
/// Every completed run is appended to `out`. When `flush_tail` is set the trailing run is
/// flushed as well and the returned state is empty; otherwise the trailing run is handed back
/// so the next range can extend it.
pub fn encode(range: &[u8], mut carry: RunState, out: &mut RecordBuffer, flush_tail: bool) -> RunState {
    let mut idx = 0;
    while idx < range.len() {
        let byte = range[idx];
        // Measure the whole run in one pass rather than a byte at a time
        let run = range[idx..]
            .iter()
            .position(|&x| x != byte)
            .unwrap_or(range.len() - idx);
        if carry.last_byte == Some(byte) {
            carry.run_count += run as u64;
        } else {
            carry.flush(out);
            carry = RunState::new(byte, run as u64);
        }
        idx += run;
    }
    if flush_tail {
        carry.flush(out);
    }
    carry
}

/// Single threaded compressor over a whole buffer. Output is identical to the parallel path.
pub fn compress_serial(data: &[u8]) -> Vec<u8> {
    let mut out = RecordBuffer::with_capacity(data.len().min(1 << 20));
    encode(data, RunState::default(), &mut out, true);
    out.into_bytes()
}

/// Expand a compressed stream from `source` into `sink`. Returns the number of bytes written.
pub fn decode_to<R: Read, W: Write>(source: R, sink: &mut W) -> Result<u64> {
    let mut fill = [0_u8; EXPAND_BLOCK];
    let mut written = 0_u64;
    for record in RecordReader::new(source) {
        let record = record?;
        let mut left = record.count as usize;
        fill[..left.min(EXPAND_BLOCK)].fill(record.byte);
        while left > 0 {
            let n = left.min(EXPAND_BLOCK);
            sink.write_all(&fill[..n])?;
            left -= n;
        }
        written += record.count as u64;
    }
    Ok(written)
}

/// Expand an in-memory compressed buffer.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    decode_to(data, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{compress_serial, decode, encode, RunState};
    use crate::bitstream::record::{Record, RecordBuffer};

    #[test]
    fn scenario_aaabbbbbc_test() {
        let out = compress_serial(b"aaabbbbbc");
        assert_eq!(
            out,
            vec![3, 0, 0, 0, 0x61, 5, 0, 0, 0, 0x62, 1, 0, 0, 0, 0x63]
        );
    }

    #[test]
    fn empty_input_test() {
        assert!(compress_serial(b"").is_empty());
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn round_trip_test() {
        let samples: [&[u8]; 5] = [
            b"a",
            b"abcabcabc",
            b"\n\n\n\nxyz\0\0\0\0\0zz",
            &[0xff; 70_000],
            b"The quick brown fox jumps over the lazzzzy dog...",
        ];
        for sample in samples {
            assert_eq!(decode(&compress_serial(sample)).unwrap(), sample);
        }
    }

    #[test]
    fn carry_extends_run_test() {
        let mut out = RecordBuffer::new();
        let carry = encode(b"aab", RunState::default(), &mut out, false);
        assert_eq!(carry, RunState::new(b'b', 1));
        let carry = encode(b"bbc", carry, &mut out, true);
        assert!(carry.is_empty());
        assert_eq!(
            out.records().collect::<Vec<_>>(),
            vec![
                Record::new(2, b'a'),
                Record::new(3, b'b'),
                Record::new(1, b'c')
            ]
        );
    }

    #[test]
    fn carry_flushed_on_new_byte_test() {
        let mut out = RecordBuffer::new();
        encode(b"zz", RunState::new(b'y', 4), &mut out, true);
        assert_eq!(
            out.records().collect::<Vec<_>>(),
            vec![Record::new(4, b'y'), Record::new(2, b'z')]
        );
    }

    #[test]
    fn carry_past_cap_test() {
        // Continuing a carried run of u32::MAX by one byte reaches 2^32 exactly
        let mut out = RecordBuffer::new();
        encode(b"q", RunState::new(b'q', u32::MAX as u64), &mut out, true);
        assert_eq!(
            out.records().collect::<Vec<_>>(),
            vec![Record::new(u32::MAX, b'q'), Record::new(1, b'q')]
        );
    }

    #[test]
    fn empty_state_not_flushed_test() {
        let mut out = RecordBuffer::new();
        let mut state = RunState {
            last_byte: Some(b'a'),
            run_count: 0,
        };
        state.flush(&mut out);
        assert!(out.is_empty());
        assert_eq!(state, RunState::default());
    }
}
