//! Record: the fixed 5 byte unit of the compressed stream.
//!
//! Bytes 0-3 hold the run length as a little-endian u32, byte 4 holds the literal. The layout is
//! written out by hand so it never depends on in-memory struct layout.

/// Size of one packed record.
pub const RECORD_LEN: usize = 5;
/// Longest run a single record can describe.
pub const MAX_RUN: u64 = u32::MAX as u64;

/// One (count, byte) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub count: u32,
    pub byte: u8,
}

impl Record {
    pub fn new(count: u32, byte: u8) -> Self {
        Self { count, byte }
    }

    /// Serialize to the wire layout.
    pub fn pack(&self) -> [u8; RECORD_LEN] {
        let c = self.count.to_le_bytes();
        [c[0], c[1], c[2], c[3], self.byte]
    }

    /// Deserialize from the wire layout.
    pub fn unpack(bytes: &[u8; RECORD_LEN]) -> Self {
        Self {
            count: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            byte: bytes[4],
        }
    }
}

/// Local output buffer for one chunk. Runs pushed here are merged with the previous record when
/// they share its byte, and runs longer than u32::MAX are split into maximal records.
#[derive(Debug, Default, Clone)]
pub struct RecordBuffer {
    output: Vec<u8>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self { output: Vec::new() }
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            output: Vec::with_capacity(bytes),
        }
    }

    /// Append a run of `count` copies of `byte`. Zero length runs are ignored.
    pub fn push_run(&mut self, byte: u8, mut count: u64) {
        if count == 0 {
            return;
        }
        // Top up the previous record first if it holds the same byte and has room
        if let Some(last) = self.last() {
            if last.byte == byte && (last.count as u64) < MAX_RUN {
                let take = (MAX_RUN - last.count as u64).min(count);
                self.set_last_count(last.count + take as u32);
                count -= take;
            }
        }
        // Whatever is left goes out as fresh records, each at most MAX_RUN long
        while count > 0 {
            let n = count.min(MAX_RUN);
            self.output
                .extend_from_slice(&Record::new(n as u32, byte).pack());
            count -= n;
        }
    }

    /// The most recently written record, if any.
    pub fn last(&self) -> Option<Record> {
        let start = self.output.len().checked_sub(RECORD_LEN)?;
        let tail: &[u8; RECORD_LEN] = self.output[start..].try_into().ok()?;
        Some(Record::unpack(tail))
    }

    /// Overwrite the count of the last record in place.
    fn set_last_count(&mut self, count: u32) {
        let start = self.output.len() - RECORD_LEN;
        self.output[start..start + 4].copy_from_slice(&count.to_le_bytes());
    }

    /// Number of packed bytes held.
    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Number of records held.
    pub fn record_count(&self) -> usize {
        self.output.len() / RECORD_LEN
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.output
    }

    /// Empty the buffer but keep its allocation for the next chunk.
    pub fn clear(&mut self) {
        self.output.clear();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.output
    }

    /// Decoded view of every record held.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.output.chunks_exact(RECORD_LEN).map(|r| {
            let r: &[u8; RECORD_LEN] = r.try_into().unwrap_or(&[0; RECORD_LEN]);
            Record::unpack(r)
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Record, RecordBuffer, MAX_RUN};

    #[test]
    fn pack_layout_test() {
        assert_eq!(Record::new(3, b'a').pack(), [3, 0, 0, 0, 0x61]);
        assert_eq!(
            Record::new(0x0102_0304, 0xff).pack(),
            [0x04, 0x03, 0x02, 0x01, 0xff]
        );
        assert_eq!(
            Record::unpack(&[0x04, 0x03, 0x02, 0x01, b'z']),
            Record::new(0x0102_0304, b'z')
        );
    }

    #[test]
    fn merge_same_byte_test() {
        let mut buf = RecordBuffer::new();
        buf.push_run(b'a', 3);
        buf.push_run(b'a', 2);
        buf.push_run(b'b', 1);
        assert_eq!(
            buf.records().collect::<Vec<_>>(),
            vec![Record::new(5, b'a'), Record::new(1, b'b')]
        );
    }

    #[test]
    fn zero_run_ignored_test() {
        let mut buf = RecordBuffer::new();
        buf.push_run(b'a', 0);
        assert!(buf.is_empty());
        assert_eq!(buf.last(), None);
    }

    #[test]
    fn cap_split_test() {
        // A run of exactly 2^32 must become two records, not one wrapped count
        let mut buf = RecordBuffer::new();
        buf.push_run(b'x', 1 << 32);
        assert_eq!(
            buf.records().collect::<Vec<_>>(),
            vec![Record::new(u32::MAX, b'x'), Record::new(1, b'x')]
        );
    }

    #[test]
    fn merge_tops_up_to_cap_test() {
        let mut buf = RecordBuffer::new();
        buf.push_run(b'x', MAX_RUN - 1);
        buf.push_run(b'x', 3);
        assert_eq!(
            buf.records().collect::<Vec<_>>(),
            vec![Record::new(u32::MAX, b'x'), Record::new(2, b'x')]
        );
        assert_eq!(buf.record_count(), 2);
    }
}
