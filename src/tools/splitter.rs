use std::ops::Range;

/// Find the end of the chunk starting at `cursor`.
///
/// The proposed end is `cursor + target_size` (clamped to the region), then pushed right until
/// it sits on a change of byte value, so a run of identical bytes is never split between two
/// chunks. Always returns a value greater than `cursor` unless the cursor is already at the end.
pub fn next_chunk(region: &[u8], cursor: usize, target_size: usize) -> usize {
    let end = region.len();
    let mut chunk_end = cursor.saturating_add(target_size).min(end);
    // Walk through any run that straddles the proposed split
    while chunk_end + 1 < end && region[chunk_end] == region[chunk_end + 1] {
        chunk_end += 1;
    }
    // Step past the last byte of that run so the next chunk opens on a new value
    if chunk_end < end {
        chunk_end += 1;
    }
    chunk_end
}

/// Iterator over the chunk ranges of a region.
#[derive(Debug)]
pub struct Chunks<'a> {
    region: &'a [u8],
    cursor: usize,
    target_size: usize,
}

impl<'a> Chunks<'a> {
    pub fn new(region: &'a [u8], target_size: usize) -> Self {
        Self {
            region,
            cursor: 0,
            target_size,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.region.len()
    }
}

impl Iterator for Chunks<'_> {
    type Item = Range<usize>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }
        let start = self.cursor;
        self.cursor = next_chunk(self.region, start, self.target_size);
        Some(start..self.cursor)
    }
}
