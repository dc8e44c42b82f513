//! InputRegion: a read-only memory map of one input file.
//!
//! The dispatcher owns the region for as long as it is handing out chunks of that file. Task
//! slots hold `ChunkRange`s, which keep the map alive through a shared handle but never write
//! to it. The map is released when the dispatcher and the last slot have let go.
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use memmap2::{Mmap, MmapOptions};

use crate::error::{PzipError, Result};

#[derive(Debug)]
pub struct InputRegion {
    /// None for an empty file, which cannot be mapped.
    mmap: Option<Mmap>,
    path: PathBuf,
}

impl InputRegion {
    /// Open and map `path` read-only. Open, stat and map failures carry the filename.
    pub fn map(path: &Path) -> Result<Arc<Self>> {
        let file = File::open(path).map_err(|e| PzipError::open(path, e))?;
        let len = file.metadata().map_err(|e| PzipError::open(path, e))?.len();
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the map is only ever read, and the input is not expected to change while
            // it is being compressed.
            Some(unsafe { MmapOptions::new().map(&file) }.map_err(|e| PzipError::open(path, e))?)
        };
        debug!("Mapped {} ({} bytes)", path.display(), len);
        Ok(Arc::new(Self {
            mmap,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(m) => &m[..],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A borrowed sub-range of a mapped region, handed to a task slot.
#[derive(Debug, Clone)]
pub struct ChunkRange {
    region: Arc<InputRegion>,
    range: Range<usize>,
}

impl ChunkRange {
    /// Returns None if the range does not lie within the region.
    pub fn new(region: &Arc<InputRegion>, range: Range<usize>) -> Option<Self> {
        if range.start > range.end || range.end > region.len() {
            return None;
        }
        Some(Self {
            region: Arc::clone(region),
            range,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.region.bytes()[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{ChunkRange, InputRegion};
    use crate::error::PzipError;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    #[test]
    fn map_and_slice_test() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello memory map").unwrap();
        file.flush().unwrap();

        let region = InputRegion::map(file.path()).unwrap();
        assert_eq!(region.path(), file.path());
        assert_eq!(region.len(), 16);
        let chunk = ChunkRange::new(&region, 6..12).unwrap();
        assert_eq!(chunk.bytes(), b"memory");
        assert_eq!(chunk.len(), 6);
        assert!(ChunkRange::new(&region, 10..17).is_none());
        #[allow(clippy::reversed_empty_ranges)]
        let backwards = 5..4;
        assert!(ChunkRange::new(&region, backwards).is_none());
    }

    #[test]
    fn chunk_outlives_dispatcher_handle_test() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();
        let chunk = {
            let region = InputRegion::map(file.path()).unwrap();
            ChunkRange::new(&region, 1..3).unwrap()
        };
        assert_eq!(chunk.bytes(), b"bc");
    }

    #[test]
    fn empty_file_test() {
        let file = NamedTempFile::new().unwrap();
        let region = InputRegion::map(file.path()).unwrap();
        assert!(region.is_empty());
        assert_eq!(region.bytes(), b"");
        assert!(ChunkRange::new(&region, 0..0).unwrap().is_empty());
        assert_eq!(Arc::strong_count(&region), 1);
    }

    #[test]
    fn missing_file_test() {
        let missing = Path::new("/definitely/not/here.txt");
        match InputRegion::map(missing) {
            Err(PzipError::Open { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected open error, got {:?}", other),
        }
    }
}
