use std::fs::File;
use std::io::{BufReader, Write};

use log::info;

use crate::error::{PzipError, Result};
use crate::tools::cli::PzOpts;
use crate::tools::rle::decode_to;

/// Expand each compressed file in `opts.files`, in order, into `sink`. Single threaded: the
/// format is a flat list of records, so this is a straight linear read.
pub fn decompress<W: Write>(opts: &PzOpts, sink: &mut W) -> Result<u64> {
    let mut total = 0;
    for path in &opts.files {
        let f_in = File::open(path).map_err(|e| PzipError::open(path, e))?;
        let written = decode_to(BufReader::new(f_in), sink)?;
        info!("Expanded {} to {} bytes", path.display(), written);
        total += written;
    }
    sink.flush()?;
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::decompress;
    use crate::error::PzipError;
    use crate::tools::cli::PzOpts;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_with(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn decompress_files_test() {
        let a = temp_with(&[3, 0, 0, 0, b'a', 1, 0, 0, 0, b'\n']);
        let b = temp_with(&[2, 0, 0, 0, b'z']);
        let opts = PzOpts {
            files: vec![a.path().to_path_buf(), b.path().to_path_buf()],
            ..PzOpts::new()
        };
        let mut out = Vec::new();
        assert_eq!(decompress(&opts, &mut out).unwrap(), 6);
        assert_eq!(out, b"aaa\nzz");
    }

    #[test]
    fn truncated_file_test() {
        let a = temp_with(&[3, 0, 0, 0, b'a', 9]);
        let opts = PzOpts {
            files: vec![a.path().to_path_buf()],
            ..PzOpts::new()
        };
        let mut out = Vec::new();
        assert!(matches!(
            decompress(&opts, &mut out),
            Err(PzipError::TruncatedRecord { offset: 5, len: 1 })
        ));
    }
}
