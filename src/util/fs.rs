//! Sparse-file random access (spec §4.H step 3a, §4.K step 3). Unix-only:
//! uses `pread`/`pwrite` so readers and writers never need a mutable
//! reference to the file, letting slice/chunk workers share one handle.

use std::fs::File;
use std::os::unix::fs::FileExt;

use bytes::Bytes;

use crate::error::{Pan123Error, Result};

/// Read exactly `size` bytes at `offset` from `file` without needing `&mut`.
pub fn read_at(file: &File, offset: u64, size: u64) -> Result<Bytes> {
    let mut buffer = vec![0u8; size as usize];
    file.read_at(&mut buffer, offset).map_err(Pan123Error::Io)?;
    Ok(Bytes::from(buffer))
}

/// Write `data` at `offset` into `file`, used by the parallel downloader to
/// land chunks from concurrent workers into disjoint byte ranges.
pub fn write_at(file: &File, offset: u64, data: &[u8]) -> Result<()> {
    file.write_all_at(data, offset).map_err(Pan123Error::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_at_returns_requested_range() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        let slice = read_at(tmp.as_file(), 3, 4).unwrap();
        assert_eq!(&slice[..], b"3456");
    }

    #[test]
    fn write_at_lands_at_the_right_offset() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.as_file().set_len(10).unwrap();
        write_at(tmp.as_file(), 5, b"XYZ").unwrap();
        let contents = std::fs::read(tmp.path()).unwrap();
        assert_eq!(&contents[5..8], b"XYZ");
    }
}
