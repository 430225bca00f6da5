use memchr::memchr_iter;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Read granularity for the indexing pass.
const CHUNK_SIZE: usize = 256 * 1024;

/// Assumed average line length when pre-sizing the offset table.
const BYTES_PER_LINE_ESTIMATE: u64 = 100;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One line's position in the underlying byte stream. `length` includes the
/// trailing newline when present; consumers strip it. Never mutated after
/// insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEntry {
    pub offset: u64,
    pub length: u32,
}

/// Dense, append-only offset table. The line index of a line is its position
/// in this sequence; entries are contiguous: each line starts where the
/// previous one ended.
#[derive(Debug, Default)]
pub struct LineIndex {
    entries: Vec<OffsetEntry>,
}

impl LineIndex {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, line: usize) -> Option<OffsetEntry> {
        self.entries.get(line).copied()
    }

    /// Total bytes covered by the index. Equals the file size after a full
    /// pass.
    pub fn total_bytes(&self) -> u64 {
        self.entries
            .last()
            .map(|e| e.offset + e.length as u64)
            .unwrap_or(0)
    }

    fn push(&mut self, offset: u64, length: u64) {
        self.entries.push(OffsetEntry {
            offset,
            length: length as u32,
        });
    }
}

/// Single streaming pass over a file: scan for `\n`, record one entry per
/// line, plus a final entry for an unterminated tail. No parsing happens
/// here; an empty file yields an empty, valid index. Binary content is
/// accepted as-is.
pub fn build_index(path: &Path) -> Result<LineIndex, IndexError> {
    let io_err = |source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;
    let file_size = file.metadata().map_err(io_err)?.len();
    let estimated = (file_size / BYTES_PER_LINE_ESTIMATE) as usize;
    let mut index = LineIndex::with_capacity(estimated);

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut chunk_base: u64 = 0;
    let mut line_start: u64 = 0;

    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        for i in memchr_iter(b'\n', &buf[..n]) {
            let newline_at = chunk_base + i as u64;
            index.push(line_start, newline_at - line_start + 1);
            line_start = newline_at + 1;
        }
        chunk_base += n as u64;
    }

    // Trailing bytes without a terminator form the last line.
    if line_start < chunk_base {
        index.push(line_start, chunk_base - line_start);
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    /// P1: lengths sum to the file size and entries are contiguous.
    fn assert_complete(index: &LineIndex, file_len: u64) {
        let total: u64 = index.entries.iter().map(|e| e.length as u64).sum();
        assert_eq!(total, file_len);
        if let Some(first) = index.entries.first() {
            assert_eq!(first.offset, 0);
        }
        for pair in index.entries.windows(2) {
            assert_eq!(pair[0].offset + pair[0].length as u64, pair[1].offset);
        }
    }

    #[test]
    fn empty_file_yields_empty_index() {
        let f = write_temp(b"");
        let index = build_index(f.path()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.total_bytes(), 0);
    }

    #[test]
    fn terminated_lines() {
        let f = write_temp(b"one\ntwo\nthree\n");
        let index = build_index(f.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(0), Some(OffsetEntry { offset: 0, length: 4 }));
        assert_eq!(index.get(1), Some(OffsetEntry { offset: 4, length: 4 }));
        assert_eq!(index.get(2), Some(OffsetEntry { offset: 8, length: 6 }));
        assert_complete(&index, 14);
    }

    #[test]
    fn unterminated_tail_is_a_line() {
        let f = write_temp(b"one\ntail");
        let index = build_index(f.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1), Some(OffsetEntry { offset: 4, length: 4 }));
        assert_complete(&index, 8);
    }

    #[test]
    fn single_line_no_newline() {
        let f = write_temp(b"just one line");
        let index = build_index(f.path()).unwrap();
        assert_eq!(index.len(), 1);
        assert_complete(&index, 13);
    }

    #[test]
    fn empty_lines_are_indexed() {
        let f = write_temp(b"\n\nx\n");
        let index = build_index(f.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(0).unwrap().length, 1);
        assert_eq!(index.get(1).unwrap().length, 1);
        assert_complete(&index, 4);
    }

    #[test]
    fn binary_content_accepted() {
        let f = write_temp(b"\x00\x01\x02\nnext\xff\xfe\n");
        let index = build_index(f.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_complete(&index, 11);
    }

    #[test]
    fn lines_straddling_chunk_boundaries() {
        // Enough data to cross several 256 KiB chunks.
        let mut content = Vec::new();
        for i in 0..40_000 {
            content.extend_from_slice(format!("log line number {i} with some padding\n").as_bytes());
        }
        let f = write_temp(&content);
        let index = build_index(f.path()).unwrap();
        assert_eq!(index.len(), 40_000);
        assert_complete(&index, content.len() as u64);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = build_index(Path::new("/nonexistent/panam.log")).unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }
}
