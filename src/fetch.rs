use std::fs::File;
use std::io;
use std::path::Path;

use crate::index::LineIndex;

/// Random-access line reader over an indexed file.
///
/// All reads are positional, so a shared `LineFetcher` never carries cursor
/// state; concurrent viewport refreshes and filter rebuilds can read through
/// the same handle.
pub struct LineFetcher {
    file: File,
}

impl LineFetcher {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: File::open(path)?,
        })
    }

    /// Fetch raw line bytes for the given sorted line indices.
    ///
    /// A contiguous run of indices is served by a single positional read
    /// covering the whole byte range, then sliced per line; the per-line
    /// fallback only runs for scattered indices (jumps between matches).
    /// Returned bytes include the line terminator when the file has one.
    pub fn fetch(&self, index: &LineIndex, lines: &[usize]) -> io::Result<Vec<Vec<u8>>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let contiguous = lines.windows(2).all(|w| w[1] == w[0] + 1);
        if contiguous {
            return self.fetch_contiguous(index, lines);
        }

        let mut out = Vec::with_capacity(lines.len());
        for &line in lines {
            out.push(self.fetch_line(index, line)?);
        }
        Ok(out)
    }

    /// Fetch a single line by index.
    pub fn fetch_line(&self, index: &LineIndex, line: usize) -> io::Result<Vec<u8>> {
        let entry = index.get(line).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("line {line} beyond index ({} lines)", index.len()),
            )
        })?;
        let mut buf = vec![0u8; entry.length as usize];
        read_exact_at(&self.file, &mut buf, entry.offset)?;
        Ok(buf)
    }

    fn fetch_contiguous(&self, index: &LineIndex, lines: &[usize]) -> io::Result<Vec<Vec<u8>>> {
        let first = index.get(lines[0]).ok_or_else(out_of_range)?;
        let last = index.get(*lines.last().unwrap()).ok_or_else(out_of_range)?;

        let start = first.offset;
        let total = (last.offset + last.length as u64 - start) as usize;
        let mut buf = vec![0u8; total];
        read_exact_at(&self.file, &mut buf, start)?;

        let mut out = Vec::with_capacity(lines.len());
        let mut pos = 0usize;
        for &line in lines {
            let len = index.get(line).ok_or_else(out_of_range)?.length as usize;
            out.push(buf[pos..pos + len].to_vec());
            pos += len;
        }
        Ok(out)
    }
}

fn out_of_range() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "line index out of range")
}

/// Strip a trailing `\n` or `\r\n` from raw line bytes.
pub fn strip_line_terminator(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut read = 0;
    while read < buf.len() {
        let n = file.seek_read(&mut buf[read..], offset + read as u64)?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        read += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &[u8]) -> (NamedTempFile, LineIndex, LineFetcher) {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        let index = build_index(f.path()).unwrap();
        let fetcher = LineFetcher::open(f.path()).unwrap();
        (f, index, fetcher)
    }

    #[test]
    fn fetch_single_lines_byte_for_byte() {
        let (_f, index, fetcher) = fixture(b"alpha\nbeta\ngamma");
        assert_eq!(fetcher.fetch_line(&index, 0).unwrap(), b"alpha\n");
        assert_eq!(fetcher.fetch_line(&index, 1).unwrap(), b"beta\n");
        assert_eq!(fetcher.fetch_line(&index, 2).unwrap(), b"gamma");
    }

    #[test]
    fn fetch_contiguous_run_in_one_read() {
        let (_f, index, fetcher) = fixture(b"a\nbb\nccc\ndddd\n");
        let lines = fetcher.fetch(&index, &[1, 2, 3]).unwrap();
        assert_eq!(lines, vec![b"bb\n".to_vec(), b"ccc\n".to_vec(), b"dddd\n".to_vec()]);
    }

    #[test]
    fn fetch_scattered_indices() {
        let (_f, index, fetcher) = fixture(b"a\nbb\nccc\ndddd\neeeee\n");
        let lines = fetcher.fetch(&index, &[0, 2, 4]).unwrap();
        assert_eq!(lines, vec![b"a\n".to_vec(), b"ccc\n".to_vec(), b"eeeee\n".to_vec()]);
    }

    #[test]
    fn fetch_whole_file_matches_content() {
        let content = b"one\ntwo\nthree\nfour without newline";
        let (_f, index, fetcher) = fixture(content);
        let all: Vec<usize> = (0..index.len()).collect();
        let lines = fetcher.fetch(&index, &all).unwrap();
        let rejoined: Vec<u8> = lines.concat();
        assert_eq!(rejoined, content.to_vec());
    }

    #[test]
    fn out_of_range_is_error() {
        let (_f, index, fetcher) = fixture(b"only\n");
        assert!(fetcher.fetch_line(&index, 5).is_err());
    }

    #[test]
    fn empty_request_is_empty() {
        let (_f, index, fetcher) = fixture(b"x\n");
        assert!(fetcher.fetch(&index, &[]).unwrap().is_empty());
    }

    #[test]
    fn strip_terminator_variants() {
        assert_eq!(strip_line_terminator(b"abc\n"), b"abc");
        assert_eq!(strip_line_terminator(b"abc\r\n"), b"abc");
        assert_eq!(strip_line_terminator(b"abc"), b"abc");
        assert_eq!(strip_line_terminator(b"\n"), b"");
    }

    #[test]
    fn concurrent_reads_share_the_handle() {
        let content: Vec<u8> = (0..200)
            .flat_map(|i| format!("line {i}\n").into_bytes())
            .collect();
        let (_f, index, fetcher) = fixture(&content);
        let fetcher = std::sync::Arc::new(fetcher);
        let index = std::sync::Arc::new(index);

        let mut handles = Vec::new();
        for t in 0..4 {
            let fetcher = fetcher.clone();
            let index = index.clone();
            handles.push(std::thread::spawn(move || {
                for i in (t..200).step_by(4) {
                    let bytes = fetcher.fetch_line(&index, i).unwrap();
                    assert_eq!(bytes, format!("line {i}\n").into_bytes());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
