//! Reverse block reader
//!
//! Reads the last lines of a file without scanning it from the front:
//! seek to the end, read fixed-size blocks backwards and count newlines,
//! stopping once enough lines are covered or the start of the file is
//! reached.

use std::io::{self, Read, Seek, SeekFrom};

/// Default block size for backward reads
pub const DEFAULT_BLOCK_SIZE: u64 = 1024;

/// Backward block reader over any seekable source
pub struct ReverseBlockReader<R> {
    inner: R,
    block_size: u64,
}

impl<R: Read + Seek> ReverseBlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_block_size(inner, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(inner: R, block_size: u64) -> Self {
        Self {
            inner,
            block_size: block_size.max(1),
        }
    }

    /// Return up to `n` final lines, oldest first, without line terminators
    ///
    /// When the reader stops before the start of the file, the first
    /// captured line may be cut in half and is discarded.
    pub fn last_lines(&mut self, n: usize) -> io::Result<Vec<Vec<u8>>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let end = self.inner.seek(SeekFrom::End(0))?;
        let mut pos = end;
        let mut blocks: Vec<Vec<u8>> = Vec::new();
        let mut newlines = 0usize;

        // n lines need n terminators plus the one ending the line before them
        while pos > 0 && newlines <= n {
            let read_size = self.block_size.min(pos);
            pos -= read_size;

            self.inner.seek(SeekFrom::Start(pos))?;
            let mut block = vec![0u8; read_size as usize];
            self.inner.read_exact(&mut block)?;

            newlines += block.iter().filter(|&&b| b == b'\n').count();
            blocks.push(block);
        }

        let data: Vec<u8> = blocks.into_iter().rev().flatten().collect();
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let body = data.strip_suffix(b"\n").unwrap_or(&data);
        let mut lines: Vec<&[u8]> = body.split(|&b| b == b'\n').collect();

        if pos > 0 && !lines.is_empty() {
            lines.remove(0);
        }

        let skip = lines.len().saturating_sub(n);
        Ok(lines
            .into_iter()
            .skip(skip)
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l).to_vec())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines_of(text: &str, n: usize, block: u64) -> Vec<String> {
        let mut reader = ReverseBlockReader::with_block_size(Cursor::new(text.as_bytes()), block);
        reader
            .last_lines(n)
            .unwrap()
            .into_iter()
            .map(|l| String::from_utf8(l).unwrap())
            .collect()
    }

    #[test]
    fn test_last_lines_small_blocks() {
        let text = "one\ntwo\nthree\nfour\nfive\n";
        assert_eq!(lines_of(text, 2, 3), vec!["four", "five"]);
        assert_eq!(lines_of(text, 3, 4), vec!["three", "four", "five"]);
    }

    #[test]
    fn test_whole_file_shorter_than_request() {
        let text = "one\ntwo\n";
        assert_eq!(lines_of(text, 10, 1024), vec!["one", "two"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        let text = "one\ntwo\nthree";
        assert_eq!(lines_of(text, 2, 2), vec!["two", "three"]);
    }

    #[test]
    fn test_partial_first_line_discarded() {
        // one 8-byte block starts mid-way through "alpha-long"
        let text = "alpha-long\nbeta\n";
        assert_eq!(lines_of(text, 1, 8), vec!["beta"]);
        assert_eq!(lines_of(text, 2, 8), vec!["alpha-long", "beta"]);
    }

    #[test]
    fn test_crlf_and_empty() {
        assert_eq!(lines_of("a\r\nb\r\n", 1, 1024), vec!["b"]);
        assert!(lines_of("", 3, 1024).is_empty());
        assert!(lines_of("abc\n", 0, 1024).is_empty());
    }
}
