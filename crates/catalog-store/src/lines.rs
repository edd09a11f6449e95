//! Sequential line reading with byte-offset bookkeeping.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Position, StoreError, StoreResult};

/// One line of the backing file, newline stripped.
pub(crate) struct Line<'a> {
    path: &'a Path,
    /// 1-based line number.
    pub number: u64,
    /// Byte offset of the first byte of the line.
    pub offset: u64,
    pub bytes: &'a [u8],
}

impl Line<'_> {
    pub fn position(&self) -> Position {
        Position::Line {
            number: self.number,
            offset: self.offset,
        }
    }

    pub fn parse<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_slice(self.bytes).map_err(|source| StoreError::InvalidDataFormat {
            path: self.path.to_path_buf(),
            position: self.position(),
            source,
        })
    }
}

/// Reads a file front to back one line at a time.
///
/// The running offset advances by the exact number of bytes consumed, so for
/// a well-formed file it grows by `len(line) + 1` per line.
pub(crate) struct LineReader<'a> {
    path: &'a Path,
    reader: BufReader<File>,
    buf: Vec<u8>,
    number: u64,
    offset: u64,
    max_len: usize,
    unterminated: bool,
}

impl<'a> LineReader<'a> {
    /// Open `path` for reading. A missing file yields `None`.
    pub fn open(path: &'a Path, max_len: usize) -> StoreResult<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::new(),
            number: 0,
            offset: 0,
            max_len,
            unterminated: false,
        }))
    }

    /// Read the next line, or `None` at end of file.
    pub fn next_line(&mut self) -> StoreResult<Option<Line<'_>>> {
        self.buf.clear();
        // One extra byte leaves room for the newline of a maximal line.
        let limit = self.max_len as u64 + 1;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = self.buf.last() == Some(&b'\n');
        if !terminated && read as u64 == limit {
            return Err(StoreError::LineTooLong {
                path: self.path.to_path_buf(),
                position: Position::Line {
                    number: self.number + 1,
                    offset: self.offset,
                },
                limit: self.max_len,
            });
        }

        let start = self.offset;
        self.number += 1;
        self.offset += read as u64;
        self.unterminated = !terminated;

        let body = if terminated {
            &self.buf[..read - 1]
        } else {
            &self.buf[..]
        };
        Ok(Some(Line {
            path: self.path,
            number: self.number,
            offset: start,
            bytes: body,
        }))
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of lines read so far.
    pub fn lines_read(&self) -> u64 {
        self.number
    }

    /// Whether the last line read had no trailing newline.
    pub fn unterminated(&self) -> bool {
        self.unterminated
    }
}
