//! File reading: content sampling, binary detection, bounded line
//! streaming and the standalone single-file accessor.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::core::error::{Result, SgrepError};
use crate::core::ingest::change::FingerprintReader;

/// Default number of bytes inspected by content heuristics
pub const DEFAULT_SAMPLE_BYTES: usize = 8192;

/// Above this share of control bytes a sample is treated as binary
const CONTROL_BYTE_RATIO: f64 = 0.10;

/// Leading bytes of common binary formats
const MAGIC_NUMBERS: &[&[u8]] = &[
    b"\x89PNG",
    b"%PDF",
    b"PK\x03\x04",
    b"\x7fELF",
    b"GIF87a",
    b"GIF89a",
    b"\xff\xd8\xff",
];

/// Read at most `limit` bytes from the start of a file
pub fn read_sample(path: &Path, limit: usize) -> io::Result<Vec<u8>> {
    let mut sample = Vec::with_capacity(limit.min(64 * 1024));
    File::open(path)?
        .take(limit as u64)
        .read_to_end(&mut sample)?;
    Ok(sample)
}

/// Heuristic text/binary check on a content sample.
///
/// A sample is binary when it contains a NUL byte, starts with a known
/// binary signature, is not valid UTF-8 (a multi-byte sequence cut by
/// the end of the sample is allowed) or is dominated by control bytes.
pub fn is_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }

    if sample.contains(&0) {
        return true;
    }

    if MAGIC_NUMBERS.iter().any(|magic| sample.starts_with(magic)) {
        return true;
    }

    if let Err(e) = std::str::from_utf8(sample) {
        // error_len() is None only for a truncated trailing sequence
        if e.error_len().is_some() {
            return true;
        }
    }

    let control = sample
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c)) || b == 0x7f)
        .count();
    control as f64 / sample.len() as f64 > CONTROL_BYTE_RATIO
}

/// Lazy, finite sequence of lines with a hard cap.
///
/// Lines are yielded without their terminator; invalid UTF-8 is
/// replaced. After `max_lines` lines the iterator ends and, if input
/// remained, reports [`is_truncated`](Self::is_truncated). The reader is
/// dropped as soon as the sequence ends or fails.
pub struct BoundedLines<R = BufReader<File>> {
    reader: Option<R>,
    max_lines: usize,
    emitted: usize,
    truncated: bool,
    buf: Vec<u8>,
}

impl BoundedLines<BufReader<File>> {
    /// Open a file for bounded line reading
    pub fn open(path: &Path, max_lines: usize) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?), max_lines))
    }
}

impl<R: BufRead> BoundedLines<R> {
    pub fn new(reader: R, max_lines: usize) -> Self {
        Self {
            reader: Some(reader),
            max_lines,
            emitted: 0,
            truncated: false,
            buf: Vec::new(),
        }
    }

    /// Whether input remained past the line cap
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Lines yielded so far
    pub fn lines_read(&self) -> usize {
        self.emitted
    }

    /// Whether the underlying reader is still held
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

impl<R: BufRead> Iterator for BoundedLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;

        if self.emitted >= self.max_lines {
            self.truncated = matches!(reader.fill_buf(), Ok(rest) if !rest.is_empty());
            self.reader = None;
            return None;
        }

        self.buf.clear();
        match reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.reader = None;
                None
            }
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                self.emitted += 1;
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}

/// Content collected by a bounded read
#[derive(Debug, Clone)]
pub struct BoundedContent {
    pub content: String,
    pub line_count: usize,
    pub truncated: bool,
    /// Fingerprint of the whole file, including bytes past the line cap
    pub fingerprint: String,
}

/// Read a file line by line, keeping at most `max_lines` lines.
///
/// Lines past the cap are not kept but are still read, so the
/// fingerprint covers every raw byte of the file.
pub fn read_bounded(path: &Path, max_lines: usize) -> io::Result<BoundedContent> {
    let mut reader = BufReader::new(FingerprintReader::new(File::open(path)?));
    let mut content = String::new();

    let mut lines = BoundedLines::new(&mut reader, max_lines);
    for line in lines.by_ref() {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&line?);
    }
    let line_count = lines.lines_read();
    let truncated = lines.is_truncated();

    io::copy(&mut reader, &mut io::sink())?;

    Ok(BoundedContent {
        content,
        line_count,
        truncated,
        fingerprint: reader.into_inner().finish(),
    })
}

/// Text of an accepted file, read the way the classifier accepted it:
/// whole when `max_lines` is `None`, line-capped otherwise
pub fn read_content(path: &Path, max_lines: Option<usize>) -> io::Result<String> {
    match max_lines {
        Some(max_lines) => read_bounded(path, max_lines).map(|read| read.content),
        None => Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned()),
    }
}

/// Read one file as text without any pipeline filtering.
///
/// Rejects non-regular files, files above `max_file_size` bytes and
/// binary content.
pub fn read_file(path: &Path, max_file_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SgrepError::InvalidPath(format!("{}: {e}", path.display())),
        _ => SgrepError::IoError(e),
    })?;

    if !metadata.is_file() {
        return Err(SgrepError::UnsupportedContent(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    if metadata.len() > max_file_size {
        return Err(SgrepError::UnsupportedContent(format!(
            "{} is {} bytes, limit is {}",
            path.display(),
            metadata.len(),
            max_file_size
        )));
    }

    let bytes = fs::read(path)?;
    let sample = &bytes[..bytes.len().min(DEFAULT_SAMPLE_BYTES)];
    if is_binary(sample) {
        return Err(SgrepError::UnsupportedContent(format!(
            "{} is binary",
            path.display()
        )));
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
