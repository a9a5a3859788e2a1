//! Trace record sources. A [`TraceSource`] is anything that yields
//! [`TraceRecord`]s; two concrete readers are provided for the two formats
//! `original_source/main.cpp` and `main_threaded.cpp` consume.
//!
//! The binary format is `original_source`'s own: a one-byte `'R'`/`'W'` tag
//! followed by an 8-byte little-endian address, address `0` meaning "no
//! address, skip" (`main.cpp`'s `if(address != 0) sys.memAccess(...)`).
//! The text format isn't in `original_source` at all — Pin's `pinatrace`
//! tool emits `<ip>: <R|W> <addr>` lines, and supporting it directly
//! (instead of requiring an out-of-band conversion to the binary format)
//! is this crate's own addition.

use crate::coherence::AccessKind;
use crate::error::CacheSimError;
use std::io::{BufRead, Read};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    pub access: AccessKind,
    pub address: u64,
    pub tid: u32,
}

/// Anything that can drive an [`crate::engine::AccessEngine`].
pub trait TraceSource: Iterator<Item = Result<TraceRecord, CacheSimError>> {}
impl<T: Iterator<Item = Result<TraceRecord, CacheSimError>>> TraceSource for T {}

/// Reads `original_source`'s binary pinatrace format: repeating
/// `{rw: u8, address: u64 LE}` records. All records are attributed to
/// `tid` — the format carries no thread id of its own.
pub struct BinaryTraceReader<R> {
    inner: R,
    tid: u32,
}

impl<R: Read> BinaryTraceReader<R> {
    pub fn new(inner: R, tid: u32) -> Self {
        BinaryTraceReader { inner, tid }
    }
}

impl<R: Read> Iterator for BinaryTraceReader<R> {
    type Item = Result<TraceRecord, CacheSimError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut rw = [0u8; 1];
            match self.inner.read_exact(&mut rw) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return None,
                Err(e) => return Some(Err(CacheSimError::TraceMalformed(e.to_string()))),
            }
            let access = match rw[0] {
                b'R' => AccessKind::Read,
                b'W' => AccessKind::Write,
                other => {
                    return Some(Err(CacheSimError::TraceMalformed(format!(
                        "unrecognized access tag {other:#x}"
                    ))))
                }
            };

            let mut addr_bytes = [0u8; 8];
            if let Err(e) = self.inner.read_exact(&mut addr_bytes) {
                return Some(Err(CacheSimError::TraceMalformed(format!(
                    "truncated address after tag: {e}"
                ))));
            }
            let address = u64::from_le_bytes(addr_bytes);
            if address == 0 {
                continue;
            }
            return Some(Ok(TraceRecord {
                access,
                address,
                tid: self.tid,
            }));
        }
    }
}

/// Reads Pin's `pinatrace` text format: lines shaped
/// `<instruction-pointer>: <R|W> <hex-address>`. Lines that don't parse,
/// and addresses of `0`, are skipped the same way the binary reader skips
/// a zero address.
pub struct TextTraceReader<R> {
    lines: std::io::Lines<R>,
    tid: u32,
}

impl<R: BufRead> TextTraceReader<R> {
    pub fn new(inner: R, tid: u32) -> Self {
        TextTraceReader {
            lines: inner.lines(),
            tid,
        }
    }
}

impl<R: BufRead> Iterator for TextTraceReader<R> {
    type Item = Result<TraceRecord, CacheSimError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(CacheSimError::TraceMalformed(e.to_string()))),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_pinatrace_line(line) {
                Ok(Some((access, address))) => {
                    return Some(Ok(TraceRecord {
                        access,
                        address,
                        tid: self.tid,
                    }))
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn parse_pinatrace_line(line: &str) -> Result<Option<(AccessKind, u64)>, CacheSimError> {
    let after_colon = line
        .split_once(':')
        .map(|(_, rest)| rest.trim())
        .unwrap_or(line);
    let mut fields = after_colon.split_whitespace();
    let tag = fields
        .next()
        .ok_or_else(|| CacheSimError::TraceMalformed(format!("empty record: {line:?}")))?;
    let access = match tag {
        "R" => AccessKind::Read,
        "W" => AccessKind::Write,
        other => {
            return Err(CacheSimError::TraceMalformed(format!(
                "unrecognized access tag {other:?} in {line:?}"
            )))
        }
    };
    let addr_field = fields
        .next()
        .ok_or_else(|| CacheSimError::TraceMalformed(format!("missing address in {line:?}")))?;
    let hex = addr_field.trim_start_matches("0x").trim_start_matches("0X");
    let address = u64::from_str_radix(hex, 16)
        .map_err(|e| CacheSimError::TraceMalformed(format!("bad address {addr_field:?}: {e}")))?;
    if address == 0 {
        return Ok(None);
    }
    Ok(Some((access, address)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn binary_reader_skips_zero_addresses() {
        let mut bytes = Vec::new();
        bytes.push(b'R');
        bytes.extend_from_slice(&0u64.to_le_bytes());
        bytes.push(b'W');
        bytes.extend_from_slice(&0x1000u64.to_le_bytes());
        let mut reader = BinaryTraceReader::new(Cursor::new(bytes), 0);
        let rec = reader.next().unwrap().unwrap();
        assert_eq!(rec.access, AccessKind::Write);
        assert_eq!(rec.address, 0x1000);
        assert!(reader.next().is_none());
    }

    #[test]
    fn binary_reader_rejects_bad_tag() {
        let mut bytes = vec![b'X'];
        bytes.extend_from_slice(&0x1000u64.to_le_bytes());
        let mut reader = BinaryTraceReader::new(Cursor::new(bytes), 0);
        assert!(reader.next().unwrap().is_err());
    }

    #[test]
    fn text_reader_parses_pinatrace_lines() {
        let text = "0x400abc: R 0x7fff0000\n0x400ac0: W 0x0\n0x400ac4: R 0x7fff0008\n";
        let mut reader = TextTraceReader::new(Cursor::new(text.as_bytes()), 3);
        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.access, AccessKind::Read);
        assert_eq!(first.address, 0x7fff0000);
        assert_eq!(first.tid, 3);
        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.address, 0x7fff0008);
        assert!(reader.next().is_none());
    }

    #[test]
    fn text_reader_errors_on_garbage() {
        let text = "not a trace line\n";
        let mut reader = TextTraceReader::new(Cursor::new(text.as_bytes()), 0);
        assert!(reader.next().unwrap().is_err());
    }
}
