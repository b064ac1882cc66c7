//! Chunk Sources
//!
//! A `ChunkSource` is the body of one streamed response: a finite, lazily produced sequence
//! of byte chunks with a running count of what is left. The session pulls from it only while
//! the socket can take more, so a large body is never buffered whole on the output side.

use bytes::{BufMut, Bytes, BytesMut};
use std::ops::Range;

pub trait ChunkSource: Send {
    /// Bytes not yet produced.
    fn remaining(&self) -> usize;

    /// Produces at most `capacity` bytes (and at least one) and lowers `remaining` by
    /// exactly the number produced. Must not be called once `remaining() == 0`.
    fn next_chunk(&mut self, capacity: usize) -> Bytes;
}

/// Streams a byte range of a value that is already in memory.
#[derive(Debug, Clone)]
pub struct SliceChunkSource {
    value: Bytes,
}

impl SliceChunkSource {
    pub fn new(value: Bytes) -> Self {
        Self { value }
    }

    /// `range` must lie within `value`.
    pub fn with_range(value: Bytes, range: Range<usize>) -> Self {
        Self {
            value: value.slice(range),
        }
    }
}

impl ChunkSource for SliceChunkSource {
    fn remaining(&self) -> usize {
        self.value.len()
    }

    fn next_chunk(&mut self, capacity: usize) -> Bytes {
        debug_assert!(self.remaining() > 0, "next_chunk on an exhausted source");
        let n = capacity.max(1).min(self.value.len());
        self.value.split_to(n)
    }
}

/// Streams a range scan as `key '\n' value '\n'` records, in key order.
#[derive(Debug, Clone)]
pub struct ScanChunkSource {
    records: Vec<(Bytes, Bytes)>,
    record: usize,
    // 0 = key, 1 = separator, 2 = value, 3 = terminator
    part: usize,
    offset: usize,
    remaining: usize,
}

impl ScanChunkSource {
    pub fn new(records: Vec<(Bytes, Bytes)>) -> Self {
        let remaining = records
            .iter()
            .map(|(key, value)| key.len() + value.len() + 2)
            .sum();
        Self {
            records,
            record: 0,
            part: 0,
            offset: 0,
            remaining,
        }
    }
}

impl ChunkSource for ScanChunkSource {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn next_chunk(&mut self, capacity: usize) -> Bytes {
        debug_assert!(self.remaining > 0, "next_chunk on an exhausted source");
        let capacity = capacity.max(1).min(self.remaining);
        let mut chunk = BytesMut::with_capacity(capacity);

        while chunk.len() < capacity && self.record < self.records.len() {
            let (key, value) = &self.records[self.record];
            let part: &[u8] = match self.part {
                0 => key.as_ref(),
                2 => value.as_ref(),
                _ => &b"\n"[..],
            };

            let available = &part[self.offset..];
            let take = available.len().min(capacity - chunk.len());
            chunk.put_slice(&available[..take]);
            self.offset += take;

            if self.offset == part.len() {
                self.offset = 0;
                self.part += 1;
                if self.part == 4 {
                    self.part = 0;
                    self.record += 1;
                }
            }
        }

        self.remaining -= chunk.len();
        chunk.freeze()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed Range header")]
    Malformed,

    #[error("range not satisfiable for length {0}")]
    Unsatisfiable(usize),
}

/// Resolves a single `bytes=` range (`a-b`, `a-` or `-n`) against a value of `len` bytes.
///
/// The returned range is half-open. The end is clamped to `len`.
pub fn parse_byte_range(header: &str, len: usize) -> Result<Range<usize>, RangeError> {
    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or(RangeError::Malformed)?
        .trim();
    if spec.contains(',') {
        return Err(RangeError::Malformed);
    }
    let (first, last) = spec.split_once('-').ok_or(RangeError::Malformed)?;
    let (first, last) = (first.trim(), last.trim());

    let parse = |value: &str| value.parse::<usize>().map_err(|_| RangeError::Malformed);

    let range = match (first.is_empty(), last.is_empty()) {
        (true, true) => return Err(RangeError::Malformed),
        (true, false) => {
            let suffix = parse(last)?;
            if suffix == 0 {
                return Err(RangeError::Unsatisfiable(len));
            }
            len.saturating_sub(suffix)..len
        }
        (false, true) => parse(first)?..len,
        (false, false) => {
            let (start, end) = (parse(first)?, parse(last)?);
            if end < start {
                return Err(RangeError::Malformed);
            }
            start..end.saturating_add(1).min(len)
        }
    };

    if range.start >= len {
        return Err(RangeError::Unsatisfiable(len));
    }
    Ok(range)
}
