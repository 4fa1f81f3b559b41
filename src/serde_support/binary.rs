//! Binary persistence for [`ShardedBloomFilter`].
//!
//! # Format
//!
//! All multi-byte fields are big-endian.
//!
//! ```text
//! [Preamble: 8 bytes, version 2 only]
//!   Magic:          4 bytes  ("PWBF")
//!   Version:        u16      (2)
//!   Reserved:       u16      (0)
//!
//! [Header: 24 bytes]
//!   Hash count:     i32      (k)
//!   Bits per shard: i32      (m)
//!   Shard count:    i32      (1, 16 or 256)
//!   Capacity:       i64
//!   Error rate:     f32
//!
//! [Shards: shard_count × ⌈m / 8⌉ bytes]
//!   Packed bits, shard 0 first; bit i of a shard is bit (i % 8) of byte i / 8
//! ```
//!
//! Version 1 files carry no preamble and start directly at the header. A
//! buffer is treated as version 2 when it begins with the magic; a version 1
//! header cannot start with it unless its hash count is 0x50574246.
//!
//! The total length is fully determined by the header. Decoding rejects any
//! buffer that is shorter or longer than that.
//!
//! # Examples
//!
//! ```
//! use pwnedbloom::ShardedBloomFilter;
//! use pwnedbloom::serde_support::binary::{self, FormatVersion};
//!
//! let mut filter = ShardedBloomFilter::new(128, 0.01).unwrap();
//! filter.add_hex("5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8").unwrap();
//!
//! let bytes = binary::encode(&filter, FormatVersion::CURRENT);
//! assert_eq!(&bytes[..4], b"PWBF");
//!
//! let restored = binary::decode(&bytes).unwrap();
//! assert_eq!(restored, filter);
//! ```

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use crate::core::bitvec::BitVec;
use crate::core::params::{self, FilterPlan};
use crate::error::{PwnedBloomError, Result};
use crate::filters::ShardedBloomFilter;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Magic bytes opening a tagged file.
pub const MAGIC: &[u8; 4] = b"PWBF";

/// Length of the tagged preamble.
pub const PREAMBLE_LEN: usize = 8;

/// Length of the parameter header.
pub const HEADER_LEN: usize = 24;

/// On-disk layout revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormatVersion {
    /// Untagged header followed by shards.
    Legacy,
    /// `PWBF` preamble, then the legacy layout.
    Tagged,
}

impl FormatVersion {
    /// Version written by default.
    pub const CURRENT: Self = Self::Tagged;

    /// Numeric version: 1 or 2.
    #[must_use]
    pub const fn number(self) -> u16 {
        match self {
            Self::Legacy => 1,
            Self::Tagged => 2,
        }
    }

    /// Version for a preamble version field.
    #[must_use]
    pub const fn from_number(number: u16) -> Option<Self> {
        match number {
            1 => Some(Self::Legacy),
            2 => Some(Self::Tagged),
            _ => None,
        }
    }

    /// Bytes preceding the header.
    #[must_use]
    pub const fn preamble_len(self) -> usize {
        match self {
            Self::Legacy => 0,
            Self::Tagged => PREAMBLE_LEN,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Ways a persisted filter can be malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    /// Input ended inside the preamble or header.
    #[error("Buffer too small: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes needed to finish the field being read.
        expected: u64,
        /// Bytes available.
        actual: u64,
    },

    /// Preamble names a version this build cannot read.
    #[error("Unsupported format version: {0} (expected 2)")]
    UnsupportedVersion(u16),

    /// Reserved preamble field is not zero.
    #[error("Reserved header field is {0:#06x}, expected 0")]
    ReservedField(u16),

    /// Hash count below 1.
    #[error("Invalid hash count: {0}")]
    InvalidHashCount(i32),

    /// Bits per shard below 1.
    #[error("Invalid bits per shard: {0}")]
    InvalidBitsPerShard(i32),

    /// Shard count other than 1, 16 or 256.
    #[error("Invalid shard count: {0} (expected 1, 16 or 256)")]
    InvalidShardCount(i32),

    /// Capacity below 1.
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(i64),

    /// Error rate outside (0, 1).
    #[error("Invalid error rate: {0}")]
    InvalidErrorRate(f32),

    /// Input length disagrees with the length the header implies.
    #[error("Expected {expected} bytes from header, found {actual}")]
    LengthMismatch {
        /// Length implied by the header.
        expected: u64,
        /// Length actually present.
        actual: u64,
    },

    /// Stream continued past the last shard.
    #[error("Unexpected data after {expected} bytes")]
    TrailingData {
        /// Length implied by the header.
        expected: u64,
    },
}

impl From<FormatError> for PwnedBloomError {
    fn from(err: FormatError) -> Self {
        PwnedBloomError::invalid_file_format(err.to_string())
    }
}

/// Decoded preamble and header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    /// Layout the header was read from.
    pub version: FormatVersion,
    /// Probes per item.
    pub hash_count: u32,
    /// Bits per shard.
    pub bits_per_shard: u32,
    /// Number of shards.
    pub shard_count: u32,
    /// Planned capacity.
    pub capacity: u64,
    /// Target error rate.
    pub error_rate: f32,
}

impl FileHeader {
    fn for_filter(filter: &ShardedBloomFilter, version: FormatVersion) -> Self {
        Self {
            version,
            hash_count: filter.hash_count(),
            bits_per_shard: filter.bits_per_shard(),
            shard_count: filter.shard_count(),
            capacity: filter.total_capacity(),
            error_rate: filter.expected_error_rate(),
        }
    }

    /// Packed bytes in one shard.
    #[must_use]
    pub fn bytes_per_shard(&self) -> usize {
        (self.bits_per_shard as usize).div_ceil(8)
    }

    /// Length of a complete file with this header.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        (self.version.preamble_len() + HEADER_LEN) as u64
            + u64::from(self.shard_count) * self.bytes_per_shard() as u64
    }

    /// The header's parameters as a plan.
    #[must_use]
    pub fn plan(&self) -> FilterPlan {
        FilterPlan {
            hash_count: self.hash_count,
            bits_per_shard: self.bits_per_shard,
            shard_count: self.shard_count,
            capacity: self.capacity,
            error_rate: self.error_rate,
        }
    }
}

/// Appends typed big-endian fields to a byte buffer.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    /// Empty writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[cfg(test)]
    fn offset(&self) -> usize {
        self.buf.len()
    }

    /// Append raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a `u16`.
    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Append an `i32`.
    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Append an `i64`.
    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Append an IEEE-754 `f32`.
    pub fn put_f32(&mut self, value: f32) -> &mut Self {
        self.put_bytes(&value.to_bits().to_be_bytes())
    }

    /// Append the packed bits of a shard.
    pub fn put_bits(&mut self, bits: &BitVec) -> &mut Self {
        bits.write_bytes(&mut self.buf);
        self
    }

    /// The written bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Consumes typed big-endian fields from a byte slice.
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    /// Reader positioned at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    #[cfg(test)]
    fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Next `len` bytes.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`] if fewer than `len` bytes remain.
    pub fn take_bytes(&mut self, len: usize) -> std::result::Result<&'a [u8], FormatError> {
        if self.remaining() < len {
            return Err(FormatError::Truncated {
                expected: (self.offset + len) as u64,
                actual: self.buf.len() as u64,
            });
        }
        let bytes = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> std::result::Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take_bytes(N)?);
        Ok(out)
    }

    /// Next `u16`.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`].
    pub fn take_u16(&mut self) -> std::result::Result<u16, FormatError> {
        self.take_array().map(u16::from_be_bytes)
    }

    /// Next `i32`.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`].
    pub fn take_i32(&mut self) -> std::result::Result<i32, FormatError> {
        self.take_array().map(i32::from_be_bytes)
    }

    /// Next `i64`.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`].
    pub fn take_i64(&mut self) -> std::result::Result<i64, FormatError> {
        self.take_array().map(i64::from_be_bytes)
    }

    /// Next `f32`.
    ///
    /// # Errors
    ///
    /// [`FormatError::Truncated`].
    pub fn take_f32(&mut self) -> std::result::Result<f32, FormatError> {
        self.take_array()
            .map(|b| f32::from_bits(u32::from_be_bytes(b)))
    }
}

/// Read the preamble (if present) and header.
///
/// # Errors
///
/// [`FormatError`] for truncation, unknown versions or out-of-range fields.
pub fn read_header(reader: &mut FieldReader<'_>) -> std::result::Result<FileHeader, FormatError> {
    let version = if reader.buf[reader.offset..].starts_with(MAGIC) {
        reader.take_bytes(MAGIC.len())?;
        let number = reader.take_u16()?;
        let reserved = reader.take_u16()?;
        let version = match FormatVersion::from_number(number) {
            Some(FormatVersion::Tagged) => FormatVersion::Tagged,
            _ => return Err(FormatError::UnsupportedVersion(number)),
        };
        if reserved != 0 {
            return Err(FormatError::ReservedField(reserved));
        }
        version
    } else {
        FormatVersion::Legacy
    };

    let hash_count = reader.take_i32()?;
    let bits_per_shard = reader.take_i32()?;
    let shard_count = reader.take_i32()?;
    let capacity = reader.take_i64()?;
    let error_rate = reader.take_f32()?;

    if hash_count < 1 {
        return Err(FormatError::InvalidHashCount(hash_count));
    }
    if bits_per_shard < 1 {
        return Err(FormatError::InvalidBitsPerShard(bits_per_shard));
    }
    if shard_count < 1 || !params::is_valid_shard_count(shard_count as u32) {
        return Err(FormatError::InvalidShardCount(shard_count));
    }
    if capacity < 1 {
        return Err(FormatError::InvalidCapacity(capacity));
    }
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(FormatError::InvalidErrorRate(error_rate));
    }

    Ok(FileHeader {
        version,
        hash_count: hash_count as u32,
        bits_per_shard: bits_per_shard as u32,
        shard_count: shard_count as u32,
        capacity: capacity as u64,
        error_rate,
    })
}

fn write_header(out: &mut FieldWriter, header: &FileHeader) {
    if header.version == FormatVersion::Tagged {
        out.put_bytes(MAGIC)
            .put_u16(header.version.number())
            .put_u16(0);
    }
    // Every field was range-checked when the filter was built.
    out.put_i32(header.hash_count as i32)
        .put_i32(header.bits_per_shard as i32)
        .put_i32(header.shard_count as i32)
        .put_i64(header.capacity as i64)
        .put_f32(header.error_rate);
}

/// Encoded size of a filter with `plan` in `version`.
#[must_use]
pub fn encoded_len(plan: &FilterPlan, version: FormatVersion) -> usize {
    version.preamble_len() + HEADER_LEN + plan.shard_count as usize * plan.bytes_per_shard()
}

/// Encode `filter` into a new buffer.
#[must_use]
pub fn encode(filter: &ShardedBloomFilter, version: FormatVersion) -> Vec<u8> {
    let mut out = FieldWriter::with_capacity(filter.encoded_len(version));
    write_header(&mut out, &FileHeader::for_filter(filter, version));
    for shard in filter.shards() {
        out.put_bits(shard);
    }
    out.into_inner()
}

/// Decode a filter from a complete buffer.
///
/// # Errors
///
/// [`PwnedBloomError::InvalidFileFormat`] if the header is malformed or the
/// buffer length differs from the length the header implies.
pub fn decode(bytes: &[u8]) -> Result<ShardedBloomFilter> {
    let mut reader = FieldReader::new(bytes);
    let header = read_header(&mut reader)?;

    let expected = header.encoded_len();
    if bytes.len() as u64 != expected {
        return Err(FormatError::LengthMismatch {
            expected,
            actual: bytes.len() as u64,
        }
        .into());
    }

    let shards = (0..header.shard_count)
        .map(|_| {
            let packed = reader.take_bytes(header.bytes_per_shard())?;
            BitVec::from_bytes(packed, header.bits_per_shard as usize)
        })
        .collect::<Result<Vec<_>>>()?;

    assemble(&header, shards)
}

fn assemble(header: &FileHeader, shards: Vec<BitVec>) -> Result<ShardedBloomFilter> {
    ShardedBloomFilter::from_parts(
        header.hash_count,
        header.bits_per_shard,
        header.capacity,
        header.error_rate,
        shards,
    )
    .map_err(|e| PwnedBloomError::invalid_file_format(e.to_string()))
}

/// Stream `filter` into `writer`, one shard at a time.
///
/// # Errors
///
/// Propagates I/O errors from `writer`.
pub fn write_to<W: Write>(
    filter: &ShardedBloomFilter,
    mut writer: W,
    version: FormatVersion,
) -> Result<()> {
    let mut head = FieldWriter::with_capacity(PREAMBLE_LEN + HEADER_LEN);
    write_header(&mut head, &FileHeader::for_filter(filter, version));
    writer.write_all(&head.into_inner())?;

    let mut packed = Vec::with_capacity(filter.plan().bytes_per_shard());
    for shard in filter.shards() {
        packed.clear();
        shard.write_bytes(&mut packed);
        writer.write_all(&packed)?;
    }
    writer.flush()?;
    Ok(())
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly one encoded filter from `reader`.
///
/// The stream must end right after the last shard.
///
/// # Errors
///
/// I/O errors, or [`PwnedBloomError::InvalidFileFormat`] if the stream is
/// malformed, shorter than its header implies, or continues past it.
pub fn read_from<R: Read>(mut reader: R) -> Result<ShardedBloomFilter> {
    let mut head = [0u8; PREAMBLE_LEN + HEADER_LEN];
    let got = read_full(&mut reader, &mut head[..MAGIC.len()])?;
    let head_len = if head[..got] == MAGIC[..] {
        PREAMBLE_LEN + HEADER_LEN
    } else {
        HEADER_LEN
    };
    let got = got + read_full(&mut reader, &mut head[got..head_len])?;
    let header = read_header(&mut FieldReader::new(&head[..got]))?;

    let expected = header.encoded_len();
    let mut offset = head_len as u64;
    let mut packed = vec![0u8; header.bytes_per_shard()];
    let mut shards = Vec::with_capacity(header.shard_count as usize);
    for _ in 0..header.shard_count {
        let n = read_full(&mut reader, &mut packed)?;
        offset += n as u64;
        if n < packed.len() {
            return Err(FormatError::LengthMismatch {
                expected,
                actual: offset,
            }
            .into());
        }
        shards.push(BitVec::from_bytes(&packed, header.bits_per_shard as usize)?);
    }

    let mut extra = [0u8; 1];
    if read_full(&mut reader, &mut extra)? != 0 {
        return Err(FormatError::TrailingData { expected }.into());
    }

    assemble(&header, shards)
}

/// Save `filter` to `path`, replacing any existing file.
///
/// # Errors
///
/// I/O errors, with the path in the message.
pub fn save(filter: &ShardedBloomFilter, path: &Path, version: FormatVersion) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| PwnedBloomError::io_with_context(&e, path.display()))?;
    write_to(filter, BufWriter::new(file), version)
        .map_err(|e| with_path_context(e, path))?;
    info!(
        path = %path.display(),
        bytes = filter.encoded_len(version),
        shards = filter.shard_count(),
        version = version.number(),
        "Saved filter"
    );
    Ok(())
}

/// Load a filter from `path`.
///
/// # Errors
///
/// I/O errors, or [`PwnedBloomError::InvalidFileFormat`], with the path in the message.
pub fn load(path: &Path) -> Result<ShardedBloomFilter> {
    let file = File::open(path)
        .map_err(|e| PwnedBloomError::io_with_context(&e, path.display()))?;
    let filter = read_from(BufReader::new(file)).map_err(|e| with_path_context(e, path))?;
    info!(
        path = %path.display(),
        hash_count = filter.hash_count(),
        bits_per_shard = filter.bits_per_shard(),
        shards = filter.shard_count(),
        "Loaded filter"
    );
    Ok(filter)
}

/// Read only the header of the file at `path` and check the file length.
///
/// Cheap for multi-gigabyte filters: shard data is never read.
///
/// # Errors
///
/// I/O errors, or [`PwnedBloomError::InvalidFileFormat`].
pub fn inspect(path: &Path) -> Result<FilterInfo> {
    let mut file = File::open(path)
        .map_err(|e| PwnedBloomError::io_with_context(&e, path.display()))?;
    let actual = file
        .metadata()
        .map_err(|e| PwnedBloomError::io_with_context(&e, path.display()))?
        .len();

    let mut head = [0u8; PREAMBLE_LEN + HEADER_LEN];
    let got = read_full(&mut file, &mut head)
        .map_err(|e| PwnedBloomError::io_with_context(&e, path.display()))?;
    let header = read_header(&mut FieldReader::new(&head[..got]))
        .map_err(|e| with_path_context(e.into(), path))?;

    let expected = header.encoded_len();
    if actual != expected {
        return Err(with_path_context(
            FormatError::LengthMismatch { expected, actual }.into(),
            path,
        ));
    }
    debug!(path = %path.display(), bytes = actual, "Inspected filter header");
    Ok(FilterInfo::from_header(&header))
}

fn with_path_context(err: PwnedBloomError, path: &Path) -> PwnedBloomError {
    match err {
        PwnedBloomError::InvalidFileFormat { message } => {
            PwnedBloomError::invalid_file_format(format!("{}: {}", path.display(), message))
        }
        PwnedBloomError::Io { kind, message } => PwnedBloomError::Io {
            kind,
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    }
}

/// Summary of a persisted filter's parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterInfo {
    /// Layout version (1 or 2).
    pub format_version: u16,
    /// Probes per item.
    pub hash_count: u32,
    /// Bits per shard.
    pub bits_per_shard: u32,
    /// Number of shards.
    pub shard_count: u32,
    /// Planned capacity.
    pub capacity: u64,
    /// Target error rate.
    pub error_rate: f32,
    /// Total encoded size in bytes.
    pub encoded_len: u64,
    /// Theoretical false positive probability at capacity.
    pub estimated_false_positive_rate: f64,
}

impl FilterInfo {
    /// Summary of a decoded header.
    #[must_use]
    pub fn from_header(header: &FileHeader) -> Self {
        Self {
            format_version: header.version.number(),
            hash_count: header.hash_count,
            bits_per_shard: header.bits_per_shard,
            shard_count: header.shard_count,
            capacity: header.capacity,
            error_rate: header.error_rate,
            encoded_len: header.encoded_len(),
            estimated_false_positive_rate: header.plan().expected_fp_rate(),
        }
    }

    /// Summary of an in-memory filter as it would be written in `version`.
    #[must_use]
    pub fn from_filter(filter: &ShardedBloomFilter, version: FormatVersion) -> Self {
        Self::from_header(&FileHeader::for_filter(filter, version))
    }
}

impl fmt::Display for FilterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Format version:       {}", self.format_version)?;
        writeln!(f, "Hash functions (k):   {}", self.hash_count)?;
        writeln!(f, "Bits per shard (m):   {}", self.bits_per_shard)?;
        writeln!(f, "Shards:               {}", self.shard_count)?;
        writeln!(f, "Capacity:             {}", self.capacity)?;
        writeln!(f, "Expected error rate:  {}", self.error_rate)?;
        writeln!(f, "Estimated FP rate:    {:.3e}", self.estimated_false_positive_rate)?;
        write!(f, "Size:                 {} bytes", self.encoded_len)
    }
}
