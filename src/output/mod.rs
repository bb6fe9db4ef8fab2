//! Converted-file output format
//!
//! Container layout:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Magic "FERSCNV1" (8 bytes)             │
//! │  Summary block (u32 LE length + MsgPack)│
//! ├─────────────────────────────────────────┤
//! │  Event batch 1 (u32 LE length + MsgPack)│
//! ├─────────────────────────────────────────┤
//! │  ...                                    │
//! ├─────────────────────────────────────────┤
//! │  Footer (fixed 64 bytes)                │
//! │  - Magic, checksum, counts, flag        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The footer checksum covers every event batch (length prefixes
//! included), so a reader can detect truncation or a crashed write
//! without parsing the batches.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::decoder::{DecodedFile, Event, FileSummary};

/// Magic bytes opening a converted file
pub const FILE_MAGIC: [u8; 8] = *b"FERSCNV1";

/// Footer magic, distinct from the header magic to detect truncation
pub const FOOTER_MAGIC: [u8; 8] = *b"FERSEND1";

/// Fixed footer size in bytes
pub const FOOTER_SIZE: usize = 64;

/// Default number of events per MsgPack batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Output container errors
#[derive(Debug, thiserror::Error)]
pub enum OutputFormatError {
    #[error("data too short to contain a valid container")]
    TooShort,

    #[error("invalid file magic bytes")]
    InvalidMagic,

    #[error("invalid footer magic bytes")]
    InvalidFooterMagic,

    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checksum mismatch: expected {expected:016x}, got {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },
}

/// One serialized batch of events
#[derive(Debug, Clone, Serialize)]
struct EventBatch<'a> {
    events: &'a [Event],
}

/// Rolling checksum over the data blocks, xxHash64 per block
///
/// Block hashes are folded with rotate-xor; the byte count is mixed in
/// at the end so reordered blocks and truncations both change the value.
#[derive(Debug, Clone, Default)]
pub struct ChecksumCalculator {
    state: u64,
    bytes_processed: u64,
}

impl ChecksumCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let block_hash = xxh64(data, 0);
        self.state = self.state.rotate_left(5) ^ block_hash;
        self.bytes_processed += data.len() as u64;
    }

    pub fn finalize(&self) -> u64 {
        self.state ^ self.bytes_processed
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }
}

/// Fixed-size footer closing a converted file
#[derive(Debug, Clone, Copy)]
pub struct OutputFooter {
    pub magic: [u8; 8],
    /// Checksum over all event batches
    pub data_checksum: u64,
    /// Events written across all batches
    pub total_events: u64,
    /// Bytes of event batches, length prefixes included
    pub data_bytes: u64,
    /// Skipped-frame count carried over from the decode summary
    pub n_errors: u64,
    /// Board count carried over from the decode summary
    pub n_boards: u8,
    /// 1 when the writer ran to completion
    pub write_complete: u8,
    _reserved: [u8; 22],
}

impl Default for OutputFooter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFooter {
    pub fn new() -> Self {
        Self {
            magic: FOOTER_MAGIC,
            data_checksum: 0,
            total_events: 0,
            data_bytes: 0,
            n_errors: 0,
            n_boards: 0,
            write_complete: 0,
            _reserved: [0u8; 22],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.write_complete == 1
    }

    /// Serialize to the fixed 64-byte layout
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut buf = [0u8; FOOTER_SIZE];
        buf[0..8].copy_from_slice(&self.magic);
        buf[8..16].copy_from_slice(&self.data_checksum.to_le_bytes());
        buf[16..24].copy_from_slice(&self.total_events.to_le_bytes());
        buf[24..32].copy_from_slice(&self.data_bytes.to_le_bytes());
        buf[32..40].copy_from_slice(&self.n_errors.to_le_bytes());
        buf[40] = self.n_boards;
        buf[41] = self.write_complete;
        buf
    }

    pub fn from_bytes(data: &[u8; FOOTER_SIZE]) -> Result<Self, OutputFormatError> {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&data[0..8]);
        if magic != FOOTER_MAGIC {
            return Err(OutputFormatError::InvalidFooterMagic);
        }

        let field = |range: std::ops::Range<usize>| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&data[range]);
            u64::from_le_bytes(bytes)
        };

        Ok(Self {
            magic,
            data_checksum: field(8..16),
            total_events: field(16..24),
            data_bytes: field(24..32),
            n_errors: field(32..40),
            n_boards: data[40],
            write_complete: data[41],
            _reserved: [0u8; 22],
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutputFormatError> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, OutputFormatError> {
        let mut buf = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut buf)?;
        Self::from_bytes(&buf)
    }
}

/// Write a length-prefixed MsgPack block
fn write_block<W: Write, T: Serialize>(
    writer: &mut W,
    value: &T,
    checksum: Option<&mut ChecksumCalculator>,
) -> Result<u64, OutputFormatError> {
    let data = rmp_serde::to_vec_named(value)?;
    let len_bytes = (data.len() as u32).to_le_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(&data)?;
    if let Some(checksum) = checksum {
        checksum.update(&len_bytes);
        checksum.update(&data);
    }
    Ok((4 + data.len()) as u64)
}

/// Write a decoded file into the container format
///
/// When `summary_only` is set, the summary block is written and the
/// event batches are skipped; the footer still records the true event
/// count from the summary so downstream tooling sees what was decoded.
pub fn write_to<W: Write>(
    writer: &mut W,
    decoded: &DecodedFile,
    batch_size: usize,
    summary_only: bool,
) -> Result<u64, OutputFormatError> {
    let batch_size = batch_size.max(1);
    let mut bytes_written = 0u64;

    writer.write_all(&FILE_MAGIC)?;
    bytes_written += FILE_MAGIC.len() as u64;
    bytes_written += write_block(writer, &decoded.summary, None)?;

    let mut checksum = ChecksumCalculator::new();
    if !summary_only {
        for events in decoded.events.chunks(batch_size) {
            let batch = EventBatch { events };
            bytes_written += write_block(writer, &batch, Some(&mut checksum))?;
        }
    }

    let mut footer = OutputFooter::new();
    footer.data_checksum = checksum.finalize();
    footer.data_bytes = checksum.bytes_processed();
    footer.total_events = decoded.summary.n_events;
    footer.n_errors = decoded.summary.n_errors;
    footer.n_boards = decoded.summary.n_boards;
    footer.write_complete = 1;
    footer.write_to(writer)?;
    bytes_written += FOOTER_SIZE as u64;

    Ok(bytes_written)
}

/// Write a decoded file to disk, buffered
pub fn write_file<P: AsRef<Path>>(
    path: P,
    decoded: &DecodedFile,
    batch_size: usize,
    summary_only: bool,
) -> Result<u64, OutputFormatError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let bytes = write_to(&mut writer, decoded, batch_size, summary_only)?;
    writer.flush()?;
    Ok(bytes)
}

/// Read back the summary block and footer, verifying the data checksum
///
/// Used by tests and by tooling that wants the counters without paying
/// for event deserialization.
pub fn read_summary(data: &[u8]) -> Result<(FileSummary, OutputFooter), OutputFormatError> {
    if data.len() < FILE_MAGIC.len() + 4 + FOOTER_SIZE {
        return Err(OutputFormatError::TooShort);
    }
    if data[..8] != FILE_MAGIC {
        return Err(OutputFormatError::InvalidMagic);
    }

    let summary_len =
        u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let summary_end = 12 + summary_len;
    if data.len() < summary_end + FOOTER_SIZE {
        return Err(OutputFormatError::TooShort);
    }
    let summary: FileSummary = rmp_serde::from_slice(&data[12..summary_end])?;

    let footer_start = data.len() - FOOTER_SIZE;
    let mut footer_bytes = [0u8; FOOTER_SIZE];
    footer_bytes.copy_from_slice(&data[footer_start..]);
    let footer = OutputFooter::from_bytes(&footer_bytes)?;

    // The writer hashed each batch block separately; walk the length
    // prefixes and fold the same way
    let mut checksum = ChecksumCalculator::new();
    let mut cursor = summary_end;
    while cursor < footer_start {
        if cursor + 4 > footer_start {
            return Err(OutputFormatError::TooShort);
        }
        let len = u32::from_le_bytes([
            data[cursor],
            data[cursor + 1],
            data[cursor + 2],
            data[cursor + 3],
        ]) as usize;
        let block_end = cursor + 4 + len;
        if block_end > footer_start {
            return Err(OutputFormatError::TooShort);
        }
        checksum.update(&data[cursor..cursor + 4]);
        checksum.update(&data[cursor + 4..block_end]);
        cursor = block_end;
    }

    let actual = checksum.finalize();
    if actual != footer.data_checksum {
        return Err(OutputFormatError::ChecksumMismatch {
            expected: footer.data_checksum,
            actual,
        });
    }

    Ok((summary, footer))
}
