//! Common types for the FERS decoder

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of channels read out by each board
pub const NCHANNELS: usize = 64;

/// Board id space is fixed at 16 slots (0-15)
pub const MAX_BOARDS: usize = 16;

/// Size of the file preamble in bytes
pub const FILE_HEADER_SIZE: usize = 21;

/// ADC ceiling; readings above this are saturated down to it
pub const ADC_SATURATION: u16 = 4096;

/// Acquisition mode stored in the file preamble
///
/// All four modes are named by the format, but only Spectroscopy and
/// SpectroscopyTiming have a decode path. Timing and Counting frames are
/// sized (the scanner can walk them) yet rejected at materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionMode {
    Spectroscopy,
    Timing,
    SpectroscopyTiming,
    Counting,
}

impl AcquisitionMode {
    /// Map the preamble mode byte to a mode, `None` for unknown codes
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Spectroscopy),
            2 => Some(Self::Timing),
            3 => Some(Self::SpectroscopyTiming),
            4 => Some(Self::Counting),
            _ => None,
        }
    }

    /// The wire code for this mode
    pub fn code(&self) -> u8 {
        match self {
            Self::Spectroscopy => 1,
            Self::Timing => 2,
            Self::SpectroscopyTiming => 3,
            Self::Counting => 4,
        }
    }

    /// Size of the fixed per-frame header in bytes
    pub fn frame_header_size(&self) -> usize {
        match self {
            Self::Spectroscopy => 27,
            Self::Timing => 21,
            Self::SpectroscopyTiming => 27,
            Self::Counting => 27,
        }
    }

    /// Size of one channel record in bytes
    pub fn channel_record_size(&self) -> usize {
        match self {
            Self::Spectroscopy => 6,
            Self::Timing => 7,
            Self::SpectroscopyTiming => 12,
            Self::Counting => 5,
        }
    }

    /// Nominal frame size when all 64 channels are active
    pub fn nominal_frame_size(&self) -> usize {
        self.frame_header_size() + NCHANNELS * self.channel_record_size()
    }

    /// Whether a materializer exists for this mode
    pub fn has_decode_path(&self) -> bool {
        matches!(self, Self::Spectroscopy | Self::SpectroscopyTiming)
    }
}

/// Fatal decode errors
///
/// Recoverable conditions (a frame whose declared length disagrees with
/// the mode-derived expectation) are counted in the scan summary instead
/// of being reported here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// File shorter than the fixed 21-byte preamble
    #[error("truncated header: file is {len} bytes, preamble needs 21")]
    TruncatedHeader { len: usize },

    /// A frame extends past the end of the buffer
    #[error("frame at byte {offset} extends past the end of the buffer")]
    TruncatedFrame { offset: usize },

    /// A zero-length frame cannot be skipped; the cursor cannot advance
    #[error("zero-length frame at byte {offset}")]
    ZeroLengthFrame { offset: usize },

    /// Board id outside the fixed 16-slot space
    #[error("board id {board_id} at byte {offset} exceeds the 0-15 range")]
    BoardIdOutOfRange { offset: usize, board_id: u8 },

    /// Mode is named by the format but has no decode path
    #[error("no decode path for acquisition mode {mode:?}")]
    UnsupportedMode { mode: AcquisitionMode },

    /// Preamble mode byte is not one of the four known codes
    #[error("unknown acquisition mode code {code}")]
    UnknownModeCode { code: u8 },

    /// Raw channel id outside the remap table domain
    #[error("raw channel id {channel} outside the remap table domain (0-63)")]
    ChannelOutOfRange { channel: u8 },
}

/// One decoded frame
///
/// Per-channel arrays are indexed by *mapped* (physical) channel, not by
/// the raw index on the wire. `toa`/`tot` stay zeroed outside
/// SpectroscopyTiming mode.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub board_id: u8,
    pub trigger_id: u64,
    pub trigger_time_us: f64,
    pub lg_pha: [u16; NCHANNELS],
    pub hg_pha: [u16; NCHANNELS],
    pub toa: [u32; NCHANNELS],
    pub tot: [u16; NCHANNELS],
}

impl Default for Event {
    fn default() -> Self {
        Self {
            board_id: 0,
            trigger_id: 0,
            trigger_time_us: 0.0,
            lg_pha: [0; NCHANNELS],
            hg_pha: [0; NCHANNELS],
            toa: [0; NCHANNELS],
            tot: [0; NCHANNELS],
        }
    }
}

/// Clamp an amplitude reading to the ADC ceiling
///
/// The front-end occasionally reports values above 4096; they are
/// saturated readings, not corruption, and are pinned to the ceiling.
#[inline]
pub fn clamp_pha(value: u16) -> u16 {
    value.min(ADC_SATURATION)
}

/// Byte offsets of the fixed frame-header fields, relative to frame start
pub(crate) mod frame {
    /// Declared frame length (u16 LE)
    pub const LEN_OFFSET: usize = 0;
    /// Board id (u8)
    pub const BOARD_OFFSET: usize = 2;
    /// Trigger timestamp in microseconds (f64 LE)
    pub const TIME_OFFSET: usize = 3;
    /// Trigger id (u64 LE)
    pub const TRIGGER_OFFSET: usize = 11;
    /// Active-channel bitmap (u64 LE)
    pub const MASK_OFFSET: usize = 19;
}

// ---------------------------------------------------------------------------
// Bounds-checked field extraction (Little-Endian wire format)
// ---------------------------------------------------------------------------

/// Read a u8 at the given byte offset
#[inline]
pub(crate) fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Read a Little-Endian u16 at the given byte offset
#[inline]
pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(
        data.get(offset..offset + 2)?.try_into().ok()?,
    ))
}

/// Read a Little-Endian u32 at the given byte offset
#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(
        data.get(offset..offset + 4)?.try_into().ok()?,
    ))
}

/// Read a Little-Endian u64 at the given byte offset
#[inline]
pub(crate) fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(
        data.get(offset..offset + 8)?.try_into().ok()?,
    ))
}

/// Read a Little-Endian f64 at the given byte offset
#[inline]
pub(crate) fn read_f64(data: &[u8], offset: usize) -> Option<f64> {
    Some(f64::from_le_bytes(
        data.get(offset..offset + 8)?.try_into().ok()?,
    ))
}
