//! Channel remap table
//!
//! The readout boards number their channels by ASIC routing order, not by
//! physical position in the detector. This table is the fixed permutation
//! from raw channel index to fiber position; it is a bijection on 0-63.

use super::common::{DecodeError, NCHANNELS};

/// Raw channel index → physical fiber position
const CHANNEL_MAP: [u8; NCHANNELS] = [
    0, 40, 8, 32, // 0 - 3
    1, 41, 9, 33, // 4 - 7
    2, 42, 10, 34, // 8 - 11
    3, 43, 11, 35, // 12 - 15
    4, 44, 12, 36, // 16 - 19
    5, 45, 13, 37, // 20 - 23
    6, 46, 14, 38, // 24 - 27
    7, 47, 15, 39, // 28 - 31
    24, 48, 16, 56, // 32 - 35
    25, 49, 17, 57, // 36 - 39
    26, 50, 18, 58, // 40 - 43
    27, 51, 19, 59, // 44 - 47
    28, 52, 20, 60, // 48 - 51
    29, 53, 21, 61, // 52 - 55
    30, 54, 22, 62, // 56 - 59
    31, 55, 23, 63, // 60 - 63
];

/// Map a raw channel index to its physical position
///
/// An index outside 0-63 is a protocol violation, not a data value.
#[inline]
pub fn remap(raw: u8) -> Result<u8, DecodeError> {
    CHANNEL_MAP
        .get(raw as usize)
        .copied()
        .ok_or(DecodeError::ChannelOutOfRange { channel: raw })
}

/// Inverse permutation: physical position → raw channel index
///
/// Used by the emulator to place amplitudes at chosen physical slots.
pub(crate) fn inverse_map() -> [u8; NCHANNELS] {
    let mut inverse = [0u8; NCHANNELS];
    for (raw, &physical) in CHANNEL_MAP.iter().enumerate() {
        inverse[physical as usize] = raw as u8;
    }
    inverse
}
