//! Frame scanner
//!
//! One linear, forward-only pass over the byte range after the file
//! preamble. The scanner discovers frame boundaries, validates each
//! frame's declared length against the mode-derived expectation, and
//! produces the offset index the materializers consume.
//!
//! Recovery policy: a frame whose declared length disagrees with the
//! expectation is counted and skipped, but its declared length is still
//! trusted for advancing the cursor. The stream stays synchronized as
//! long as the declared lengths are self-consistent.

use tracing::{debug, warn};

use super::common::{
    frame, read_u16, read_u64, read_u8, AcquisitionMode, DecodeError, FILE_HEADER_SIZE, MAX_BOARDS,
};

/// Index of valid frames plus aggregate counters, built in one scan pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIndex {
    /// Byte offset of every valid frame, in stream order
    pub frame_offsets: Vec<usize>,
    /// Valid-frame count per board id
    pub events_per_board: [u64; MAX_BOARDS],
    /// Total valid frames
    pub n_events: u64,
    /// Frames skipped for a length mismatch
    pub n_errors: u64,
    /// Highest valid board id seen, plus one
    pub n_boards: u8,
    /// All frames walked, valid and skipped
    pub frames_examined: u64,
}

/// Scan the buffer and build the frame index
///
/// Fatal conditions (zero-length frame, board id above 15, a frame
/// running past the buffer end) abort the whole scan; the partial index
/// is discarded with the error.
pub fn scan(data: &[u8], mode: AcquisitionMode) -> Result<ScanIndex, DecodeError> {
    let len = data.len();
    let estimated_frames = len.saturating_sub(FILE_HEADER_SIZE) / mode.nominal_frame_size();

    let mut index = ScanIndex {
        frame_offsets: Vec::with_capacity(estimated_frames),
        events_per_board: [0; MAX_BOARDS],
        n_events: 0,
        n_errors: 0,
        n_boards: 0,
        frames_examined: 0,
    };

    let mut cursor = FILE_HEADER_SIZE;
    let mut max_board_id: u8 = 0;

    while cursor < len {
        let truncated = DecodeError::TruncatedFrame { offset: cursor };

        let frame_len =
            read_u16(data, cursor + frame::LEN_OFFSET).ok_or(truncated)? as usize;
        let board_id = read_u8(data, cursor + frame::BOARD_OFFSET).ok_or(truncated)?;
        let channel_mask = read_u64(data, cursor + frame::MASK_OFFSET).ok_or(truncated)?;

        let active_channels = channel_mask.count_ones() as usize;
        let expected_len =
            mode.frame_header_size() + active_channels * mode.channel_record_size();

        if frame_len == 0 {
            return Err(DecodeError::ZeroLengthFrame { offset: cursor });
        }
        if board_id as usize >= MAX_BOARDS {
            return Err(DecodeError::BoardIdOutOfRange {
                offset: cursor,
                board_id,
            });
        }

        if frame_len != expected_len {
            warn!(
                offset = cursor,
                frame = index.frames_examined,
                declared = frame_len,
                expected = expected_len,
                "frame length mismatch, skipping frame"
            );
            index.n_errors += 1;
        } else {
            if cursor + frame_len > len {
                return Err(truncated);
            }
            index.frame_offsets.push(cursor);
            index.events_per_board[board_id as usize] += 1;
            if board_id > max_board_id {
                max_board_id = board_id;
            }
            index.n_events += 1;
        }

        // Advance by the declared length on both valid and skipped frames
        cursor += frame_len;
        index.frames_examined += 1;
    }

    index.n_boards = max_board_id + 1;

    debug!(
        n_events = index.n_events,
        n_errors = index.n_errors,
        n_boards = index.n_boards,
        frames_examined = index.frames_examined,
        "scan complete"
    );

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::common::NCHANNELS;

    const MODE: AcquisitionMode = AcquisitionMode::Spectroscopy;

    /// Append a spectroscopy frame with all 64 channels active
    fn push_frame(buf: &mut Vec<u8>, board_id: u8) {
        push_frame_with_len(buf, board_id, MODE.nominal_frame_size() as u16);
    }

    /// Append a frame whose declared length may disagree with its layout
    fn push_frame_with_len(buf: &mut Vec<u8>, board_id: u8, declared_len: u16) {
        let start = buf.len();
        buf.extend_from_slice(&declared_len.to_le_bytes());
        buf.push(board_id);
        buf.extend_from_slice(&0.0_f64.to_le_bytes()); // trigger time
        buf.extend_from_slice(&0u64.to_le_bytes()); // trigger id
        buf.extend_from_slice(&u64::MAX.to_le_bytes()); // all channels active
        // Channel records: raw id, padding, lg, hg
        for ch in 0..NCHANNELS as u8 {
            buf.extend_from_slice(&[ch, 0, 0, 0, 0, 0]);
        }
        assert_eq!(buf.len() - start, MODE.nominal_frame_size());
    }

    /// A buffer with an empty preamble region already in place
    fn empty_file() -> Vec<u8> {
        vec![0u8; FILE_HEADER_SIZE]
    }

    #[test]
    fn test_scan_empty_region() {
        let index = scan(&empty_file(), MODE).unwrap();
        assert_eq!(index.n_events, 0);
        assert_eq!(index.n_errors, 0);
        assert_eq!(index.frames_examined, 0);
        assert!(index.frame_offsets.is_empty());
        assert_eq!(index.n_boards, 1);
    }

    #[test]
    fn test_scan_single_frame() {
        let mut buf = empty_file();
        push_frame(&mut buf, 0);
        let index = scan(&buf, MODE).unwrap();
        assert_eq!(index.n_events, 1);
        assert_eq!(index.n_errors, 0);
        assert_eq!(index.frame_offsets, vec![FILE_HEADER_SIZE]);
        assert_eq!(index.events_per_board[0], 1);
        assert_eq!(index.n_boards, 1);
    }

    #[test]
    fn test_scan_multiple_boards() {
        let mut buf = empty_file();
        push_frame(&mut buf, 0);
        push_frame(&mut buf, 2);
        push_frame(&mut buf, 2);
        push_frame(&mut buf, 5);
        let index = scan(&buf, MODE).unwrap();
        assert_eq!(index.n_events, 4);
        assert_eq!(index.events_per_board[0], 1);
        assert_eq!(index.events_per_board[2], 2);
        assert_eq!(index.events_per_board[5], 1);
        // Board count is max id + 1, not the number of distinct boards
        assert_eq!(index.n_boards, 6);
        assert_eq!(index.frames_examined, 4);
    }

    #[test]
    fn test_scan_offsets_in_stream_order() {
        let mut buf = empty_file();
        push_frame(&mut buf, 1);
        push_frame(&mut buf, 0);
        push_frame(&mut buf, 1);
        let index = scan(&buf, MODE).unwrap();
        let size = MODE.nominal_frame_size();
        assert_eq!(
            index.frame_offsets,
            vec![
                FILE_HEADER_SIZE,
                FILE_HEADER_SIZE + size,
                FILE_HEADER_SIZE + 2 * size
            ]
        );
    }

    #[test]
    fn test_bad_length_frame_is_skipped_not_fatal() {
        let mut buf = empty_file();
        push_frame(&mut buf, 0);
        // Declared length matches the bytes written but not the mask-derived
        // expectation, so the scanner skips it and stays synchronized
        push_frame_with_len(&mut buf, 0, MODE.nominal_frame_size() as u16);
        let bad_start = FILE_HEADER_SIZE + MODE.nominal_frame_size();
        // Clear half the mask bits in the frame we just wrote
        let mask_at = bad_start + frame::MASK_OFFSET;
        buf[mask_at..mask_at + 8].copy_from_slice(&(u32::MAX as u64).to_le_bytes());
        push_frame(&mut buf, 0);

        let index = scan(&buf, MODE).unwrap();
        assert_eq!(index.n_events, 2);
        assert_eq!(index.n_errors, 1);
        assert_eq!(index.frames_examined, 3);
        // Both good frames recorded, the middle one excluded
        let size = MODE.nominal_frame_size();
        assert_eq!(
            index.frame_offsets,
            vec![FILE_HEADER_SIZE, FILE_HEADER_SIZE + 2 * size]
        );
    }

    #[test]
    fn test_zero_length_frame_is_fatal() {
        let mut buf = empty_file();
        push_frame(&mut buf, 0);
        let bad_start = buf.len();
        push_frame_with_len(&mut buf, 0, 0);
        assert_eq!(
            scan(&buf, MODE),
            Err(DecodeError::ZeroLengthFrame { offset: bad_start })
        );
    }

    #[test]
    fn test_board_id_out_of_range_is_fatal() {
        let mut buf = empty_file();
        let bad_start = buf.len();
        push_frame(&mut buf, 16);
        assert_eq!(
            scan(&buf, MODE),
            Err(DecodeError::BoardIdOutOfRange {
                offset: bad_start,
                board_id: 16
            })
        );
    }

    #[test]
    fn test_truncated_frame_header_is_fatal() {
        let mut buf = empty_file();
        push_frame(&mut buf, 0);
        // A few stray bytes that cannot hold a frame header
        buf.extend_from_slice(&[0x01, 0x02, 0x03]);
        let tail = FILE_HEADER_SIZE + MODE.nominal_frame_size();
        assert_eq!(
            scan(&buf, MODE),
            Err(DecodeError::TruncatedFrame { offset: tail })
        );
    }

    #[test]
    fn test_valid_frame_overrunning_buffer_is_fatal() {
        let mut buf = empty_file();
        push_frame(&mut buf, 0);
        // Drop the last channel record; header still declares the full size
        buf.truncate(buf.len() - 6);
        assert_eq!(
            scan(&buf, MODE),
            Err(DecodeError::TruncatedFrame {
                offset: FILE_HEADER_SIZE
            })
        );
    }

    #[test]
    fn test_scan_deterministic() {
        let mut buf = empty_file();
        for board in [0u8, 1, 1, 3] {
            push_frame(&mut buf, board);
        }
        let a = scan(&buf, MODE).unwrap();
        let b = scan(&buf, MODE).unwrap();
        assert_eq!(a.frame_offsets, b.frame_offsets);
        assert_eq!(a.n_events, b.n_events);
        assert_eq!(a.n_errors, b.n_errors);
        assert_eq!(a.n_boards, b.n_boards);
    }

    #[test]
    fn test_scan_timing_mode_frames() {
        // Timing frames have no decode path but the scanner can walk them
        let mode = AcquisitionMode::Timing;
        let mut buf = empty_file();
        let frame_len = mode.nominal_frame_size() as u16;
        let start = buf.len();
        buf.extend_from_slice(&frame_len.to_le_bytes());
        buf.push(0);
        buf.resize(start + frame::MASK_OFFSET, 0);
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        buf.resize(start + frame_len as usize, 0);

        let index = scan(&buf, mode).unwrap();
        assert_eq!(index.n_events, 1);
    }
}
