//! Decoder for CAEN FERS-5200 binary data files
//!
//! Walks a raw file buffer and produces typed, channel-mapped events:
//! preamble parse, one frame-scanning pass building an offset index,
//! then per-mode materialization of every valid frame. The whole decode
//! is a pure function of the buffer; it never touches the filesystem and
//! never terminates the process.

pub mod common;
pub mod header;
pub mod mapping;
pub mod scan;
pub mod spectroscopy;
pub mod spectroscopy_timing;

pub use common::{
    clamp_pha, AcquisitionMode, DecodeError, Event, ADC_SATURATION, FILE_HEADER_SIZE, MAX_BOARDS,
    NCHANNELS,
};
pub use header::FileHeader;
pub use mapping::remap;
pub use scan::{scan, ScanIndex};

use serde::{Deserialize, Serialize};

/// Aggregate description of a decoded file, handed to the output sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub acquisition_mode: AcquisitionMode,
    /// Acquisition start, milliseconds since the Unix epoch
    pub acq_start_ms: u64,
    pub data_format_version: String,
    pub software_version: String,
    /// Valid events decoded
    pub n_events: u64,
    /// Frames skipped for a length mismatch
    pub n_errors: u64,
    /// Highest board id seen plus one
    pub n_boards: u8,
    /// Valid-event counts for boards 0..n_boards
    pub events_per_board: Vec<u64>,
    /// All frames walked, valid and skipped
    pub frames_examined: u64,
}

impl FileSummary {
    /// Acquisition start as a UTC timestamp, `None` if out of range
    pub fn acq_start_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        use chrono::TimeZone;
        chrono::Utc.timestamp_millis_opt(self.acq_start_ms as i64).single()
    }

    fn new(file_header: &FileHeader, mode: AcquisitionMode, index: &ScanIndex) -> Self {
        Self {
            acquisition_mode: mode,
            acq_start_ms: file_header.acq_start_ms,
            data_format_version: file_header.data_format_version_string(),
            software_version: file_header.software_version_string(),
            n_events: index.n_events,
            n_errors: index.n_errors,
            n_boards: index.n_boards,
            events_per_board: index.events_per_board[..index.n_boards as usize].to_vec(),
            frames_examined: index.frames_examined,
        }
    }
}

/// A fully decoded file: preamble, summary counters, ordered events
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub header: FileHeader,
    pub summary: FileSummary,
    pub events: Vec<Event>,
}

/// Decode a whole file buffer
///
/// Runs header parse → frame scan → materialization. Decoding the same
/// buffer twice yields identical events and identical counters.
pub fn decode(data: &[u8]) -> Result<DecodedFile, DecodeError> {
    let file_header = FileHeader::parse(data)?;
    let mode = file_header
        .mode()
        .ok_or(DecodeError::UnknownModeCode {
            code: file_header.acq_mode_code,
        })?;

    let index = scan::scan(data, mode)?;
    let events = materialize(data, mode, &index)?;
    let summary = FileSummary::new(&file_header, mode, &index);

    Ok(DecodedFile {
        header: file_header,
        summary,
        events,
    })
}

/// Turn the offset index into events, dispatched on acquisition mode
///
/// Timing and Counting are named by the format but carry no decode path;
/// selecting them is fatal here.
pub fn materialize(
    data: &[u8],
    mode: AcquisitionMode,
    index: &ScanIndex,
) -> Result<Vec<Event>, DecodeError> {
    match mode {
        AcquisitionMode::Spectroscopy => spectroscopy::materialize(data, index),
        AcquisitionMode::SpectroscopyTiming => spectroscopy_timing::materialize(data, index),
        mode => Err(DecodeError::UnsupportedMode { mode }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Preamble bytes for the given mode code
    fn make_preamble(mode_code: u8) -> Vec<u8> {
        let mut buf = vec![3, 0, 2, 1, 0, mode_code];
        buf.extend_from_slice(&1_680_000_000_000u64.to_le_bytes());
        buf.extend_from_slice(&[0u8; 7]);
        buf
    }

    /// Append a well-formed spectroscopy frame
    fn push_spectroscopy_frame(buf: &mut Vec<u8>, board_id: u8, trigger_id: u64) {
        let mode = AcquisitionMode::Spectroscopy;
        buf.extend_from_slice(&(mode.nominal_frame_size() as u16).to_le_bytes());
        buf.push(board_id);
        buf.extend_from_slice(&0.0_f64.to_le_bytes());
        buf.extend_from_slice(&trigger_id.to_le_bytes());
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
        for raw in 0..NCHANNELS as u8 {
            buf.extend_from_slice(&[raw, 0, 1, 0, 2, 0]);
        }
    }

    #[test]
    fn test_decode_end_to_end() {
        let mut buf = make_preamble(1);
        push_spectroscopy_frame(&mut buf, 0, 1);
        push_spectroscopy_frame(&mut buf, 1, 2);
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.events.len(), 2);
        assert_eq!(decoded.summary.n_events, 2);
        assert_eq!(decoded.summary.n_errors, 0);
        assert_eq!(decoded.summary.n_boards, 2);
        assert_eq!(decoded.summary.events_per_board, vec![1, 1]);
        assert_eq!(decoded.summary.acquisition_mode, AcquisitionMode::Spectroscopy);
        assert_eq!(decoded.summary.data_format_version, "3.0");
        assert_eq!(decoded.summary.software_version, "2.1.0");
    }

    #[test]
    fn test_decode_twice_is_identical() {
        let mut buf = make_preamble(1);
        for i in 0..5 {
            push_spectroscopy_frame(&mut buf, (i % 3) as u8, i);
        }
        let a = decode(&buf).unwrap();
        let b = decode(&buf).unwrap();
        assert_eq!(a.events.len(), b.events.len());
        assert_eq!(a.summary.n_events, b.summary.n_events);
        assert_eq!(a.summary.n_errors, b.summary.n_errors);
        for (x, y) in a.events.iter().zip(b.events.iter()) {
            assert_eq!(x.trigger_id, y.trigger_id);
            assert_eq!(x.lg_pha, y.lg_pha);
            assert_eq!(x.hg_pha, y.hg_pha);
        }
    }

    #[test]
    fn test_timing_mode_is_unsupported() {
        let buf = make_preamble(2);
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::UnsupportedMode {
                mode: AcquisitionMode::Timing
            })
        ));
    }

    #[test]
    fn test_counting_mode_is_unsupported() {
        let buf = make_preamble(4);
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::UnsupportedMode {
                mode: AcquisitionMode::Counting
            })
        ));
    }

    #[test]
    fn test_unknown_mode_code() {
        let buf = make_preamble(9);
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::UnknownModeCode { code: 9 })
        ));
    }

    #[test]
    fn test_truncated_file() {
        assert!(matches!(
            decode(&[1, 2, 3]),
            Err(DecodeError::TruncatedHeader { len: 3 })
        ));
    }

    #[test]
    fn test_header_only_file() {
        let buf = make_preamble(1);
        let decoded = decode(&buf).unwrap();
        assert!(decoded.events.is_empty());
        assert_eq!(decoded.summary.n_events, 0);
        assert_eq!(decoded.summary.n_boards, 1);
    }
}
