//! File preamble parser
//!
//! Every FERS data file starts with a fixed 21-byte preamble:
//!
//! | Offset | Size | Field                         |
//! |--------|------|-------------------------------|
//! | 0      | 2    | data format version (maj.min) |
//! | 2      | 3    | software version (maj.min.pat)|
//! | 5      | 1    | acquisition mode code         |
//! | 6      | 8    | acquisition start, ms (u64 LE)|

use chrono::{DateTime, TimeZone, Utc};

use super::common::{read_u64, read_u8, AcquisitionMode, DecodeError, FILE_HEADER_SIZE};

/// Parsed file preamble
///
/// No validation beyond buffer-length sufficiency happens here; the mode
/// byte is checked when the decode path is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Data format version as (major, minor)
    pub data_format_version: (u8, u8),
    /// Acquisition software version as (major, minor, patch)
    pub software_version: (u8, u8, u8),
    /// Raw acquisition mode byte
    pub acq_mode_code: u8,
    /// Acquisition start time, milliseconds since the Unix epoch
    pub acq_start_ms: u64,
}

impl FileHeader {
    /// Parse the fixed-size preamble from the start of a file buffer
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < FILE_HEADER_SIZE {
            return Err(DecodeError::TruncatedHeader { len: data.len() });
        }

        // Length was checked above; the reads below stay in bounds
        let truncated = DecodeError::TruncatedHeader { len: data.len() };
        Ok(Self {
            data_format_version: (
                read_u8(data, 0).ok_or(truncated)?,
                read_u8(data, 1).ok_or(truncated)?,
            ),
            software_version: (
                read_u8(data, 2).ok_or(truncated)?,
                read_u8(data, 3).ok_or(truncated)?,
                read_u8(data, 4).ok_or(truncated)?,
            ),
            acq_mode_code: read_u8(data, 5).ok_or(truncated)?,
            acq_start_ms: read_u64(data, 6).ok_or(truncated)?,
        })
    }

    /// Acquisition mode, `None` if the mode byte is not a known code
    pub fn mode(&self) -> Option<AcquisitionMode> {
        AcquisitionMode::from_code(self.acq_mode_code)
    }

    /// Data format version as a dotted string, e.g. "3.0"
    pub fn data_format_version_string(&self) -> String {
        format!(
            "{}.{}",
            self.data_format_version.0, self.data_format_version.1
        )
    }

    /// Software version as a dotted string, e.g. "2.1.0"
    pub fn software_version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            self.software_version.0, self.software_version.1, self.software_version.2
        )
    }

    /// Acquisition start as a UTC timestamp, `None` if out of range
    pub fn acq_start_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.acq_start_ms as i64).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a preamble with the given fields
    fn make_header(
        dfv: (u8, u8),
        swv: (u8, u8, u8),
        mode_code: u8,
        acq_start_ms: u64,
    ) -> Vec<u8> {
        let mut buf = vec![dfv.0, dfv.1, swv.0, swv.1, swv.2, mode_code];
        buf.extend_from_slice(&acq_start_ms.to_le_bytes());
        buf.extend_from_slice(&[0u8; 7]);
        buf
    }

    #[test]
    fn test_parse_header() {
        let data = make_header((3, 0), (2, 1, 5), 1, 1_680_000_000_000);
        let header = FileHeader::parse(&data).unwrap();
        assert_eq!(header.data_format_version, (3, 0));
        assert_eq!(header.software_version, (2, 1, 5));
        assert_eq!(header.acq_mode_code, 1);
        assert_eq!(header.acq_start_ms, 1_680_000_000_000);
        assert_eq!(header.mode(), Some(AcquisitionMode::Spectroscopy));
    }

    #[test]
    fn test_parse_exact_size() {
        let data = make_header((1, 0), (1, 0, 0), 3, 42);
        assert_eq!(data.len(), FILE_HEADER_SIZE);
        let header = FileHeader::parse(&data).unwrap();
        assert_eq!(header.mode(), Some(AcquisitionMode::SpectroscopyTiming));
    }

    #[test]
    fn test_parse_truncated() {
        let data = vec![0u8; FILE_HEADER_SIZE - 1];
        assert_eq!(
            FileHeader::parse(&data),
            Err(DecodeError::TruncatedHeader { len: 20 })
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(
            FileHeader::parse(&[]),
            Err(DecodeError::TruncatedHeader { len: 0 })
        );
    }

    #[test]
    fn test_unknown_mode_code_is_deferred() {
        // An unknown mode byte parses fine; rejection happens at dispatch
        let data = make_header((3, 0), (2, 1, 5), 9, 0);
        let header = FileHeader::parse(&data).unwrap();
        assert_eq!(header.acq_mode_code, 9);
        assert_eq!(header.mode(), None);
    }

    #[test]
    fn test_version_strings() {
        let data = make_header((3, 1), (2, 0, 7), 1, 0);
        let header = FileHeader::parse(&data).unwrap();
        assert_eq!(header.data_format_version_string(), "3.1");
        assert_eq!(header.software_version_string(), "2.0.7");
    }

    #[test]
    fn test_acq_start_utc() {
        // 2023-04-01T00:00:00Z in milliseconds
        let data = make_header((3, 0), (2, 1, 5), 1, 1_680_307_200_000);
        let header = FileHeader::parse(&data).unwrap();
        let dt = header.acq_start_utc().unwrap();
        assert_eq!(dt.timestamp_millis(), 1_680_307_200_000);
    }
}
