//! Combined spectroscopy+timing event materializer
//!
//! Channel records are twelve bytes: raw channel id at +0, low-gain
//! amplitude at +2, high-gain amplitude at +4, time of arrival (u32 LE)
//! at +6, time over threshold (u16 LE) at +10. After materialization the
//! whole collection is ordered by trigger id; boards trigger together,
//! so stream order interleaves them and the sort restores a global
//! sequence. The sort is stable, leaving colliding trigger ids in scan
//! order.

use super::common::{
    clamp_pha, frame, read_f64, read_u16, read_u32, read_u64, read_u8, AcquisitionMode,
    DecodeError, Event, NCHANNELS,
};
use super::mapping;
use super::scan::ScanIndex;

const MODE: AcquisitionMode = AcquisitionMode::SpectroscopyTiming;

/// Decode every indexed frame and sort by trigger id
pub(crate) fn materialize(data: &[u8], index: &ScanIndex) -> Result<Vec<Event>, DecodeError> {
    let mut events = Vec::with_capacity(index.frame_offsets.len());
    for &start in &index.frame_offsets {
        events.push(decode_frame(data, start)?);
    }
    events.sort_by_key(|event| event.trigger_id);
    Ok(events)
}

/// Decode one frame at the given byte offset
fn decode_frame(data: &[u8], start: usize) -> Result<Event, DecodeError> {
    let truncated = DecodeError::TruncatedFrame { offset: start };

    let mut event = Event {
        board_id: read_u8(data, start + frame::BOARD_OFFSET).ok_or(truncated)?,
        trigger_time_us: read_f64(data, start + frame::TIME_OFFSET).ok_or(truncated)?,
        trigger_id: read_u64(data, start + frame::TRIGGER_OFFSET).ok_or(truncated)?,
        ..Event::default()
    };

    let base = start + MODE.frame_header_size();
    let stride = MODE.channel_record_size();
    for slot in 0..NCHANNELS {
        let record = base + stride * slot;
        let raw_channel = read_u8(data, record).ok_or(truncated)?;
        let lg_pha = read_u16(data, record + 2).ok_or(truncated)?;
        let hg_pha = read_u16(data, record + 4).ok_or(truncated)?;
        let toa = read_u32(data, record + 6).ok_or(truncated)?;
        let tot = read_u16(data, record + 10).ok_or(truncated)?;

        let channel = mapping::remap(raw_channel)? as usize;
        event.lg_pha[channel] = clamp_pha(lg_pha);
        event.hg_pha[channel] = clamp_pha(hg_pha);
        event.toa[channel] = toa;
        event.tot[channel] = tot;
    }

    Ok(event)
}
