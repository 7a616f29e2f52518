/*!
The metadata probe: a read-only pass over a container and event stream that reports duration,
tempo, time signature, and event count without constructing a sequencer or producing any commands.
!*/

use crate::byte_cursor::ByteCursor;
use crate::container;
use crate::decode::{self, DecodedEvent, TimeBase};
use log::debug;
use std::fs;
use std::path::Path;

/// The result of a [`MetadataProbe`] pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeReport {
    /// Whether an `EVNT` chunk was located at all.
    pub found: bool,
    /// The cumulative delta-time of the last event reached, in seconds under whatever timebase
    /// was in effect as of that event -- not including the duration of a trailing Note-On.
    pub duration_seconds: f64,
    pub bpm: f64,
    pub ts_num: u8,
    pub ts_den: u8,
    pub event_count: u64,
    /// Set when the walk or stream stopped early; `found` and the fields gathered up to that
    /// point are still meaningful.
    pub error: Option<String>,
}

impl ProbeReport {
    fn not_found(message: String) -> Self {
        let default = TimeBase::default();
        let (ts_num, ts_den) = default.time_signature();
        Self {
            found: false,
            duration_seconds: 0.0,
            bpm: default.bpm(),
            ts_num,
            ts_den,
            event_count: 0,
            error: Some(message),
        }
    }
}

/// Reads the duration, tempo, time signature, and event count of an XMI stream without
/// constructing a [`crate::Sequencer`](crate::scheduler::Sequencer) or allocating a command
/// queue.
pub struct MetadataProbe;

impl MetadataProbe {
    pub fn probe_file<P: AsRef<Path>>(path: P) -> ProbeReport {
        match fs::read(path.as_ref()) {
            Ok(data) => Self::probe_bytes(&data),
            Err(e) => ProbeReport::not_found(format!("unable to open '{}': {}", path.as_ref().display(), e)),
        }
    }

    pub fn probe_bytes(data: &[u8]) -> ProbeReport {
        let (evnt_start, evnt_end) = match container::locate_evnt(data) {
            Ok(bounds) => bounds,
            Err(e) => return ProbeReport::not_found(e.to_string()),
        };

        let mut timebase = TimeBase::default();
        let mut last_status = 0u8;
        let mut event_count = 0u64;
        let mut cursor_pos = evnt_start;
        let mut error = None;

        let mut next_event_time = {
            let mut cursor = ByteCursor::slice(data, cursor_pos, evnt_end);
            match cursor.read_additive_delta() {
                Ok(delta) => {
                    cursor_pos = cursor.position();
                    delta as f64 * timebase.seconds_per_tick()
                }
                Err(e) => {
                    error = Some(e.to_string());
                    0.0
                }
            }
        };
        let mut last_event_time = 0.0;

        while error.is_none() && cursor_pos < evnt_end {
            last_event_time = next_event_time;
            let mut cursor = ByteCursor::slice(data, cursor_pos, evnt_end);
            match decode::decode_one(&mut cursor, &mut last_status) {
                Ok(decoded) => {
                    cursor_pos = cursor.position();
                    event_count += 1;
                    match decoded {
                        DecodedEvent::TempoChange(uspq) => {
                            timebase.set_tempo_uspq(uspq);
                        }
                        DecodedEvent::TimeSignatureChange(num, den_pow) => {
                            timebase.set_time_signature(num, den_pow);
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    error = Some(e.to_string());
                    break;
                }
            }

            if cursor_pos < evnt_end {
                let mut cursor = ByteCursor::slice(data, cursor_pos, evnt_end);
                match cursor.read_additive_delta() {
                    Ok(delta) => {
                        cursor_pos = cursor.position();
                        next_event_time += delta as f64 * timebase.seconds_per_tick();
                    }
                    Err(e) => {
                        error = Some(e.to_string());
                    }
                }
            }
        }

        let (ts_num, ts_den) = timebase.time_signature();
        debug!(
            "probe: found EVNT [{}, {}), {} events, bpm={}",
            evnt_start, evnt_end, event_count, timebase.bpm()
        );
        ProbeReport {
            found: true,
            duration_seconds: last_event_time,
            bpm: timebase.bpm(),
            ts_num,
            ts_den,
            event_count,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_xmid_evnt(evnt_payload: &[u8]) -> Vec<u8> {
        let mut evnt = Vec::new();
        evnt.extend_from_slice(b"EVNT");
        evnt.extend_from_slice(&(evnt_payload.len() as u32).to_be_bytes());
        evnt.extend_from_slice(evnt_payload);

        let mut form_body = Vec::new();
        form_body.extend_from_slice(b"XMID");
        form_body.extend_from_slice(&evnt);

        let mut out = Vec::new();
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(form_body.len() as u32).to_be_bytes());
        out.extend_from_slice(&form_body);
        out
    }

    #[test]
    fn two_event_stream_reports_zero_duration_and_default_timebase() {
        let data = form_xmid_evnt(&[0x00, 0x90, 0x3C, 0x40, 0x60, 0x00, 0x91, 0x40, 0x50, 0x30]);
        let report = MetadataProbe::probe_bytes(&data);
        assert!(report.found);
        assert_eq!(report.event_count, 2);
        assert_eq!(report.bpm, 120.0);
        assert_eq!((report.ts_num, report.ts_den), (4, 4));
        assert_eq!(report.duration_seconds, 0.0);
        assert!(report.error.is_none());
    }

    #[test]
    fn missing_evnt_chunk_is_reported_not_found() {
        let mut data = Vec::new();
        data.extend_from_slice(b"FORM");
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(b"XMIDXXXX");
        let report = MetadataProbe::probe_bytes(&data);
        assert!(!report.found);
        assert!(report.error.is_some());
    }

    #[test]
    fn truncated_stream_reports_events_seen_before_the_cutoff() {
        let data = form_xmid_evnt(&[0x00, 0x90, 0x3C]);
        let report = MetadataProbe::probe_bytes(&data);
        assert!(report.found);
        assert_eq!(report.event_count, 0);
        assert!(report.error.is_some());
    }

    #[test]
    fn tempo_change_is_reflected_in_reported_bpm() {
        let data = form_xmid_evnt(&[0x00, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40]);
        let report = MetadataProbe::probe_bytes(&data);
        assert!(report.found);
        assert_eq!(report.event_count, 1);
        assert!((report.bpm - 60.0).abs() < 1e-9);
    }

    #[test]
    fn nonexistent_path_is_reported_not_found() {
        let report = MetadataProbe::probe_file("/nonexistent/path/to/a.xmi");
        assert!(!report.found);
        assert!(report.error.is_some());
    }
}
