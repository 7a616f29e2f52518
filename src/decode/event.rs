/*!
Decodes one XMI event at a time: status byte (possibly running status), operand bytes, and the
handful of meta-events whose payloads affect the timebase.
!*/

use crate::byte_cursor::ByteCursor;
use crate::core::{Channel, XmiCommand, U14, U7};
use crate::error::{self, LibResult};
use log::{debug, trace, warn};
use snafu::{OptionExt, ResultExt};

const META_SET_TEMPO: u8 = 0x51;
const META_TIME_SIG: u8 = 0x58;
const META_END_OF_TRACK: u8 = 0x2F;
const FILE_META_EVENT: u8 = 0xFF;
const FILE_SYSEX_F0: u8 = 0xF0;
const FILE_SYSEX_F7: u8 = 0xF7;

/// The result of decoding one event from the stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum DecodedEvent {
    /// A command to emit immediately.
    Command(XmiCommand),
    /// A Note On with velocity > 0: emit `command` now, and schedule a matching Note Off
    /// `duration_ticks` ticks later (converted to seconds by the caller, which knows the
    /// timebase in effect at the moment of this event).
    ScheduledNoteOn {
        command: XmiCommand,
        duration_ticks: u32,
    },
    /// A Set Tempo meta-event; payload is microseconds per quarter note.
    TempoChange(u32),
    /// A Time Signature meta-event; payload is `(numerator, denominator_power)`.
    TimeSignatureChange(u8, u8),
    /// A recognized-but-inert meta-event, or a SysEx block: consumed, nothing to emit.
    Ignored,
}

/// Decodes a single event starting at the cursor's current position, updating `last_status` for
/// running-status purposes. `evnt_end` bounds the read so a decoder never wanders past the
/// chunk's declared end even if an operand read would otherwise succeed against the whole file.
pub(crate) fn decode_one(
    cursor: &mut ByteCursor,
    last_status: &mut u8,
) -> LibResult<DecodedEvent> {
    let status = read_status(cursor, last_status)?;

    if status == FILE_META_EVENT {
        return decode_meta(cursor);
    }
    if status == FILE_SYSEX_F0 {
        return decode_sysex(cursor);
    }

    let event_type = status & 0xF0;
    let channel = Channel::new(status & 0x0F);

    match event_type {
        0x80 => {
            let key = cursor.read().context(io!())?;
            let _velocity = cursor.read().context(io!())?;
            Ok(DecodedEvent::Command(XmiCommand::NoteOff {
                channel,
                key: U7::new(key),
            }))
        }
        0x90 => {
            let key = cursor.read().context(io!())?;
            let velocity = cursor.read().context(io!())?;
            let duration_ticks = cursor.read_vlq_u32().context(io!())?;
            if velocity == 0 {
                Ok(DecodedEvent::Command(XmiCommand::NoteOff {
                    channel,
                    key: U7::new(key),
                }))
            } else {
                Ok(DecodedEvent::ScheduledNoteOn {
                    command: XmiCommand::NoteOn {
                        channel,
                        key: U7::new(key),
                        velocity: U7::new(velocity),
                    },
                    duration_ticks,
                })
            }
        }
        0xA0 => {
            let key = cursor.read().context(io!())?;
            let value = cursor.read().context(io!())?;
            Ok(DecodedEvent::Command(XmiCommand::PolyphonicAftertouch {
                channel,
                key: U7::new(key),
                value: U7::new(value),
            }))
        }
        0xB0 => {
            let controller = cursor.read().context(io!())?;
            let value = cursor.read().context(io!())?;
            Ok(DecodedEvent::Command(XmiCommand::ControllerChange {
                channel,
                controller: U7::new(controller),
                value: U7::new(value),
            }))
        }
        0xC0 => {
            let program = cursor.read().context(io!())?;
            Ok(DecodedEvent::Command(XmiCommand::ProgramChange {
                channel,
                program: U7::new(program),
            }))
        }
        0xD0 => {
            let value = cursor.read().context(io!())?;
            Ok(DecodedEvent::Command(XmiCommand::ChannelAftertouch {
                channel,
                value: U7::new(value),
            }))
        }
        0xE0 => {
            let lsb = cursor.read().context(io!())?;
            let msb = cursor.read().context(io!())?;
            Ok(DecodedEvent::Command(XmiCommand::PitchBend {
                channel,
                value14: U14::from_lsb_msb(lsb, msb),
            }))
        }
        _ => error::UnknownStatus {
            site: site!(),
            status,
        }
        .fail(),
    }
}

fn read_status(cursor: &mut ByteCursor, last_status: &mut u8) -> LibResult<u8> {
    let next = cursor.peek().context(error::Malformed {
        site: site!(),
        description: "unexpected end of event stream while reading status byte",
    })?;
    if next & 0x80 == 0 {
        if *last_status == 0 {
            return error::RunningStatusWithoutPrior { site: site!() }.fail();
        }
        trace!("running status, reusing {:#04X}", *last_status);
        Ok(*last_status)
    } else {
        cursor.read().context(io!())?;
        *last_status = next;
        Ok(next)
    }
}

fn decode_meta(cursor: &mut ByteCursor) -> LibResult<DecodedEvent> {
    let meta_type = cursor.read().context(io!())?;
    let len = cursor.read_vlq_u32().context(io!())?;
    let payload = cursor.read_n(len as usize).context(io!())?;
    match meta_type {
        META_SET_TEMPO if payload.len() >= 3 => {
            let uspq = ((payload[0] as u32) << 16) | ((payload[1] as u32) << 8) | payload[2] as u32;
            debug!("Set Tempo meta-event: {} us/quarter", uspq);
            Ok(DecodedEvent::TempoChange(uspq))
        }
        META_TIME_SIG if payload.len() >= 2 => {
            debug!(
                "Time Signature meta-event: {}/{}",
                payload[0],
                1u16 << payload[1]
            );
            Ok(DecodedEvent::TimeSignatureChange(payload[0], payload[1]))
        }
        META_END_OF_TRACK => {
            debug!("End Of Track meta-event (XMI has no implicit end; ignored)");
            Ok(DecodedEvent::Ignored)
        }
        _ => {
            trace!("meta-event {} ({}): {}", meta_type, meta_name(meta_type), payload.len());
            Ok(DecodedEvent::Ignored)
        }
    }
}

/// Names every documented meta-event type so unrecognized-but-known events are logged
/// meaningfully rather than silently dropped, even though only Set Tempo and Time Signature
/// affect playback state.
fn meta_name(meta_type: u8) -> &'static str {
    match meta_type {
        0x00 => "Sequence Number",
        0x01 => "Text",
        0x02 => "Copyright Notice",
        0x03 => "Track Name",
        0x04 => "Instrument Name",
        0x05 => "Lyric",
        0x06 => "Marker",
        0x07 => "Cue Point",
        0x20 => "MIDI Channel Prefix",
        0x21 => "MIDI Port",
        0x2F => "End Of Track",
        0x51 => "Set Tempo",
        0x54 => "SMPTE Offset",
        0x58 => "Time Signature",
        0x59 => "Key Signature",
        0x7F => "Sequencer Specific",
        _ => "Unknown",
    }
}

fn decode_sysex(cursor: &mut ByteCursor) -> LibResult<DecodedEvent> {
    loop {
        let byte = cursor.read().context(io!())?;
        if byte == FILE_SYSEX_F7 {
            break;
        }
    }
    warn!("SysEx block consumed but not surfaced");
    Ok(DecodedEvent::Ignored)
}
