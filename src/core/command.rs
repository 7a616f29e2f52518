use crate::core::numbers::{Channel, U14, U7};

/// A single decoded MIDI channel event, ready to be handed to a command sink.
///
/// This is the unit enqueued on the producer side of the command queue. Each scalar field is
/// carried in a clamped newtype (following the same idea as the crate's other `clamp!`-generated
/// wrappers) so an out-of-range value is caught at construction rather than propagating silently
/// to the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XmiCommand {
    NoteOn {
        channel: Channel,
        key: U7,
        velocity: U7,
    },
    NoteOff {
        channel: Channel,
        key: U7,
    },
    ProgramChange {
        channel: Channel,
        program: U7,
    },
    ControllerChange {
        channel: Channel,
        controller: U7,
        value: U7,
    },
    PolyphonicAftertouch {
        channel: Channel,
        key: U7,
        value: U7,
    },
    PitchBend {
        channel: Channel,
        value14: U14,
    },
    ChannelAftertouch {
        channel: Channel,
        value: U7,
    },
}

impl XmiCommand {
    /// Converts this command to the three-byte (or two-byte, for program/channel-aftertouch
    /// messages) raw MIDI message a downstream sink expects. Mirrors the status-byte table in
    /// the crate's external interface documentation directly, so a consumer never has to
    /// re-derive the mapping.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            XmiCommand::NoteOn {
                channel,
                key,
                velocity,
            } => vec![0x90 | channel.get(), key.get(), velocity.get()],
            XmiCommand::NoteOff { channel, key } => vec![0x80 | channel.get(), key.get(), 0],
            XmiCommand::ControllerChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | channel.get(), controller.get(), value.get()],
            XmiCommand::ProgramChange { channel, program } => {
                vec![0xC0 | channel.get(), program.get()]
            }
            XmiCommand::PolyphonicAftertouch {
                channel,
                key,
                value,
            } => vec![0xA0 | channel.get(), key.get(), value.get()],
            XmiCommand::PitchBend { channel, value14 } => {
                let (lsb, msb) = value14.to_lsb_msb();
                vec![0xE0 | channel.get(), lsb, msb]
            }
            XmiCommand::ChannelAftertouch { channel, value } => {
                vec![0xD0 | channel.get(), value.get()]
            }
        }
    }

    pub(crate) fn all_notes_off(channel: Channel) -> Self {
        XmiCommand::ControllerChange {
            channel,
            controller: U7::new(123),
            value: U7::new(0),
        }
    }

    pub(crate) fn all_sound_off(channel: Channel) -> Self {
        XmiCommand::ControllerChange {
            channel,
            controller: U7::new(120),
            value: U7::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_to_bytes() {
        let cmd = XmiCommand::NoteOn {
            channel: Channel::new(2),
            key: U7::new(60),
            velocity: U7::new(64),
        };
        assert_eq!(cmd.to_bytes(), vec![0x92, 60, 64]);
    }

    #[test]
    fn note_off_zeroes_velocity_byte() {
        let cmd = XmiCommand::NoteOff {
            channel: Channel::new(0),
            key: U7::new(60),
        };
        assert_eq!(cmd.to_bytes(), vec![0x80, 60, 0]);
    }

    #[test]
    fn pitch_bend_splits_14_bit_value() {
        let cmd = XmiCommand::PitchBend {
            channel: Channel::new(0),
            value14: U14::from_lsb_msb(0x7F, 0x3F),
        };
        assert_eq!(cmd.to_bytes(), vec![0xE0, 0x7F, 0x3F]);
    }

    #[test]
    fn all_notes_off_uses_controller_123() {
        let cmd = XmiCommand::all_notes_off(Channel::new(5));
        assert_eq!(cmd.to_bytes(), vec![0xB5, 123, 0]);
    }
}
