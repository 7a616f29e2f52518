/*!
The sequencer: owns the decoded song, converts delta-ticks to seconds, and drives the container
walker and event decoder as the host advances it sample-by-sample.
!*/

use crate::byte_cursor::ByteCursor;
use crate::config::SequencerConfig;
use crate::container;
use crate::core::{Channel, XmiCommand};
use crate::decode::{self, DecodedEvent, TimeBase};
use crate::error::{self, LibResult};
use crate::pending::PendingNoteOffs;
use crate::queue::{self, CommandConsumer, CommandProducer};
use crate::Result;
use log::{debug, warn};
use snafu::ResultExt;
use std::fs;
use std::io::Read;
use std::path::Path;

/// A real-time, sample-accurate XMI sequencer.
///
/// `advance` is the only method meant to be called on an audio/timer thread; it performs no I/O
/// and only bounded bookkeeping, buffer scans, and lock-free queue pushes.
pub struct Sequencer {
    data: Vec<u8>,
    evnt_start: usize,
    evnt_end: usize,
    cursor_pos: usize,
    last_status: u8,
    song_time: f64,
    next_event_time: f64,
    samples_processed: u64,
    timebase: TimeBase,
    pending: PendingNoteOffs,
    reached_end: bool,
    loaded: bool,
    config: SequencerConfig,
    producer: CommandProducer,
    consumer: Option<CommandConsumer>,
}

impl Sequencer {
    /// Loads an XMI file from `path` with default configuration except for `sample_rate` and
    /// `loop_playback`.
    pub fn new<P: AsRef<Path>>(path: P, sample_rate: u32, loop_playback: bool) -> Result<Self> {
        Self::with_config(
            path,
            SequencerConfig {
                sample_rate,
                loop_playback,
                ..SequencerConfig::default()
            },
        )
    }

    /// Loads an XMI file from `path` with an explicit [`SequencerConfig`].
    pub fn with_config<P: AsRef<Path>>(path: P, config: SequencerConfig) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).context(error::NotFound {
            path: path.to_path_buf(),
        })?;
        Ok(Self::from_bytes(data, config)?)
    }

    /// Loads an XMI stream from anything implementing `Read` (and, for API parity with a
    /// file-backed reader, `Seek`, though the whole stream is buffered up front and never
    /// seeked).
    pub fn from_reader<R: Read + std::io::Seek>(
        mut reader: R,
        sample_rate: u32,
        loop_playback: bool,
    ) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).context(io!())?;
        Ok(Self::from_bytes(
            data,
            SequencerConfig {
                sample_rate,
                loop_playback,
                ..SequencerConfig::default()
            },
        )?)
    }

    fn from_bytes(data: Vec<u8>, config: SequencerConfig) -> LibResult<Self> {
        let (evnt_start, evnt_end) = container::locate_evnt(&data)?;
        let (producer, consumer) = queue::new_command_queue(4096);
        let mut sequencer = Self {
            data,
            evnt_start,
            evnt_end,
            cursor_pos: evnt_start,
            last_status: 0,
            song_time: 0.0,
            next_event_time: 0.0,
            samples_processed: 0,
            timebase: TimeBase::default(),
            pending: PendingNoteOffs::new(config.pending_capacity),
            reached_end: false,
            loaded: true,
            config,
            producer,
            consumer: Some(consumer),
        };
        sequencer.prime_next_event_time();
        debug!(
            "sequencer loaded: evnt=[{}, {}), bpm={}",
            sequencer.evnt_start,
            sequencer.evnt_end,
            sequencer.timebase.bpm()
        );
        Ok(sequencer)
    }

    /// Takes ownership of the consumer half of the command queue, for handing to the thread (or
    /// task) that drains commands toward the MIDI output device. Returns `None` if already
    /// taken.
    pub fn take_consumer(&mut self) -> Option<CommandConsumer> {
        self.consumer.take()
    }

    /// Pops every command currently sitting in the queue. Intended for single-threaded callers
    /// (tests, a synchronous CLI) that never called `take_consumer`; returns an empty vector
    /// once the consumer has been taken by someone else.
    pub fn drain_commands(&mut self) -> Vec<XmiCommand> {
        match self.consumer.as_mut() {
            Some(consumer) => std::iter::from_fn(|| consumer.pop().ok()).collect(),
            None => Vec::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Resets the cursor to the start of the event stream, clears pending note-offs, and
    /// enqueues All-Notes-Off/All-Sound-Off on every channel before resuming.
    pub fn reset(&mut self) {
        self.cursor_pos = self.evnt_start;
        self.last_status = 0;
        self.pending.clear();
        self.emit_panic_commands();
        self.samples_processed = 0;
        self.song_time = 0.0;
        self.reached_end = false;
        self.loaded = true;
        self.prime_next_event_time();
    }

    fn emit_panic_commands(&mut self) {
        for channel in 0..=15u8 {
            let channel = Channel::new(channel);
            enqueue!(self.producer, XmiCommand::all_notes_off(channel));
            enqueue!(self.producer, XmiCommand::all_sound_off(channel));
        }
    }

    fn prime_next_event_time(&mut self) {
        if self.cursor_pos >= self.evnt_end {
            self.reached_end = true;
            self.next_event_time = 0.0;
            return;
        }
        let mut cursor = ByteCursor::slice(&self.data, self.cursor_pos, self.evnt_end);
        match cursor.read_additive_delta() {
            Ok(delta) => {
                self.cursor_pos = cursor.position();
                self.next_event_time = delta as f64 * self.timebase.seconds_per_tick();
            }
            Err(e) => {
                warn!("unable to read first delta-time: {}", e);
                self.reached_end = true;
            }
        }
    }

    /// Advances the song clock by `samples`, draining due pending note-offs and decoding events
    /// whose time has come.
    pub fn advance(&mut self, samples: u64) {
        if !self.loaded {
            return;
        }
        self.samples_processed += samples;
        self.song_time = self.samples_processed as f64 / self.config.sample_rate as f64;

        let mut due = Vec::new();
        self.pending.drain_due(self.song_time, &mut due);
        for cmd in due {
            enqueue!(self.producer, cmd);
        }

        while self.loaded && !self.reached_end && self.next_event_time <= self.song_time {
            self.step_one_event();
        }

        if self.reached_end && self.pending.count() == 0 {
            if self.config.loop_playback {
                self.reset();
            } else {
                self.loaded = false;
            }
        }
    }

    fn step_one_event(&mut self) {
        let this_event_time = self.next_event_time;
        let mut cursor = ByteCursor::slice(&self.data, self.cursor_pos, self.evnt_end);
        let decoded = match decode::decode_one(&mut cursor, &mut self.last_status) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("stream decode stopped cleanly: {}", e);
                self.loaded = false;
                self.reached_end = true;
                return;
            }
        };
        self.cursor_pos = cursor.position();

        match decoded {
            DecodedEvent::Command(cmd) => enqueue!(self.producer, cmd),
            DecodedEvent::ScheduledNoteOn {
                command,
                duration_ticks,
            } => {
                enqueue!(self.producer, command);
                if let XmiCommand::NoteOn { channel, key, .. } = command {
                    let due_time =
                        this_event_time + duration_ticks as f64 * self.timebase.seconds_per_tick();
                    self.pending.add(due_time, channel, key);
                }
            }
            DecodedEvent::TempoChange(uspq) => {
                let ratio = self.timebase.set_tempo_uspq(uspq);
                if self.config.rescale_pending_on_tempo_change {
                    self.pending.adjust(self.song_time, ratio);
                }
            }
            DecodedEvent::TimeSignatureChange(num, den_pow) => {
                let ratio = self.timebase.set_time_signature(num, den_pow);
                if self.config.rescale_pending_on_tempo_change {
                    self.pending.adjust(self.song_time, ratio);
                }
            }
            DecodedEvent::Ignored => {}
        }

        if self.cursor_pos < self.evnt_end {
            let mut cursor = ByteCursor::slice(&self.data, self.cursor_pos, self.evnt_end);
            match cursor.read_additive_delta() {
                Ok(delta) => {
                    self.cursor_pos = cursor.position();
                    self.next_event_time += delta as f64 * self.timebase.seconds_per_tick();
                }
                Err(e) => {
                    warn!("unable to read delta-time, ending stream: {}", e);
                    self.reached_end = true;
                }
            }
        } else {
            self.reached_end = true;
        }
    }
}

impl Drop for Sequencer {
    /// Quiets any still-sounding notes. Cannot fail: a full queue just drops the panic commands,
    /// logged rather than propagated, since a destructor must never panic.
    fn drop(&mut self) {
        self.emit_panic_commands();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

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
    fn truncated_note_on_loads_then_stops_cleanly() {
        let data = form_xmid_evnt(&[0x00, 0x90, 0x3C]);
        let mut seq = Sequencer::from_reader(Cursor::new(data), 44_100, false).unwrap();
        seq.advance(1_000_000);
        assert!(seq.drain_commands().is_empty());
        assert!(!seq.is_loaded());
    }

    #[test]
    fn note_on_then_note_off_after_duration() {
        // delta=0, Note On C4 vel64 duration 96 ticks; delta=0, running-status Note On E4.
        let data = form_xmid_evnt(&[0x00, 0x90, 0x3C, 0x40, 0x60, 0x00, 0x40, 0x50, 0x30]);
        let mut seq = Sequencer::from_reader(Cursor::new(data), 44_100, false).unwrap();
        seq.advance(44_100);
        let commands = seq.drain_commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0], XmiCommand::NoteOn { .. }));

        seq.advance(44_100 * 2);
        let commands = seq.drain_commands();
        assert!(commands.iter().any(|c| matches!(c, XmiCommand::NoteOff { .. })));
    }

    #[test]
    fn running_status_three_note_ons() {
        let data = form_xmid_evnt(&[
            0x00, 0x90, 0x3C, 0x40, 0x60, 0x00, 0x3E, 0x40, 0x60, 0x00, 0x40, 0x40, 0x60,
        ]);
        let mut seq = Sequencer::from_reader(Cursor::new(data), 44_100, false).unwrap();
        seq.advance(1);
        let commands = seq.drain_commands();
        let note_ons = commands
            .iter()
            .filter(|c| matches!(c, XmiCommand::NoteOn { .. }))
            .count();
        assert_eq!(note_ons, 3);
    }

    #[test]
    fn pending_overflow_drops_extra_note_off_but_does_not_panic() {
        let data = form_xmid_evnt(&[
            0x00, 0x90, 0x3C, 0x40, 0x7F, 0x00, 0x3E, 0x40, 0x7F, 0x00, 0x40, 0x40, 0x7F,
        ]);
        let config = SequencerConfig {
            pending_capacity: 2,
            ..SequencerConfig::default()
        };
        let (producer, consumer) = queue::new_command_queue(64);
        let (evnt_start, evnt_end) = container::locate_evnt(&data).unwrap();
        let mut seq = Sequencer {
            data,
            evnt_start,
            evnt_end,
            cursor_pos: evnt_start,
            last_status: 0,
            song_time: 0.0,
            next_event_time: 0.0,
            samples_processed: 0,
            timebase: TimeBase::default(),
            pending: PendingNoteOffs::new(config.pending_capacity),
            reached_end: false,
            loaded: true,
            config,
            producer,
            consumer: Some(consumer),
        };
        seq.prime_next_event_time();
        seq.advance(1);
        assert_eq!(seq.pending.count(), 2);
    }

    #[test]
    fn loop_round_trip_replays_same_note_ons() {
        let data = form_xmid_evnt(&[0x00, 0x90, 0x3C, 0x40, 0x01, 0x00, 0x3E, 0x40, 0x01]);
        let mut seq = Sequencer::from_reader(Cursor::new(data), 44_100, true).unwrap();
        seq.advance(44_100 * 10);
        let first_pass: Vec<_> = seq
            .drain_commands()
            .into_iter()
            .filter(|c| matches!(c, XmiCommand::NoteOn { .. }))
            .collect();
        // Drains the scheduled note-offs and, with nothing left pending, triggers the loop
        // reset; the replayed stream is then decoded starting from the next advance.
        seq.advance(44_100 * 10);
        seq.drain_commands();
        seq.advance(1);
        let second_pass: Vec<_> = seq
            .drain_commands()
            .into_iter()
            .filter(|c| matches!(c, XmiCommand::NoteOn { .. }))
            .collect();
        assert!(!first_pass.is_empty());
        assert_eq!(first_pass, second_pass);
    }
}
