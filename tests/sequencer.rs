mod utils;

use std::io::Write;
use tempfile::NamedTempFile;
use utils::{enable_logging, form_xmid_evnt};
use xmi_sequencer::{Sequencer, SequencerConfig, XmiCommand};

fn write_xmi_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file
}

#[test]
fn loads_from_disk_and_reports_not_loaded_after_truncated_stream() {
    enable_logging();
    // Scenario S1: EVNT size mis-declared as 2 bytes into a 4-byte Note On -- the loader
    // succeeds, but the first advance stops cleanly without emitting anything.
    let data = form_xmid_evnt(&[0x90, 0x3C]);
    let file = write_xmi_file(&data);
    let mut seq = Sequencer::new(file.path(), 44_100, false).unwrap();
    assert!(seq.is_loaded());
    seq.advance(1_000_000);
    assert!(seq.drain_commands().is_empty());
}

#[test]
fn missing_file_is_a_load_error() {
    let result = Sequencer::new("/nonexistent/path/does-not-exist.xmi", 44_100, false);
    assert!(result.is_err());
}

#[test]
fn take_consumer_drains_commands_pushed_by_advance() {
    enable_logging();
    let data = form_xmid_evnt(&[0x00, 0x90, 0x3C, 0x40, 0x01]);
    let file = write_xmi_file(&data);
    let mut seq = Sequencer::new(file.path(), 44_100, false).unwrap();
    let mut consumer = seq.take_consumer().expect("consumer available once");
    assert!(seq.take_consumer().is_none());

    seq.advance(1);
    let mut seen = Vec::new();
    while let Ok(cmd) = consumer.pop() {
        seen.push(cmd);
    }
    assert!(seen
        .iter()
        .any(|c| matches!(c, XmiCommand::NoteOn { .. })));
}

#[test]
fn tempo_change_scales_subsequent_scheduling() {
    enable_logging();
    // Set Tempo to half speed (uspq doubles from the 500_000 implied by the 120 BPM default)
    // before a Note On, so the note's duration is converted at the new, slower tick rate.
    let data = form_xmid_evnt(&[
        0x00, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, // tempo -> 60 BPM
        0x00, 0x90, 0x3C, 0x40, 0x1E, // Note On, duration 30 ticks
    ]);
    let file = write_xmi_file(&data);
    let mut seq = Sequencer::new(file.path(), 44_100, false).unwrap();
    seq.advance(1);
    let commands = seq.drain_commands();
    assert!(commands
        .iter()
        .any(|c| matches!(c, XmiCommand::NoteOn { .. })));

    // At 60 BPM, tpqn recomputes to 60 and seconds_per_tick doubles relative to the default;
    // the scheduled Note Off should not have fired yet a few milliseconds later...
    seq.advance((44_100.0 * 0.1) as u64);
    assert!(seq
        .drain_commands()
        .iter()
        .all(|c| !matches!(c, XmiCommand::NoteOff { .. })));

    // ...but should have fired comfortably after a full second.
    seq.advance(44_100);
    assert!(seq
        .drain_commands()
        .iter()
        .any(|c| matches!(c, XmiCommand::NoteOff { .. })));
}

#[test]
fn pending_overflow_is_recoverable_via_panic_commands_on_reset() {
    enable_logging();
    let data = form_xmid_evnt(&[
        0x00, 0x90, 0x3C, 0x40, 0x7F, 0x00, 0x3E, 0x40, 0x7F, 0x00, 0x40, 0x40, 0x7F,
    ]);
    let file = write_xmi_file(&data);
    let config = SequencerConfig {
        pending_capacity: 2,
        ..SequencerConfig::default()
    };
    let mut seq = Sequencer::with_config(file.path(), config).unwrap();
    seq.advance(1);
    seq.drain_commands();
    // The overflowing third Note On never got a scheduled Note Off; reset's synthesized
    // All-Notes-Off/All-Sound-Off is the caller's recovery path.
    seq.reset();
    let commands = seq.drain_commands();
    let all_notes_off_count = commands
        .iter()
        .filter(|c| matches!(c, XmiCommand::ControllerChange { controller, .. } if controller.get() == 123))
        .count();
    assert_eq!(all_notes_off_count, 16);
}
