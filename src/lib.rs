#![allow(dead_code)]

/*!
An XMI (Extended MIDI) container parser and real-time, sample-accurate sequencer.

XMI is the event-stream format used by the AIL Miles Sound System: an IFF-framed container
(`FORM`/`CAT `) wrapping a MIDI-like event stream (`EVNT`) that differs from a Standard MIDI File
in its delta-time encoding and in embedding note duration directly in Note-On. This crate locates
that stream, decodes it, and schedules its commands against a sample-accurate song clock.

The [`Sequencer`] is the primary entry point for playback; [`MetadataProbe`] offers a read-only
pass for duration/tempo/event-count reporting without touching a command queue.
!*/

#[macro_use]
mod error;
#[macro_use]
mod clamp;
#[macro_use]
mod macros;

mod byte_cursor;
mod config;
mod container;
mod core;
mod decode;
mod pending;
mod probe;
mod queue;
mod scheduler;
mod vlq;

pub use config::SequencerConfig;
pub use core::{Channel, XmiCommand, U14, U7};
pub use error::{Error, Result};
pub use probe::{MetadataProbe, ProbeReport};
pub use queue::CommandConsumer;
pub use scheduler::Sequencer;
